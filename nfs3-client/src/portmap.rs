//! Port mapper (RFC 1833, version 2) lookups used to find the MOUNT and NFS
//! service ports before connecting.
use crate::{
    result::{Result, RpcError},
    rpc::{CallHeader, OpaqueAuth, RpcClient},
    xdr::{self, UnpackFrom},
};
use nfs3_client_macros::{PackTo, UnpackFrom};
use tokio::net::TcpStream;
use tracing::debug;

/// TCP/UDP Port number for the RPC Port Mapper service and RPC bind
pub const PORT: u16 = 111;

pub const PMAP_VERS: u32 = 2;
pub const PMAP_PROG: u32 = 100000;

#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub prog: u32,
    pub vers: u32,
    pub prot: u32,
    pub port: u32,
}

pub const IPPROTO_TCP: u32 = 6; /* protocol number for TCP/IP */
pub const IPPROTO_UDP: u32 = 17; /* protocol number for UDP/IP */

pub const PMAPPROC_NULL: u32 = 0;
pub const PMAPPROC_GETPORT: u32 = 3;

/// Asks the port mapper behind `rpc` which port serves `prog`/`vers` over
/// TCP.  An unregistered program is reported as
/// [`RpcError::ProgUnavail`].
pub async fn getport(rpc: &RpcClient, prog: u32, vers: u32) -> Result<u16> {
    let header = CallHeader {
        prog: PMAP_PROG,
        vers: PMAP_VERS,
        proc: PMAPPROC_GETPORT,
        cred: OpaqueAuth::None,
        verf: OpaqueAuth::None,
    };
    let mapping = Mapping {
        prog,
        vers,
        prot: IPPROTO_TCP,
        port: 0,
    };

    let mut reply = rpc.invoke(&header, &mapping).await?;
    let port = u32::unpack_from(&mut reply)?;
    debug!("portmap: program {} v{} is on port {}", prog, vers, port);
    match u16::try_from(port) {
        Ok(0) | Err(_) => Err(RpcError::ProgUnavail.into()),
        Ok(port) => Ok(port),
    }
}

/// Connects to the port mapper on `host` and resolves then connects to the
/// TCP endpoint of `prog`/`vers`.
pub async fn connect(host: &str, prog: u32, vers: u32) -> Result<TcpStream> {
    let portmapper = RpcClient::new(TcpStream::connect((host, PORT)).await?);
    let port = getport(&portmapper, prog, vers).await;
    // the mapping connection is only needed for the one lookup
    let _ = portmapper.close().await;
    let port = port?;

    Ok(TcpStream::connect((host, port)).await?)
}
