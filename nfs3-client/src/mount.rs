//! This modules defines the constants and structures for encoding and
//! decoding NFS MOUNT protocol, and a client that uses it to obtain the
//! root file handle of an export.
use crate::{
    nfs3::{self, NfsFh3, Target},
    portmap,
    result::{Error, MountStat3, Result, XdrError},
    rpc::{CallHeader, OpaqueAuth, RpcClient},
    xdr::{self, Unpacker, UnpackFrom},
};
use bytes::Buf;
use nfs3_client_macros::{PackTo, UnpackFrom};
use tracing::{debug, warn};

pub const PROGRAM: u32 = 100005;
pub const VERSION: u32 = 3;

pub const MOUNTPROC3_NULL: u32 = 0;
pub const MOUNTPROC3_MNT: u32 = 1;
pub const MOUNTPROC3_DUMP: u32 = 2;
pub const MOUNTPROC3_UMNT: u32 = 3;
pub const MOUNTPROC3_UMNTALL: u32 = 4;
pub const MOUNTPROC3_EXPORT: u32 = 5;

/// Maximum bytes in a path name
pub const MNTPATHLEN: usize = 1024;

pub const MNT3_OK: u32 = 0; /* no error */
pub const MNT3ERR_PERM: u32 = 1; /* Not owner */
pub const MNT3ERR_NOENT: u32 = 2; /* No such file or directory */
pub const MNT3ERR_IO: u32 = 5; /* I/O error */
pub const MNT3ERR_ACCES: u32 = 13; /* Permission denied */
pub const MNT3ERR_NOTDIR: u32 = 20; /* Not a directory */
pub const MNT3ERR_INVAL: u32 = 22; /* Invalid argument */
pub const MNT3ERR_NAMETOOLONG: u32 = 63; /* Filename too long */
pub const MNT3ERR_NOTSUPP: u32 = 10004; /* Operation not supported */
pub const MNT3ERR_SERVERFAULT: u32 = 10006; /* A failure on the server */

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct MountRes3Ok {
    pub handle: NfsFh3,
    pub auth_flavors: Vec<u32>,
}

pub type MountResult = std::result::Result<MountRes3Ok, MountStat3>;

/// Decodes a `mountres3` union
pub fn unpack_mount_result<B: Buf>(buf: &mut B) -> Result<MountResult> {
    let status = buf.unpack_uint()?;
    if status == MNT3_OK {
        return Ok(Ok(MountRes3Ok::unpack_from(buf)?));
    }

    match MountStat3::from_code(status) {
        Some(stat) => Ok(Err(stat)),
        None => Err(XdrError::InvalidDiscriminant {
            type_name: "mountstat3",
            value: status,
        }
        .into()),
    }
}

/// A MOUNT protocol client bound to one server.
pub struct MountClient {
    host: String,
    rpc: RpcClient,
    /// Export and credentials of the last successful MNT, for UMNT
    mounted: Option<(String, OpaqueAuth)>,
}

impl MountClient {
    /// Wraps an RPC client already connected to the MOUNT service of `host`.
    /// `host` is used to reach the NFS service on [`MountClient::mount`].
    pub fn new(host: impl Into<String>, rpc: RpcClient) -> MountClient {
        MountClient {
            host: host.into(),
            rpc,
            mounted: None,
        }
    }

    /// Looks up the MOUNT v3 TCP port with the port mapper on `host` and
    /// connects to it.
    pub async fn dial(host: &str) -> Result<MountClient> {
        let stream = portmap::connect(host, PROGRAM, VERSION).await?;
        debug!("connected to mountd on {}", host);
        Ok(MountClient::new(host, RpcClient::new(stream)))
    }

    fn header(proc: u32, auth: &OpaqueAuth) -> CallHeader {
        CallHeader {
            prog: PROGRAM,
            vers: VERSION,
            proc,
            cred: auth.clone(),
            verf: OpaqueAuth::None,
        }
    }

    /// Issues MNT for `export` and returns the root handle together with the
    /// authentication flavors the server accepts for it.
    pub async fn mnt(&mut self, export: &str, auth: &OpaqueAuth) -> Result<MountRes3Ok> {
        if export.len() > MNTPATHLEN {
            return Err(Error::InvalidPath(export.to_string()));
        }

        let header = Self::header(MOUNTPROC3_MNT, auth);
        let mut reply = self.rpc.invoke(&header, &export).await?;
        let res = unpack_mount_result(&mut reply)?.map_err(Error::Mount)?;
        debug!(
            "mounted {}:{} handle {:?} flavors {:?}",
            self.host, export, res.handle, res.auth_flavors
        );
        if !res.auth_flavors.is_empty() && !res.auth_flavors.contains(&auth.flavor()) {
            warn!(
                "export {} does not list auth flavor {} ({:?})",
                export,
                auth.flavor(),
                res.auth_flavors
            );
        }

        self.mounted = Some((export.to_string(), auth.clone()));
        Ok(res)
    }

    /// Mounts `export` and connects a [`Target`] to the NFS service of the
    /// same host.
    pub async fn mount(&mut self, export: &str, auth: OpaqueAuth) -> Result<Target> {
        let res = self.mnt(export, &auth).await?;
        let stream = portmap::connect(&self.host, nfs3::PROGRAM, nfs3::VERSION).await?;
        Target::new(RpcClient::new(stream), auth, res.handle, export).await
    }

    /// Mounts `export` and builds a [`Target`] over a caller-supplied
    /// connection to the NFS service.
    pub async fn mount_with(
        &mut self,
        export: &str,
        auth: OpaqueAuth,
        rpc: RpcClient,
    ) -> Result<Target> {
        let res = self.mnt(export, &auth).await?;
        Target::new(rpc, auth, res.handle, export).await
    }

    /// Sends UMNT for the last mounted export.  Nothing to do if no export
    /// was mounted.  The export stays recorded until UMNT succeeds, so a
    /// failed unmount can be retried.
    pub async fn unmount(&mut self) -> Result<()> {
        let (export, auth) = match &self.mounted {
            Some(mounted) => mounted,
            None => return Ok(()),
        };

        let header = Self::header(MOUNTPROC3_UMNT, auth);
        self.rpc.invoke(&header, &export.as_str()).await?;
        debug!("unmounted {}:{}", self.host, export);
        self.mounted = None;
        Ok(())
    }

    /// Closes the MOUNT connection.  Does not unmount.
    pub async fn close(self) -> Result<()> {
        self.rpc.close().await
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}
