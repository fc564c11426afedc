//! An NFSv3 client over ONC RPC.
//!
//! The crate is layered bottom-up: [`xdr`] encodes and decodes the wire
//! format, [`rpc`] carries calls over an established byte stream,
//! [`portmap`] and [`mount`] bootstrap a session, and [`nfs3::Target`]
//! offers path-based file operations on a mounted export.  Failures are
//! reported through [`result::Error`].
//!
//! ```no_run
//! use nfs3_client::{mount::MountClient, rpc::OpaqueAuth};
//!
//! # async fn run() -> nfs3_client::result::Result<()> {
//! let mut mount = MountClient::dial("fileserver").await?;
//! let auth = OpaqueAuth::new_sys(1, "client", 1000, 1000, Vec::new());
//! let target = mount.mount("/export", auth).await?;
//! target.mkdir("scratch", 0o755).await?;
//! target.remove_all("scratch").await?;
//! target.close().await?;
//! mount.unmount().await?;
//! mount.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod result;
pub mod rpc;
pub mod xdr;
