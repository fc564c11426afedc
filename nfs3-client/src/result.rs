//! Error taxonomy.
//!
//! Failures fall into disjoint families: status codes reported by the NFS
//! or MOUNT server, RPC-level faults (rejected calls, broken connections),
//! XDR decode failures, and a few client-side consistency checks.  Callers
//! match on [`Error`] directly or use the `is_*` helpers.
use crate::rpc::AuthStat;
use thiserror::Error;

/// NFSv3 status codes (RFC 1813 `nfsstat3`), excluding `NFS3_OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum NfsStat3 {
    #[error("not owner")]
    Perm,
    #[error("no such file or directory")]
    NoEnt,
    #[error("I/O error")]
    Io,
    #[error("no such device or address")]
    NxIo,
    #[error("permission denied")]
    Acces,
    #[error("file exists")]
    Exist,
    #[error("cross-device link")]
    XDev,
    #[error("no such device")]
    NoDev,
    #[error("not a directory")]
    NotDir,
    #[error("is a directory")]
    IsDir,
    #[error("invalid argument")]
    Inval,
    #[error("file too large")]
    FBig,
    #[error("no space left on device")]
    NoSpc,
    #[error("read-only file system")]
    RoFs,
    #[error("too many hard links")]
    MLink,
    #[error("file name too long")]
    NameTooLong,
    #[error("directory not empty")]
    NotEmpty,
    #[error("disk quota exceeded")]
    DQuot,
    #[error("stale file handle")]
    Stale,
    #[error("too many levels of remote in path")]
    Remote,
    #[error("illegal file handle")]
    BadHandle,
    #[error("object changed since the guard was observed")]
    NotSync,
    #[error("cookie is stale")]
    BadCookie,
    #[error("operation not supported")]
    NotSupp,
    #[error("buffer or request too small")]
    TooSmall,
    #[error("server fault")]
    ServerFault,
    #[error("object type not supported by server")]
    BadType,
    #[error("server busy, retry later")]
    Jukebox,
}

impl NfsStat3 {
    /// Maps a non-zero wire status to its code, `None` for `NFS3_OK` and
    /// values RFC 1813 does not define.
    pub const fn from_code(code: u32) -> Option<NfsStat3> {
        use crate::nfs3::*;
        Some(match code {
            NFS3ERR_PERM => NfsStat3::Perm,
            NFS3ERR_NOENT => NfsStat3::NoEnt,
            NFS3ERR_IO => NfsStat3::Io,
            NFS3ERR_NXIO => NfsStat3::NxIo,
            NFS3ERR_ACCES => NfsStat3::Acces,
            NFS3ERR_EXIST => NfsStat3::Exist,
            NFS3ERR_XDEV => NfsStat3::XDev,
            NFS3ERR_NODEV => NfsStat3::NoDev,
            NFS3ERR_NOTDIR => NfsStat3::NotDir,
            NFS3ERR_ISDIR => NfsStat3::IsDir,
            NFS3ERR_INVAL => NfsStat3::Inval,
            NFS3ERR_FBIG => NfsStat3::FBig,
            NFS3ERR_NOSPC => NfsStat3::NoSpc,
            NFS3ERR_ROFS => NfsStat3::RoFs,
            NFS3ERR_MLINK => NfsStat3::MLink,
            NFS3ERR_NAMETOOLONG => NfsStat3::NameTooLong,
            NFS3ERR_NOTEMPTY => NfsStat3::NotEmpty,
            NFS3ERR_DQUOT => NfsStat3::DQuot,
            NFS3ERR_STALE => NfsStat3::Stale,
            NFS3ERR_REMOTE => NfsStat3::Remote,
            NFS3ERR_BADHANDLE => NfsStat3::BadHandle,
            NFS3ERR_NOT_SYNC => NfsStat3::NotSync,
            NFS3ERR_BAD_COOKIE => NfsStat3::BadCookie,
            NFS3ERR_NOTSUPP => NfsStat3::NotSupp,
            NFS3ERR_TOOSMALL => NfsStat3::TooSmall,
            NFS3ERR_SERVERFAULT => NfsStat3::ServerFault,
            NFS3ERR_BADTYPE => NfsStat3::BadType,
            NFS3ERR_JUKEBOX => NfsStat3::Jukebox,
            _ => return None,
        })
    }

    /// Returns the wire value of the status
    pub const fn code(&self) -> u32 {
        use crate::nfs3::*;
        match self {
            NfsStat3::Perm => NFS3ERR_PERM,
            NfsStat3::NoEnt => NFS3ERR_NOENT,
            NfsStat3::Io => NFS3ERR_IO,
            NfsStat3::NxIo => NFS3ERR_NXIO,
            NfsStat3::Acces => NFS3ERR_ACCES,
            NfsStat3::Exist => NFS3ERR_EXIST,
            NfsStat3::XDev => NFS3ERR_XDEV,
            NfsStat3::NoDev => NFS3ERR_NODEV,
            NfsStat3::NotDir => NFS3ERR_NOTDIR,
            NfsStat3::IsDir => NFS3ERR_ISDIR,
            NfsStat3::Inval => NFS3ERR_INVAL,
            NfsStat3::FBig => NFS3ERR_FBIG,
            NfsStat3::NoSpc => NFS3ERR_NOSPC,
            NfsStat3::RoFs => NFS3ERR_ROFS,
            NfsStat3::MLink => NFS3ERR_MLINK,
            NfsStat3::NameTooLong => NFS3ERR_NAMETOOLONG,
            NfsStat3::NotEmpty => NFS3ERR_NOTEMPTY,
            NfsStat3::DQuot => NFS3ERR_DQUOT,
            NfsStat3::Stale => NFS3ERR_STALE,
            NfsStat3::Remote => NFS3ERR_REMOTE,
            NfsStat3::BadHandle => NFS3ERR_BADHANDLE,
            NfsStat3::NotSync => NFS3ERR_NOT_SYNC,
            NfsStat3::BadCookie => NFS3ERR_BAD_COOKIE,
            NfsStat3::NotSupp => NFS3ERR_NOTSUPP,
            NfsStat3::TooSmall => NFS3ERR_TOOSMALL,
            NfsStat3::ServerFault => NFS3ERR_SERVERFAULT,
            NfsStat3::BadType => NFS3ERR_BADTYPE,
            NfsStat3::Jukebox => NFS3ERR_JUKEBOX,
        }
    }
}

/// MOUNT v3 status codes (RFC 1813 `mountstat3`), excluding `MNT3_OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MountStat3 {
    #[error("not owner")]
    Perm,
    #[error("no such export")]
    NoEnt,
    #[error("I/O error")]
    Io,
    #[error("access denied")]
    Acces,
    #[error("export is not a directory")]
    NotDir,
    #[error("invalid argument")]
    Inval,
    #[error("export path too long")]
    NameTooLong,
    #[error("operation not supported")]
    NotSupp,
    #[error("server fault")]
    ServerFault,
}

impl MountStat3 {
    pub const fn from_code(code: u32) -> Option<MountStat3> {
        use crate::mount::*;
        Some(match code {
            MNT3ERR_PERM => MountStat3::Perm,
            MNT3ERR_NOENT => MountStat3::NoEnt,
            MNT3ERR_IO => MountStat3::Io,
            MNT3ERR_ACCES => MountStat3::Acces,
            MNT3ERR_NOTDIR => MountStat3::NotDir,
            MNT3ERR_INVAL => MountStat3::Inval,
            MNT3ERR_NAMETOOLONG => MountStat3::NameTooLong,
            MNT3ERR_NOTSUPP => MountStat3::NotSupp,
            MNT3ERR_SERVERFAULT => MountStat3::ServerFault,
            _ => return None,
        })
    }

    pub const fn code(&self) -> u32 {
        use crate::mount::*;
        match self {
            MountStat3::Perm => MNT3ERR_PERM,
            MountStat3::NoEnt => MNT3ERR_NOENT,
            MountStat3::Io => MNT3ERR_IO,
            MountStat3::Acces => MNT3ERR_ACCES,
            MountStat3::NotDir => MNT3ERR_NOTDIR,
            MountStat3::Inval => MNT3ERR_INVAL,
            MountStat3::NameTooLong => MNT3ERR_NAMETOOLONG,
            MountStat3::NotSupp => MNT3ERR_NOTSUPP,
            MountStat3::ServerFault => MNT3ERR_SERVERFAULT,
        }
    }
}

/// Faults of the RPC layer, independent of the program being called.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("program unavailable")]
    ProgUnavail,
    #[error("program version mismatch (server supports {low}..={high})")]
    ProgMismatch { low: u32, high: u32 },
    #[error("procedure unavailable")]
    ProcUnavail,
    #[error("server could not decode arguments")]
    GarbageArgs,
    #[error("server system error")]
    SystemErr,
    #[error("RPC version mismatch (server supports {low}..={high})")]
    RpcMismatch { low: u32, high: u32 },
    #[error("authentication rejected: {0:?}")]
    AuthError(AuthStat),
    #[error("reply not received in time")]
    Timeout,
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("connection is unusable after an earlier transport failure")]
    ConnectionBroken,
    #[error("record of {size} bytes exceeds max {max}")]
    RecordTooLarge { size: u64, max: u32 },
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while decoding XDR data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XdrError {
    #[error("unexpected end of data")]
    NotEnoughData,
    #[error("invalid boolean value {0}")]
    InvalidBool(u32),
    #[error("invalid discriminant {value} for {type_name}")]
    InvalidDiscriminant { type_name: &'static str, value: u32 },
    #[error("length {len} exceeds max {max}")]
    LengthTooLarge { len: u32, max: u32 },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("string contains a NUL byte")]
    EmbeddedNul,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("NFS error: {0}")]
    Nfs(NfsStat3),
    #[error("MOUNT error: {0}")]
    Mount(MountStat3),
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("XDR error: {0}")]
    Xdr(#[from] XdrError),
    /// A COMMIT reply carried a different write verifier than the WRITEs it
    /// covers, so unstable data may have been lost by a server restart.
    #[error("write verifier changed before commit")]
    VerifierMismatch,
    /// A READDIRPLUS page without entries did not signal end of listing
    #[error("directory listing stalled: empty page without eof")]
    EmptyPage,
    #[error("invalid path {0:?}")]
    InvalidPath(String),
}

impl Error {
    /// NFS status carried by the error, if it came from the NFS server
    pub fn nfs_status(&self) -> Option<NfsStat3> {
        match self {
            Error::Nfs(stat) => Some(*stat),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.nfs_status() == Some(NfsStat3::NoEnt)
    }

    pub fn is_not_dir(&self) -> bool {
        self.nfs_status() == Some(NfsStat3::NotDir)
    }

    /// Directory-not-empty, the expected outcome of removing a populated
    /// directory.
    pub fn is_not_empty(&self) -> bool {
        self.nfs_status() == Some(NfsStat3::NotEmpty)
    }

    /// A guarded SETATTR found the object changed since it was observed.
    pub fn is_precondition_failed(&self) -> bool {
        self.nfs_status() == Some(NfsStat3::NotSync)
    }

    /// Whether the connection that produced the error must be discarded.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Rpc(
                RpcError::Timeout
                    | RpcError::ConnectionClosed
                    | RpcError::ConnectionBroken
                    | RpcError::RecordTooLarge { .. }
                    | RpcError::Io(_)
            )
        )
    }
}

impl From<NfsStat3> for Error {
    fn from(stat: NfsStat3) -> Error {
        Error::Nfs(stat)
    }
}

impl From<MountStat3> for Error {
    fn from(stat: MountStat3) -> Error {
        Error::Mount(stat)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Rpc(RpcError::Io(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_err: std::string::FromUtf8Error) -> Error {
        XdrError::InvalidUtf8.into()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
