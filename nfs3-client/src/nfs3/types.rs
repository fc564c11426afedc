use crate::xdr::{self, PackTo, Packer, UnpackFrom, Unpacker};
use nfs3_client_macros::{PackTo, UnpackFrom};

pub type Filename3 = String;
pub type NfsPath3 = String;
pub type FileId3 = u64;
pub type Cookie3 = u64;
// Used here for cookieverf3, createverf3, and writeverf3, all technically defiend
// as opaque[8]
pub type Verifier3 = u64;
pub type Uid3 = u32;
pub type Gid3 = u32;
pub type Size3 = u64;
pub type Count3 = u32;
pub type Mode3 = u32;
pub type Offset3 = u64;

/// Maximum size in bytes of an NFSv3 file handle
pub const NFS3_FHSIZE: u32 = 64;

#[derive(PackTo, Debug, UnpackFrom, Copy, Clone, PartialEq, Eq)]
pub enum FileType3 {
    Reg = 1,
    Dir = 2,
    Blk = 3,
    Chr = 4,
    Lnk = 5,
    Sock = 6,
    Fifo = 7,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecData3 {
    pub data1: u32,
    pub data2: u32,
}

/// Opaque server-issued file handle, `opaque<NFS3_FHSIZE>` on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NfsFh3 {
    pub data: Vec<u8>,
}

impl NfsFh3 {
    pub fn new(data: impl Into<Vec<u8>>) -> NfsFh3 {
        NfsFh3 { data: data.into() }
    }
}

impl<B: Packer> PackTo<B> for NfsFh3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(&self.data);
    }
}

impl<B: Unpacker> UnpackFrom<B> for NfsFh3 {
    fn unpack_from(buf: &mut B) -> xdr::Result<Self> {
        Ok(NfsFh3 {
            data: buf.unpack_opaque_max(NFS3_FHSIZE)?.to_vec(),
        })
    }
}

/// The NfsTime3 gives the number of seconds and nano seconds since
/// midnight or zero hour January 1, 1970 Coordinated Universal Time
/// (UTC).
#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct NfsTime3 {
    pub seconds: u32,
    pub nano_seconds: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub file_type: FileType3,
    pub mode: Mode3,
    pub num_links: u32,
    pub uid: Uid3,
    pub gid: Gid3,
    pub size: Size3,
    pub used: Size3,
    pub rdev: SpecData3,
    pub fsid: u64,
    pub file_id: FileId3,
    pub atime: NfsTime3,
    pub mtime: NfsTime3,
    pub ctime: NfsTime3,
}

impl FileAttributes {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType3::Dir
    }
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeHow {
    #[default]
    DontChange,
    SetToServerTime,
    SetToClientTime(NfsTime3),
}

/// `sattr3`: every attribute is optional, unset ones are left unchanged
#[derive(PackTo, UnpackFrom, Debug, Clone, Default, PartialEq, Eq)]
pub struct SetAttributes {
    pub mode: Option<Mode3>,
    pub uid: Option<Uid3>,
    pub gid: Option<Gid3>,
    pub size: Option<Size3>,
    pub atime: TimeHow,
    pub mtime: TimeHow,
}

impl SetAttributes {
    pub fn with_mode(mode: Mode3) -> SetAttributes {
        SetAttributes {
            mode: Some(mode),
            ..Default::default()
        }
    }
}

/// Subset of pre-operation attributes used for weak cache consistency
#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WccAttributes {
    pub size: Size3,
    pub mtime: NfsTime3,
    pub ctime: NfsTime3,
}

pub type PostOpAttributes = Option<FileAttributes>;
pub type PreOpAttributes = Option<WccAttributes>;
pub type PostOpFh3 = Option<NfsFh3>;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct DirOpArgs3 {
    pub dir: NfsFh3,
    pub name: Filename3,
}

/// Weak Cache Consistency data
#[derive(PackTo, UnpackFrom, Debug, Clone, Default, PartialEq, Eq)]
pub struct WccData {
    pub before: PreOpAttributes,
    pub after: PostOpAttributes,
}
