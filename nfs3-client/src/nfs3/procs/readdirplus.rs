use crate::{
    nfs3::{Cookie3, Count3, FileId3, Filename3, NfsFh3, PostOpAttributes, PostOpFh3, Verifier3},
    result::{NfsStat3, Result},
    xdr::{self, PackTo, Packer, UnpackFrom, Unpacker},
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReaddirPlus3Args {
    pub dir: NfsFh3,
    pub cookie: Cookie3,
    pub verifier: Verifier3,
    /// Number of READDIR bytes the client really wants
    pub dircount: Count3,
    /// Maximum size of response, including attributes
    pub maxcount: Count3,
}

#[derive(UnpackFrom, PackTo, Debug, Clone, PartialEq, Eq)]
pub struct EntryPlus3 {
    pub fileid: FileId3,
    pub name: Filename3,
    pub cookie: Cookie3,
    pub name_attributes: PostOpAttributes,
    pub name_handle: PostOpFh3,
}

impl EntryPlus3 {
    /// Whether this is the `.` or `..` entry
    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// One page of a listing.  On the wire the entries are an XDR optional-data
/// list (`entry3 *nextentry`).
#[derive(Debug, Clone, Default)]
pub struct DirListPlus3 {
    pub entries: Vec<EntryPlus3>,
    pub eof: bool,
}

impl<B: Packer> PackTo<B> for DirListPlus3 {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_optional_list(&self.entries, |buf, entry| entry.pack_to(buf));
        buf.pack_bool(self.eof);
    }
}

impl<B: Unpacker> UnpackFrom<B> for DirListPlus3 {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        Ok(DirListPlus3 {
            entries: buf.unpack_optional_list(EntryPlus3::unpack_from)?,
            eof: buf.unpack_bool()?,
        })
    }
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReaddirPlus3ResOk {
    pub dir_attributes: PostOpAttributes,
    pub verifier: Verifier3,
    pub reply: DirListPlus3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct ReaddirPlus3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pub type ReaddirPlusResult =
    core::result::Result<ReaddirPlus3ResOk, (NfsStat3, ReaddirPlus3ResFail)>;
