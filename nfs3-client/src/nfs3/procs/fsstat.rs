use crate::{
    nfs3::{NfsFh3, PostOpAttributes, Size3},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Fsstat3Args {
    pub root: NfsFh3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Fsstat3ResOk {
    pub obj_attributes: PostOpAttributes,
    /// Total size in bytes of the file system
    pub tbytes: Size3,
    /// Free space in bytes.
    pub fbytes: Size3,
    /// Free space, in bytes, available to the user
    pub abytes: Size3,
    /// Total number of file slots
    pub tfiles: Size3,
    /// Number of free file slots
    pub ffiles: Size3,
    /// Number of free file slots available to the user
    pub afiles: Size3,
    /// A measure of file system volatility in seconds
    pub invarsec: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Fsstat3ResFail {
    pub obj_attributes: PostOpAttributes,
}

pub type FsstatResult = Result<Fsstat3ResOk, (NfsStat3, Fsstat3ResFail)>;
