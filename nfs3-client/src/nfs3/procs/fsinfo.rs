use crate::{
    nfs3::{NfsFh3, NfsTime3, PostOpAttributes, Size3},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

pub const FSF3_LINK: u32 = 0x0001;
pub const FSF3_SYMLINK: u32 = 0x0002;
pub const FSF3_HOMOGENEOUS: u32 = 0x0008;
pub const FSF3_CANSETTIME: u32 = 0x0010;

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Fsinfo3Args {
    pub root: NfsFh3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Fsinfo3ResOk {
    pub obj_attributes: PostOpAttributes,
    pub rtmax: u32,
    pub rtpref: u32,
    pub rtmult: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub wtmult: u32,
    pub dtpref: u32,
    pub maxfilesize: Size3,
    pub time_delta: NfsTime3,
    pub properties: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Fsinfo3ResFail {
    pub obj_attributes: PostOpAttributes,
}

pub type FsinfoResult = Result<Fsinfo3ResOk, (NfsStat3, Fsinfo3ResFail)>;
