use crate::{
    nfs3::{NfsFh3, PostOpAttributes},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Access3Args {
    pub object: NfsFh3,
    /// Bitmask of `ACCESS3_*` permissions to check
    pub access: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Access3ResOk {
    pub obj_attributes: PostOpAttributes,
    /// Subset of the requested bits the server grants
    pub access: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Access3ResFail {
    pub obj_attributes: PostOpAttributes,
}

pub type AccessResult = Result<Access3ResOk, (NfsStat3, Access3ResFail)>;
