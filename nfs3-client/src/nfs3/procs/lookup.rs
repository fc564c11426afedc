use crate::{
    nfs3::{DirOpArgs3, NfsFh3, PostOpAttributes},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Lookup3Args {
    pub what: DirOpArgs3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Lookup3ResOk {
    pub object: NfsFh3,
    pub obj_attributes: PostOpAttributes,
    pub dir_attributes: PostOpAttributes,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Lookup3ResFail {
    pub dir_attributes: PostOpAttributes,
}

pub type LookupResult = Result<Lookup3ResOk, (NfsStat3, Lookup3ResFail)>;
