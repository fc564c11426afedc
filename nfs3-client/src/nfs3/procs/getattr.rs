use crate::{
    nfs3::{FileAttributes, NfsFh3},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct GetAttr3Args {
    pub object: NfsFh3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct GetAttr3ResOk {
    pub attributes: FileAttributes,
}

// the failure arm is void
pub type GetAttrResult = Result<GetAttr3ResOk, (NfsStat3, ())>;
