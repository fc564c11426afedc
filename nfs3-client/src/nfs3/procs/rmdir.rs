use crate::{
    nfs3::{DirOpArgs3, WccData},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Rmdir3Args {
    pub object: DirOpArgs3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Rmdir3ResOk {
    pub wcc_data: WccData,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Rmdir3ResFail {
    pub dir_wcc: WccData,
}

pub type RmdirResult = Result<Rmdir3ResOk, (NfsStat3, Rmdir3ResFail)>;
