use crate::{
    nfs3::{DirOpArgs3, PostOpAttributes, PostOpFh3, SetAttributes, WccData},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Mkdir3Args {
    pub mkdir_where: DirOpArgs3,
    pub attributes: SetAttributes,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Mkdir3ResOk {
    pub obj: PostOpFh3,
    pub attributes: PostOpAttributes,
    pub wcc_data: WccData,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Mkdir3ResFail {
    pub dir_wcc: WccData,
}

pub type MkdirResult = Result<Mkdir3ResOk, (NfsStat3, Mkdir3ResFail)>;
