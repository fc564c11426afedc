use crate::{
    nfs3::{DirOpArgs3, NfsPath3, PostOpAttributes, PostOpFh3, SetAttributes, WccData},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct SymLinkData3 {
    pub attributes: SetAttributes,
    pub data: NfsPath3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct SymLink3Args {
    pub symlink_where: DirOpArgs3,
    pub data: SymLinkData3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct SymLink3ResOk {
    pub obj: PostOpFh3,
    pub attributes: PostOpAttributes,
    pub wcc_data: WccData,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct SymLink3ResFail {
    pub dir_wcc: WccData,
}

pub type SymLinkResult = Result<SymLink3ResOk, (NfsStat3, SymLink3ResFail)>;
