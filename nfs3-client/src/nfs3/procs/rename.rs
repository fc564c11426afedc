use crate::{
    nfs3::{DirOpArgs3, WccData},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Rename3Args {
    pub from: DirOpArgs3,
    pub to: DirOpArgs3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Rename3ResOk {
    pub fromdir_wcc: WccData,
    pub todir_wcc: WccData,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Rename3ResFail {
    pub fromdir_wcc: WccData,
    pub todir_wcc: WccData,
}

pub type RenameResult = Result<Rename3ResOk, (NfsStat3, Rename3ResFail)>;
