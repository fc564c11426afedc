use crate::{
    nfs3::{Count3, NfsFh3, Offset3, Verifier3, WccData},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

/// Commits `count` bytes from `offset`, zero count means to the end of file
#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Commit3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Commit3ResOk {
    pub file_wcc: WccData,
    pub verifier: Verifier3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Commit3ResFail {
    pub file_wcc: WccData,
}

pub type CommitResult = Result<Commit3ResOk, (NfsStat3, Commit3ResFail)>;
