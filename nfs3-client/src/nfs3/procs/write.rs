use crate::{
    nfs3::{Count3, NfsFh3, Offset3, Verifier3, WccData},
    result::NfsStat3,
    xdr,
};
use bytes::Bytes;
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableHow {
    Unstable,
    DataSync,
    FileSync,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Write3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
    pub stable: StableHow,
    pub data: Bytes,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Write3ResOk {
    pub file_wcc: WccData,
    pub count: Count3,
    pub committed: StableHow,
    pub verifier: Verifier3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Write3ResFail {
    pub file_wcc: WccData,
}

pub type WriteResult = Result<Write3ResOk, (NfsStat3, Write3ResFail)>;
