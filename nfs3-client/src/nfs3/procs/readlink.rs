use crate::{
    nfs3::{NfsFh3, NfsPath3, PostOpAttributes},
    result::NfsStat3,
    xdr,
};
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReadLink3Args {
    pub symlink: NfsFh3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct ReadLink3ResOk {
    pub symlink_attributes: PostOpAttributes,
    pub data: NfsPath3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct ReadLink3ResFail {
    pub symlink_attributes: PostOpAttributes,
}

pub type ReadLinkResult = Result<ReadLink3ResOk, (NfsStat3, ReadLink3ResFail)>;
