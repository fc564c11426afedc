use crate::{
    nfs3::{Count3, NfsFh3, Offset3, PostOpAttributes},
    result::NfsStat3,
    xdr,
};
use bytes::Bytes;
use nfs3_client_macros::{PackTo, UnpackFrom};

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Read3Args {
    pub file: NfsFh3,
    pub offset: Offset3,
    pub count: Count3,
}

#[derive(PackTo, UnpackFrom, Debug, Clone)]
pub struct Read3ResOk {
    pub file_attributes: PostOpAttributes,
    pub count: Count3,
    pub eof: bool,
    pub data: Bytes,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Default)]
pub struct Read3ResFail {
    pub file_attributes: PostOpAttributes,
}

pub type ReadResult = Result<Read3ResOk, (NfsStat3, Read3ResFail)>;
