//! Argument and result types of the NFSv3 procedures.
//!
//! Every result is an `nfsstat3` discriminated union: `NFS3_OK` selects the
//! `ResOk` arm, any other status the `ResFail` arm.  Both decode to
//! `Result<ResOk, (NfsStat3, ResFail)>`.
use crate::{
    nfs3::NFS3_OK,
    result::{Error, NfsStat3, Result, XdrError},
    xdr::{PackTo, Packer, UnpackFrom, Unpacker},
};

macro_rules! pub_use{
    ($($name:ident),+) => { $(mod $name; pub use $name::*;)+ }
}

pub_use!(lookup, create, getattr, setattr, access, readlink, read, write);
pub_use!(mkdir, symlink, remove, rmdir, rename);
pub_use!(readdirplus, fsstat, fsinfo, commit);

impl<T, E, B> UnpackFrom<B> for core::result::Result<T, (NfsStat3, E)>
where
    T: UnpackFrom<B>,
    E: UnpackFrom<B>,
    B: Unpacker,
{
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let n = u32::unpack_from(buf)?;
        if n == NFS3_OK {
            return Ok(Ok(T::unpack_from(buf)?));
        }

        match NfsStat3::from_code(n) {
            Some(stat) => Ok(Err((stat, E::unpack_from(buf)?))),
            None => Err(XdrError::InvalidDiscriminant {
                type_name: "nfsstat3",
                value: n,
            }
            .into()),
        }
    }
}

impl<T, E, B> PackTo<B> for core::result::Result<T, (NfsStat3, E)>
where
    T: PackTo<B>,
    E: PackTo<B>,
    B: Packer,
{
    fn pack_to(&self, buf: &mut B) {
        match self {
            Ok(ok) => {
                buf.pack_uint(NFS3_OK);
                ok.pack_to(buf);
            }
            Err((stat, fail)) => {
                buf.pack_uint(stat.code());
                fail.pack_to(buf);
            }
        }
    }
}

/// Collapses a decoded result union into the crate result, keeping only the
/// status of the failure arm
pub trait NfsResult<T> {
    fn into_nfs_result(self) -> Result<T>;
}

impl<T, E> NfsResult<T> for core::result::Result<T, (NfsStat3, E)> {
    fn into_nfs_result(self) -> Result<T> {
        self.map_err(|(stat, _)| Error::Nfs(stat))
    }
}
