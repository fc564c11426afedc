use crate::{
    nfs3::{
        self,
        procs::{self, CreateHow3, StableHow},
        Cookie3, Count3, DirOpArgs3, NfsFh3, NfsTime3, Offset3, SetAttributes, Verifier3,
    },
    result::Result,
    rpc::{CallHeader, OpaqueAuth, RpcClient},
    xdr::{PackTo, UnpackFrom},
};
use bytes::{Bytes, BytesMut};
use tracing::error;

/// Handle-based NFSv3 procedures over one RPC connection.
///
/// Each `call_*` method issues exactly one RPC and returns the decoded
/// result union, leaving the interpretation of a failure status to the
/// caller.  RPC and decode faults are returned as `Err`.
pub struct NfsClient {
    rpc: RpcClient,
    auth: OpaqueAuth,
}

impl NfsClient {
    /// Consructs a new `NfsClient` sending `auth` as the credential of every
    /// call
    pub fn new(rpc: RpcClient, auth: OpaqueAuth) -> NfsClient {
        NfsClient { rpc, auth }
    }

    pub fn auth(&self) -> &OpaqueAuth {
        &self.auth
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    fn new_rpc_header(&self, proc: u32) -> CallHeader {
        CallHeader {
            prog: nfs3::PROGRAM,
            vers: nfs3::VERSION,
            proc,
            cred: self.auth.clone(),
            verf: OpaqueAuth::new_none(),
        }
    }

    async fn call<A, R>(&self, proc: u32, args: &A) -> Result<R>
    where
        A: PackTo<BytesMut>,
        R: UnpackFrom<Bytes>,
    {
        let mut response_buf = self.rpc.invoke(&self.new_rpc_header(proc), args).await?;
        R::unpack_from(&mut response_buf).map_err(|err| {
            error!("failed to decode reply of procedure {}: {}", proc, err);
            err
        })
    }

    pub async fn call_null(&self) -> Result<()> {
        self.rpc.null(nfs3::PROGRAM, nfs3::VERSION).await
    }

    pub async fn call_getattr(&self, object: &NfsFh3) -> Result<procs::GetAttrResult> {
        let args = procs::GetAttr3Args {
            object: object.clone(),
        };
        self.call(nfs3::NFSPROC3_GETATTR, &args).await
    }

    pub async fn call_setattr(
        &self,
        object: &NfsFh3,
        new_attributes: SetAttributes,
        guard: Option<NfsTime3>,
    ) -> Result<procs::SetAttrResult> {
        let args = procs::SetAttr3Args {
            object: object.clone(),
            new_attributes,
            guard,
        };
        self.call(nfs3::NFSPROC3_SETATTR, &args).await
    }

    pub async fn call_lookup(&self, dir: &NfsFh3, name: &str) -> Result<procs::LookupResult> {
        let args = procs::Lookup3Args {
            what: dir_op(dir, name),
        };
        self.call(nfs3::NFSPROC3_LOOKUP, &args).await
    }

    pub async fn call_access(&self, object: &NfsFh3, access: u32) -> Result<procs::AccessResult> {
        let args = procs::Access3Args {
            object: object.clone(),
            access,
        };
        self.call(nfs3::NFSPROC3_ACCESS, &args).await
    }

    pub async fn call_readlink(&self, symlink: &NfsFh3) -> Result<procs::ReadLinkResult> {
        let args = procs::ReadLink3Args {
            symlink: symlink.clone(),
        };
        self.call(nfs3::NFSPROC3_READLINK, &args).await
    }

    pub async fn call_read(
        &self,
        file: &NfsFh3,
        offset: Offset3,
        count: Count3,
    ) -> Result<procs::ReadResult> {
        let args = procs::Read3Args {
            file: file.clone(),
            offset,
            count,
        };
        self.call(nfs3::NFSPROC3_READ, &args).await
    }

    pub async fn call_write(
        &self,
        file: &NfsFh3,
        offset: Offset3,
        stable: StableHow,
        data: Bytes,
    ) -> Result<procs::WriteResult> {
        let args = procs::Write3Args {
            file: file.clone(),
            offset,
            count: data.len() as u32,
            stable,
            data,
        };
        self.call(nfs3::NFSPROC3_WRITE, &args).await
    }

    pub async fn call_create(
        &self,
        dir: &NfsFh3,
        name: &str,
        how: CreateHow3,
    ) -> Result<procs::CreateResult> {
        let args = procs::Create3Args {
            create_where: dir_op(dir, name),
            how,
        };
        self.call(nfs3::NFSPROC3_CREATE, &args).await
    }

    pub async fn call_mkdir(
        &self,
        dir: &NfsFh3,
        name: &str,
        attributes: SetAttributes,
    ) -> Result<procs::MkdirResult> {
        let args = procs::Mkdir3Args {
            mkdir_where: dir_op(dir, name),
            attributes,
        };
        self.call(nfs3::NFSPROC3_MKDIR, &args).await
    }

    pub async fn call_symlink(
        &self,
        dir: &NfsFh3,
        name: &str,
        attributes: SetAttributes,
        target: &str,
    ) -> Result<procs::SymLinkResult> {
        let args = procs::SymLink3Args {
            symlink_where: dir_op(dir, name),
            data: procs::SymLinkData3 {
                attributes,
                data: target.to_string(),
            },
        };
        self.call(nfs3::NFSPROC3_SYMLINK, &args).await
    }

    pub async fn call_remove(&self, dir: &NfsFh3, name: &str) -> Result<procs::RemoveResult> {
        let args = procs::Remove3Args {
            object: dir_op(dir, name),
        };
        self.call(nfs3::NFSPROC3_REMOVE, &args).await
    }

    pub async fn call_rmdir(&self, dir: &NfsFh3, name: &str) -> Result<procs::RmdirResult> {
        let args = procs::Rmdir3Args {
            object: dir_op(dir, name),
        };
        self.call(nfs3::NFSPROC3_RMDIR, &args).await
    }

    pub async fn call_rename(
        &self,
        from_dir: &NfsFh3,
        from_name: &str,
        to_dir: &NfsFh3,
        to_name: &str,
    ) -> Result<procs::RenameResult> {
        let args = procs::Rename3Args {
            from: dir_op(from_dir, from_name),
            to: dir_op(to_dir, to_name),
        };
        self.call(nfs3::NFSPROC3_RENAME, &args).await
    }

    pub async fn call_readdirplus(
        &self,
        dir: &NfsFh3,
        cookie: Cookie3,
        verifier: Verifier3,
        maxcount: Count3,
    ) -> Result<procs::ReaddirPlusResult> {
        let args = procs::ReaddirPlus3Args {
            dir: dir.clone(),
            cookie,
            verifier,
            dircount: maxcount,
            maxcount,
        };
        self.call(nfs3::NFSPROC3_READDIRPLUS, &args).await
    }

    pub async fn call_fsstat(&self, root: &NfsFh3) -> Result<procs::FsstatResult> {
        let args = procs::Fsstat3Args { root: root.clone() };
        self.call(nfs3::NFSPROC3_FSSTAT, &args).await
    }

    pub async fn call_fsinfo(&self, root: &NfsFh3) -> Result<procs::FsinfoResult> {
        let args = procs::Fsinfo3Args { root: root.clone() };
        self.call(nfs3::NFSPROC3_FSINFO, &args).await
    }

    pub async fn call_commit(
        &self,
        file: &NfsFh3,
        offset: Offset3,
        count: Count3,
    ) -> Result<procs::CommitResult> {
        let args = procs::Commit3Args {
            file: file.clone(),
            offset,
            count,
        };
        self.call(nfs3::NFSPROC3_COMMIT, &args).await
    }
}

fn dir_op(dir: &NfsFh3, name: &str) -> DirOpArgs3 {
    DirOpArgs3 {
        dir: dir.clone(),
        name: name.to_string(),
    }
}
