//! Path-based operations on a mounted export.
use crate::{
    nfs3::{
        self,
        procs::{CreateHow3, EntryPlus3, Fsinfo3ResOk, Fsstat3ResOk, NfsResult as _},
        FileAttributes, FileReader, FileWriter, Mode3, NfsClient, NfsFh3, SetAttributes,
        WccData,
    },
    result::{Error, NfsStat3, Result},
    rpc::{OpaqueAuth, RpcClient},
};
use std::sync::Arc;
use tracing::{debug, error};

/// How much of a directory [`Target::read_dir_plus`] fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDirLimit {
    /// Follow the cookie chain until the server reports end of listing
    All,
    /// Fetch exactly one page with the given reply budget in bytes, whether
    /// or not the listing is complete
    OnePage(u32),
}

/// Splits `path` into its components, collapsing repeated and trailing
/// slashes, dropping `.` and resolving `..` against the preceding
/// component.  A leading `/` is ignored: every path is relative to the
/// export root.  A `..` that would climb above the start of a relative path
/// is kept and sent to the server.
pub fn clean_path(path: &str) -> Vec<&str> {
    let rooted = path.starts_with('/');
    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if components.last().map_or(false, |last| *last != "..") {
                    components.pop();
                } else if !rooted {
                    components.push("..");
                }
            }
            _ => components.push(component),
        }
    }

    components
}

/// Splits the cleaned `path` at its last component, returning the parent
/// path and the leaf name.  The export root has no leaf and is rejected.
pub fn split_path(path: &str) -> Result<(String, String)> {
    let mut components = clean_path(path);
    match components.pop() {
        Some(name) if name != ".." => Ok((components.join("/"), name.to_string())),
        _ => Err(Error::InvalidPath(path.to_string())),
    }
}

/// A mounted export.  All operations take `&self`; a `Target` can be shared
/// between tasks and issues its calls over one multiplexed connection.
pub struct Target {
    client: Arc<NfsClient>,
    root: NfsFh3,
    dir_path: String,
    fsinfo: Fsinfo3ResOk,
}

impl Target {
    /// Builds a target for the export `dir_path` whose root handle is
    /// `root`.  Issues FSINFO on the root to learn the transfer sizes.
    pub async fn new(
        rpc: RpcClient,
        auth: OpaqueAuth,
        root: NfsFh3,
        dir_path: impl Into<String>,
    ) -> Result<Target> {
        let client = Arc::new(NfsClient::new(rpc, auth));
        let dir_path = dir_path.into();
        let fsinfo = client.call_fsinfo(&root).await?.into_nfs_result()?;
        debug!("{} fsinfo={:?}", dir_path, fsinfo);

        Ok(Target {
            client,
            root,
            dir_path,
            fsinfo,
        })
    }

    /// Handle of the export root
    pub fn root(&self) -> &NfsFh3 {
        &self.root
    }

    /// Path of the mounted export on the server
    pub fn dir_path(&self) -> &str {
        &self.dir_path
    }

    /// File system information fetched when the target was built
    pub fn fsinfo(&self) -> &Fsinfo3ResOk {
        &self.fsinfo
    }

    /// The handle-based client the target issues its calls through
    pub fn client(&self) -> &Arc<NfsClient> {
        &self.client
    }

    /// Closes the NFS connection.  Open readers and writers fail afterwards.
    pub async fn close(self) -> Result<()> {
        self.client.rpc().close().await
    }

    /// Re-reads FSINFO from the server
    pub async fn fetch_fsinfo(&self) -> Result<Fsinfo3ResOk> {
        self.client.call_fsinfo(&self.root).await?.into_nfs_result()
    }

    /// Looks up one `name` in the directory `dir`
    pub async fn lookup_at(
        &self,
        dir: &NfsFh3,
        name: &str,
    ) -> Result<(Option<FileAttributes>, NfsFh3)> {
        let res = self
            .client
            .call_lookup(dir, name)
            .await?
            .into_nfs_result()
            .map_err(|err| {
                debug!("lookup({}): {}", name, err);
                err
            })?;

        debug!("lookup({}): FH {:02x?}", name, res.object.data);
        Ok((res.obj_attributes, res.object))
    }

    /// Resolves `path` one component at a time from the export root.
    /// Returns the attributes reported by the last LOOKUP, absent for the
    /// root itself or when the server omits them.
    pub async fn lookup(&self, path: &str) -> Result<(Option<FileAttributes>, NfsFh3)> {
        let mut attributes = None;
        let mut fh = self.root.clone();

        for name in clean_path(path) {
            let (attrs, next) = self.lookup_at(&fh, name).await?;
            attributes = attrs;
            fh = next;
        }

        Ok((attributes, fh))
    }

    /// Fetches the attributes of the object behind `fh`
    pub async fn getattr_fh(&self, fh: &NfsFh3) -> Result<FileAttributes> {
        let res = self.client.call_getattr(fh).await?.into_nfs_result()?;
        Ok(res.attributes)
    }

    pub async fn getattr(&self, path: &str) -> Result<FileAttributes> {
        let (_, fh) = self.lookup(path).await?;
        let attributes = self.getattr_fh(&fh).await?;
        debug!("getattr({}): attr: {:?}", path, attributes);
        Ok(attributes)
    }

    /// Applies `attributes` to `path`, guarded by the ctime observed while
    /// resolving it: if the object changed in between, the server refuses
    /// and the error satisfies [`Error::is_precondition_failed`].
    pub async fn setattr(&self, path: &str, attributes: SetAttributes) -> Result<WccData> {
        let (observed, fh) = self.lookup(path).await?;
        let ctime = match observed {
            Some(observed) => observed.ctime,
            None => self.getattr_fh(&fh).await?.ctime,
        };

        let res = self
            .client
            .call_setattr(&fh, attributes, Some(ctime))
            .await?
            .into_nfs_result()
            .map_err(|err| {
                debug!("setattr({}): {}", path, err);
                err
            })?;
        debug!("setattr({}): wcc: {:?}", path, res.obj_wcc);

        Ok(res.obj_wcc)
    }

    /// Asks which of the `ACCESS3_*` bits in `mask` the caller holds on
    /// `path`.  The server may grant fewer than requested.
    pub async fn access(&self, path: &str, mask: u32) -> Result<u32> {
        let (_, fh) = self.lookup(path).await?;
        let res = self.client.call_access(&fh, mask).await?.into_nfs_result()?;
        debug!("access({}): asked {:#x} granted {:#x}", path, mask, res.access);
        Ok(res.access)
    }

    /// Lists the directory behind `fh`, see [`Target::read_dir_plus`]
    pub async fn read_dir_plus_fh(
        &self,
        fh: &NfsFh3,
        limit: ReadDirLimit,
    ) -> Result<Vec<EntryPlus3>> {
        let maxcount = match limit {
            ReadDirLimit::All => nfs3::READDIR_MAX_COUNT,
            ReadDirLimit::OnePage(maxcount) => maxcount,
        };

        let mut cookie = 0;
        let mut verifier = 0;
        let mut entries = Vec::new();
        loop {
            let res = self
                .client
                .call_readdirplus(fh, cookie, verifier, maxcount)
                .await?
                .into_nfs_result()
                .map_err(|err| {
                    debug!("readdir({:02x?}): {}", fh.data, err);
                    err
                })?;

            let page = res.reply;
            if let Some(last) = page.entries.last() {
                cookie = last.cookie;
            }
            let empty = page.entries.is_empty();
            entries.extend(page.entries);

            if page.eof || limit != ReadDirLimit::All {
                break;
            }
            if empty {
                error!("readdir({:02x?}): empty page without eof", fh.data);
                return Err(Error::EmptyPage);
            }

            debug!("no EOF for dirents, calling back for more");
            verifier = res.verifier;
        }

        Ok(entries)
    }

    /// Lists the directory at `path` with attributes and handles, in server
    /// order.  `.` and `..` are included when the server returns them.
    pub async fn read_dir_plus(&self, path: &str, limit: ReadDirLimit) -> Result<Vec<EntryPlus3>> {
        let (_, fh) = self.lookup(path).await?;
        self.read_dir_plus_fh(&fh, limit).await
    }

    /// Creates the directory `path`.  The server may omit the new handle.
    pub async fn mkdir(&self, path: &str, mode: Mode3) -> Result<Option<NfsFh3>> {
        let (dir, name) = split_path(path)?;
        let (_, fh) = self.lookup(&dir).await?;

        let res = self
            .client
            .call_mkdir(&fh, &name, SetAttributes::with_mode(mode))
            .await?
            .into_nfs_result()
            .map_err(|err| {
                debug!("mkdir({}): {}", path, err);
                err
            })?;

        debug!("mkdir({}): created successfully", path);
        Ok(res.obj)
    }

    /// Issues CREATE UNCHECKED for `path`, returning the parent handle, the
    /// leaf name and the new handle if the server sent one
    async fn create_with(
        &self,
        path: &str,
        attributes: SetAttributes,
    ) -> Result<(NfsFh3, String, Option<NfsFh3>)> {
        let (dir, name) = split_path(path)?;
        let (_, fh) = self.lookup(&dir).await?;

        let res = self
            .client
            .call_create(&fh, &name, CreateHow3::Unchecked(attributes))
            .await?
            .into_nfs_result()
            .map_err(|err| {
                debug!("create({}): {}", path, err);
                err
            })?;

        debug!("create({}): created successfully", path);
        Ok((fh, name, res.obj))
    }

    /// Creates the regular file `path`, replacing the attributes of an
    /// existing file of that name.  The server may omit the new handle.
    pub async fn create(&self, path: &str, mode: Mode3) -> Result<Option<NfsFh3>> {
        let (_, _, obj) = self.create_with(path, SetAttributes::with_mode(mode)).await?;
        Ok(obj)
    }

    pub async fn symlink(&self, path: &str, target: &str, mode: Mode3) -> Result<Option<NfsFh3>> {
        let (dir, name) = split_path(path)?;
        let (_, fh) = self.lookup(&dir).await?;

        let res = self
            .client
            .call_symlink(&fh, &name, SetAttributes::with_mode(mode), target)
            .await?
            .into_nfs_result()?;

        debug!("symlink({} -> {}): created successfully", path, target);
        Ok(res.obj)
    }

    pub async fn readlink(&self, path: &str) -> Result<String> {
        let (_, fh) = self.lookup(path).await?;
        let res = self.client.call_readlink(&fh).await?.into_nfs_result()?;
        Ok(res.data)
    }

    /// Removes the non-directory `name` from `dir`
    pub async fn remove_at(&self, dir: &NfsFh3, name: &str) -> Result<()> {
        self.client
            .call_remove(dir, name)
            .await?
            .into_nfs_result()
            .map_err(|err| {
                debug!("remove({}): {}", name, err);
                err
            })?;

        Ok(())
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        let (dir, name) = split_path(path)?;
        let (_, fh) = self.lookup(&dir).await?;
        self.remove_at(&fh, &name).await
    }

    /// Removes the empty directory `name` from `dir`
    pub async fn rmdir_at(&self, dir: &NfsFh3, name: &str) -> Result<()> {
        self.client
            .call_rmdir(dir, name)
            .await?
            .into_nfs_result()
            .map_err(|err| {
                debug!("rmdir({}): {}", name, err);
                err
            })?;

        debug!("rmdir({}): deleted successfully", name);
        Ok(())
    }

    /// Removes the directory `path`.  A populated directory fails with an
    /// error satisfying [`Error::is_not_empty`].
    pub async fn rmdir(&self, path: &str) -> Result<()> {
        let (dir, name) = split_path(path)?;
        let (_, fh) = self.lookup(&dir).await?;
        self.rmdir_at(&fh, &name).await
    }

    /// Removes `path` and everything below it.
    ///
    /// An absent `path` is not an error.  A `path` that is not a directory
    /// fails with [`NfsStat3::NotDir`] and nothing is deleted.  The first
    /// failed deletion aborts the walk and is returned, leaving whatever was
    /// not yet deleted in place.
    pub async fn remove_all(&self, path: &str) -> Result<()> {
        let (dir, name) = split_path(path)?;
        let (_, parent) = self.lookup(&dir).await?;

        // an empty or missing directory needs nothing more
        match self.rmdir_at(&parent, &name).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) if err.is_not_dir() => return Err(err),
            Err(_) => {}
        }

        let (_, top) = self.lookup_at(&parent, &name).await?;
        self.remove_contents(top).await?;
        self.rmdir_at(&parent, &name).await
    }

    /// Deletes everything inside the directory `top`, depth first, keeping
    /// the walk on an explicit stack.
    async fn remove_contents(&self, top: NfsFh3) -> Result<()> {
        struct Pending {
            dir: NfsFh3,
            /// Entries still to delete, in reverse server order
            entries: Vec<EntryPlus3>,
            /// Parent handle and name to remove once `entries` is drained
            parent: Option<(NfsFh3, String)>,
        }

        let mut stack = vec![Pending {
            entries: self.listing_to_delete(&top).await?,
            dir: top,
            parent: None,
        }];

        loop {
            let (dir, entry) = match stack.last_mut() {
                None => return Ok(()),
                Some(pending) => (pending.dir.clone(), pending.entries.pop()),
            };

            let entry = match entry {
                Some(entry) => entry,
                None => {
                    if let Some(Pending {
                        parent: Some((parent, name)),
                        ..
                    }) = stack.pop()
                    {
                        self.rmdir_at(&parent, &name).await.map_err(|err| {
                            error!("error deleting {}: {}", name, err);
                            err
                        })?;
                    }
                    continue;
                }
            };

            let (is_dir, handle) = self.entry_kind(&dir, &entry).await?;
            if is_dir {
                stack.push(Pending {
                    entries: self.listing_to_delete(&handle).await?,
                    dir: handle,
                    parent: Some((dir, entry.name)),
                });
            } else {
                self.remove_at(&dir, &entry.name).await.map_err(|err| {
                    error!("error deleting {}: {}", entry.name, err);
                    err
                })?;
            }
        }
    }

    /// Full listing of `dir` without `.` and `..`, reversed for popping
    async fn listing_to_delete(&self, dir: &NfsFh3) -> Result<Vec<EntryPlus3>> {
        let mut entries: Vec<_> = self
            .read_dir_plus_fh(dir, ReadDirLimit::All)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dot())
            .collect();
        entries.reverse();
        Ok(entries)
    }

    /// Whether `entry` of `dir` is a directory, and its handle.  Falls back
    /// to LOOKUP and GETATTR when the listing did not carry them.
    async fn entry_kind(&self, dir: &NfsFh3, entry: &EntryPlus3) -> Result<(bool, NfsFh3)> {
        if let (Some(attributes), Some(handle)) = (&entry.name_attributes, &entry.name_handle) {
            return Ok((attributes.is_dir(), handle.clone()));
        }

        let (attributes, handle) = self.lookup_at(dir, &entry.name).await?;
        let attributes = match attributes.or_else(|| entry.name_attributes.clone()) {
            Some(attributes) => attributes,
            None => self.getattr_fh(&handle).await?,
        };

        Ok((attributes.is_dir(), handle))
    }

    /// Renames `from_name` in the directory `from_dir` to `to_name` in
    /// `to_dir`
    pub async fn rename(
        &self,
        from_dir: &NfsFh3,
        from_name: &str,
        to_dir: &NfsFh3,
        to_name: &str,
    ) -> Result<()> {
        self.client
            .call_rename(from_dir, from_name, to_dir, to_name)
            .await?
            .into_nfs_result()
            .map_err(|err| {
                error!("rename {} to {} fail {}", from_name, to_name, err);
                err
            })?;

        Ok(())
    }

    pub async fn fsstat(&self, path: &str) -> Result<Fsstat3ResOk> {
        let (_, fh) = self.lookup(path).await?;
        self.client.call_fsstat(&fh).await?.into_nfs_result()
    }

    /// Bytes per READ, the server's preferred size within its maximum
    pub fn read_size(&self) -> u32 {
        transfer_size(self.fsinfo.rtpref, self.fsinfo.rtmax)
    }

    /// Bytes per WRITE, the server's preferred size within its maximum
    pub fn write_size(&self) -> u32 {
        transfer_size(self.fsinfo.wtpref, self.fsinfo.wtmax)
    }

    /// Creates or truncates the regular file `path` and returns a writer
    /// positioned at its start.
    pub async fn open_file(&self, path: &str, mode: Mode3) -> Result<FileWriter> {
        let attributes = SetAttributes {
            mode: Some(mode),
            size: Some(0),
            ..Default::default()
        };
        let fh = match self.create_with(path, attributes).await? {
            (_, _, Some(fh)) => fh,
            (dir, name, None) => self.lookup_at(&dir, &name).await?.1,
        };

        Ok(FileWriter::new(
            self.client.clone(),
            fh,
            self.write_size() as usize,
        ))
    }

    /// Opens the existing file `path` for reading from its start
    pub async fn open(&self, path: &str) -> Result<FileReader> {
        let (attributes, fh) = self.lookup(path).await?;
        if let Some(attributes) = attributes {
            if attributes.is_dir() {
                return Err(NfsStat3::IsDir.into());
            }
        }

        Ok(FileReader::new(self.client.clone(), fh, self.read_size()))
    }
}

fn transfer_size(pref: u32, max: u32) -> u32 {
    let size = if pref != 0 { pref } else { max };
    let size = if max != 0 { size.min(max) } else { size };
    match size {
        0 => nfs3::MAX_IO_SIZE,
        size => size.min(nfs3::MAX_IO_SIZE),
    }
}
