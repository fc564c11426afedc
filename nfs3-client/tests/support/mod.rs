//! In-memory NFSv3 and MOUNT server speaking the wire protocol over
//! `tokio::io::duplex`, with hooks to make it misbehave.
#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tracing::debug;

use nfs3_client::{
    mount,
    nfs3::{self, procs::*, *},
    result::NfsStat3,
    rpc::{
        self, AcceptedReply, AcceptedReplyStat, OpaqueAuth, ReplyHeader, RpcClient, RpcOptions,
    },
    xdr::{PackTo, Packer, UnpackFrom},
};

pub const EXPORT: &str = "/export";
const ROOT_ID: u64 = 1;
const LAST_FRAGMENT: u32 = 0x8000_0000;
const DUPLEX_BUF: usize = 256 * 1024;

pub enum NodeKind {
    Dir(BTreeMap<String, u64>),
    File(Vec<u8>),
    Symlink(String),
}

pub struct Node {
    pub kind: NodeKind,
    pub mode: u32,
    pub parent: u64,
    pub ctime: NfsTime3,
}

/// Server state and knobs.  Tests reach it through [`FakeServer::state`].
pub struct State {
    pub nodes: HashMap<u64, Node>,
    next_id: u64,
    clock: u32,
    /// Calls received, keyed by procedure number, NFS and MOUNT separately
    pub nfs_calls: HashMap<u32, usize>,
    pub mount_calls: HashMap<u32, usize>,
    /// Credential of the last NFS call
    pub last_cred: Option<OpaqueAuth>,
    /// READDIRPLUS entries per page
    pub page_size: usize,
    /// Whether READDIRPLUS entries carry attributes and handles
    pub plus_attributes: bool,
    /// Whether listings start with `.` and `..`
    pub list_dots: bool,
    /// Reply to every READDIRPLUS with an empty page that is not the last
    pub stall_readdir: bool,
    /// Change the ctime of every object right after it was looked up
    pub bump_ctime_on_lookup: bool,
    /// Accept at most this many bytes per WRITE
    pub short_write: Option<u32>,
    pub write_verifier: u64,
    /// Report a new write verifier on COMMIT, as after a server restart
    pub restart_before_commit: bool,
    pub rtpref: u32,
    pub wtpref: u32,
    /// Answer UMNT with a server system error
    pub fail_umnt: bool,
}

impl State {
    fn new() -> State {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID,
            Node {
                kind: NodeKind::Dir(BTreeMap::new()),
                mode: 0o755,
                parent: ROOT_ID,
                ctime: NfsTime3::default(),
            },
        );

        State {
            nodes,
            next_id: ROOT_ID + 1,
            clock: 1,
            nfs_calls: HashMap::new(),
            mount_calls: HashMap::new(),
            last_cred: None,
            page_size: 64,
            plus_attributes: true,
            list_dots: true,
            stall_readdir: false,
            bump_ctime_on_lookup: false,
            short_write: None,
            write_verifier: 0xfeed_0001,
            restart_before_commit: false,
            rtpref: 64 * 1024,
            wtpref: 64 * 1024,
            fail_umnt: false,
        }
    }

    fn tick(&mut self) -> NfsTime3 {
        self.clock += 1;
        NfsTime3 {
            seconds: self.clock,
            nano_seconds: 0,
        }
    }

    fn node(&self, fh: &NfsFh3) -> Result<(u64, &Node), NfsStat3> {
        let id = fh_to_id(fh)?;
        self.nodes
            .get(&id)
            .map(|node| (id, node))
            .ok_or(NfsStat3::Stale)
    }

    fn children(&self, dir: &NfsFh3) -> Result<(u64, &BTreeMap<String, u64>), NfsStat3> {
        match self.node(dir)? {
            (id, Node {
                kind: NodeKind::Dir(children),
                ..
            }) => Ok((id, children)),
            _ => Err(NfsStat3::NotDir),
        }
    }

    fn children_mut(&mut self, dir: &NfsFh3) -> Result<&mut BTreeMap<String, u64>, NfsStat3> {
        let id = fh_to_id(dir)?;
        match self.nodes.get_mut(&id) {
            None => Err(NfsStat3::Stale),
            Some(Node {
                kind: NodeKind::Dir(children),
                ..
            }) => Ok(children),
            Some(_) => Err(NfsStat3::NotDir),
        }
    }

    fn attributes(&self, id: u64) -> Option<FileAttributes> {
        let node = self.nodes.get(&id)?;
        let (file_type, size) = match &node.kind {
            NodeKind::Dir(children) => (FileType3::Dir, children.len() as u64),
            NodeKind::File(data) => (FileType3::Reg, data.len() as u64),
            NodeKind::Symlink(target) => (FileType3::Lnk, target.len() as u64),
        };

        Some(FileAttributes {
            file_type,
            mode: node.mode,
            num_links: 1,
            uid: 0,
            gid: 0,
            size,
            used: size,
            rdev: SpecData3::default(),
            fsid: 1,
            file_id: id,
            atime: node.ctime,
            mtime: node.ctime,
            ctime: node.ctime,
        })
    }

    /// Adds a node under `dir`, failing if the name is taken
    fn insert(&mut self, dir: &NfsFh3, name: &str, kind: NodeKind, mode: u32) -> Result<u64, NfsStat3> {
        let parent = fh_to_id(dir)?;
        let id = self.next_id;
        let ctime = self.tick();
        let children = self.children_mut(dir)?;
        if children.contains_key(name) {
            return Err(NfsStat3::Exist);
        }
        children.insert(name.to_string(), id);

        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                kind,
                mode,
                parent,
                ctime,
            },
        );
        Ok(id)
    }

    fn resolve(&self, path: &str) -> Option<u64> {
        let mut id = ROOT_ID;
        for name in path.split('/').filter(|name| !name.is_empty()) {
            match &self.nodes.get(&id)?.kind {
                NodeKind::Dir(children) => id = *children.get(name)?,
                _ => return None,
            }
        }
        Some(id)
    }

    /// Test setup helper: creates `path` and any missing parent directories
    pub fn mkdir_p(&mut self, path: &str) -> u64 {
        let mut id = ROOT_ID;
        for name in path.split('/').filter(|name| !name.is_empty()) {
            let dir = id_to_fh(id);
            id = match self.children(&dir) {
                Ok((_, children)) if children.contains_key(name) => children[name],
                _ => self
                    .insert(&dir, name, NodeKind::Dir(BTreeMap::new()), 0o755)
                    .unwrap_or(0),
            };
        }
        id
    }

    /// Test setup helper: creates the file `path` with `data`
    pub fn put_file(&mut self, path: &str, data: &[u8]) -> u64 {
        let (dir, name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        };
        let dir = self.mkdir_p(dir);
        self.insert(&id_to_fh(dir), name, NodeKind::File(data.to_vec()), 0o644)
            .unwrap_or(0)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    pub fn file_data(&self, path: &str) -> Option<&[u8]> {
        match &self.nodes.get(&self.resolve(path)?)?.kind {
            NodeKind::File(data) => Some(data),
            _ => None,
        }
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        Some(self.nodes.get(&self.resolve(path)?)?.mode)
    }

    /// Objects in the tree, the root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn fh_to_id(fh: &NfsFh3) -> Result<u64, NfsStat3> {
    let bytes: [u8; 8] = fh.data.as_slice().try_into().map_err(|_| NfsStat3::BadHandle)?;
    Ok(u64::from_be_bytes(bytes))
}

fn id_to_fh(id: u64) -> NfsFh3 {
    NfsFh3::new(id.to_be_bytes().to_vec())
}

#[derive(Clone)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    pub fn new() -> FakeServer {
        FakeServer {
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn root(&self) -> NfsFh3 {
        id_to_fh(ROOT_ID)
    }

    /// NFS calls of procedure `proc` received so far
    pub fn calls(&self, proc: u32) -> usize {
        self.state().nfs_calls.get(&proc).copied().unwrap_or(0)
    }

    pub fn mount_calls(&self, proc: u32) -> usize {
        self.state().mount_calls.get(&proc).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        let mut state = self.state();
        state.nfs_calls.clear();
        state.mount_calls.clear();
    }

    /// Connects a new client to this server
    pub fn connect(&self) -> RpcClient {
        self.connect_with(RpcOptions::default())
    }

    pub fn connect_with(&self, options: RpcOptions) -> RpcClient {
        let (client, server) = tokio::io::duplex(DUPLEX_BUF);
        let this = self.clone();
        tokio::spawn(async move { this.serve(server).await });
        RpcClient::with_options(client, options)
    }

    /// A target on the export root, built like a mount would
    pub async fn target(&self) -> Target {
        let auth = OpaqueAuth::new_sys(7, "test-client", 1000, 1000, vec![1000]);
        Target::new(self.connect(), auth, self.root(), EXPORT)
            .await
            .unwrap()
    }

    async fn serve(self, mut stream: DuplexStream) {
        loop {
            let mut buf = BytesMut::new();
            if rpc::read_packet(&mut stream, &mut buf, rpc::MAX_PACKET_SIZE)
                .await
                .is_err()
            {
                return;
            }

            let reply = match self.handle(buf.freeze()) {
                Some(reply) => reply,
                None => continue,
            };
            if stream.write_all(&reply).await.is_err() {
                return;
            }
        }
    }

    /// Decodes one call record and builds the reply record
    fn handle(&self, mut call: Bytes) -> Option<Bytes> {
        let xid = u32::unpack_from(&mut call).ok()?;
        let msg_type = u32::unpack_from(&mut call).ok()?;
        let rpc_vers = u32::unpack_from(&mut call).ok()?;
        let prog = u32::unpack_from(&mut call).ok()?;
        let vers = u32::unpack_from(&mut call).ok()?;
        let proc = u32::unpack_from(&mut call).ok()?;
        let cred = OpaqueAuth::unpack_from(&mut call).ok()?;
        let _verf = OpaqueAuth::unpack_from(&mut call).ok()?;
        if msg_type != rpc::CALL || rpc_vers != 2 {
            return None;
        }
        debug!("server: xid={:#x} prog={} vers={} proc={}", xid, prog, vers, proc);

        let mut body = BytesMut::new();
        let stat = match (prog, vers) {
            (nfs3::PROGRAM, nfs3::VERSION) => {
                let mut state = self.state();
                *state.nfs_calls.entry(proc).or_default() += 1;
                state.last_cred = Some(cred);
                nfs_proc(&mut state, proc, &mut call, &mut body)
            }
            (mount::PROGRAM, mount::VERSION) => {
                *self.state().mount_calls.entry(proc).or_default() += 1;
                mount_proc(self, proc, &mut call, &mut body)
            }
            _ => AcceptedReplyStat::ProgUnavail,
        };

        let mut reply = BytesMut::new();
        reply.pack_uint(0);
        reply.pack_uint(xid);
        reply.pack_uint(rpc::REPLY);
        ReplyHeader::Accepted(AcceptedReply {
            verf: OpaqueAuth::None,
            stat,
        })
        .pack_to(&mut reply);
        reply.extend_from_slice(&body);

        let mark = (reply.len() as u32 - 4) | LAST_FRAGMENT;
        reply[..4].copy_from_slice(&mark.to_be_bytes());
        Some(reply.freeze())
    }
}

fn mount_proc(
    server: &FakeServer,
    proc: u32,
    args: &mut Bytes,
    out: &mut BytesMut,
) -> AcceptedReplyStat {
    match proc {
        mount::MOUNTPROC3_NULL => {}
        mount::MOUNTPROC3_MNT => {
            let export = match String::unpack_from(args) {
                Ok(export) => export,
                Err(_) => return AcceptedReplyStat::GarbageArgs,
            };
            if export == EXPORT {
                out.pack_uint(mount::MNT3_OK);
                mount::MountRes3Ok {
                    handle: server.root(),
                    auth_flavors: vec![rpc::AUTH_SYS],
                }
                .pack_to(out);
            } else {
                out.pack_uint(mount::MNT3ERR_NOENT);
            }
        }
        mount::MOUNTPROC3_UMNT => {
            if String::unpack_from(args).is_err() {
                return AcceptedReplyStat::GarbageArgs;
            }
            if server.state().fail_umnt {
                return AcceptedReplyStat::SystemErr;
            }
        }
        _ => return AcceptedReplyStat::ProcUnavail,
    }

    AcceptedReplyStat::Success
}

/// Decodes the arguments of `proc`, runs it and packs its result union
fn nfs_proc(state: &mut State, proc: u32, args: &mut Bytes, out: &mut BytesMut) -> AcceptedReplyStat {
    macro_rules! dispatch {
        ($handler:ident) => {
            match UnpackFrom::unpack_from(args) {
                Ok(args) => $handler(state, args).pack_to(out),
                Err(_) => return AcceptedReplyStat::GarbageArgs,
            }
        };
    }

    match proc {
        nfs3::NFSPROC3_NULL => {}
        nfs3::NFSPROC3_GETATTR => dispatch!(getattr),
        nfs3::NFSPROC3_SETATTR => dispatch!(setattr),
        nfs3::NFSPROC3_LOOKUP => dispatch!(lookup),
        nfs3::NFSPROC3_ACCESS => dispatch!(access),
        nfs3::NFSPROC3_READLINK => dispatch!(readlink),
        nfs3::NFSPROC3_READ => dispatch!(read),
        nfs3::NFSPROC3_WRITE => dispatch!(write),
        nfs3::NFSPROC3_CREATE => dispatch!(create),
        nfs3::NFSPROC3_MKDIR => dispatch!(mkdir),
        nfs3::NFSPROC3_SYMLINK => dispatch!(symlink),
        nfs3::NFSPROC3_REMOVE => dispatch!(remove),
        nfs3::NFSPROC3_RMDIR => dispatch!(rmdir),
        nfs3::NFSPROC3_RENAME => dispatch!(rename),
        nfs3::NFSPROC3_READDIRPLUS => dispatch!(readdirplus),
        nfs3::NFSPROC3_FSSTAT => dispatch!(fsstat),
        nfs3::NFSPROC3_FSINFO => dispatch!(fsinfo),
        nfs3::NFSPROC3_COMMIT => dispatch!(commit),
        _ => return AcceptedReplyStat::ProcUnavail,
    }

    AcceptedReplyStat::Success
}

fn fail<T, E: Default>(stat: NfsStat3) -> Result<T, (NfsStat3, E)> {
    Err((stat, E::default()))
}

macro_rules! tri {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(stat) => return fail(stat),
        }
    };
}

fn getattr(state: &mut State, args: GetAttr3Args) -> GetAttrResult {
    let (id, _) = state.node(&args.object).map_err(|stat| (stat, ()))?;
    match state.attributes(id) {
        Some(attributes) => Ok(GetAttr3ResOk { attributes }),
        None => Err((NfsStat3::Stale, ())),
    }
}

fn setattr(state: &mut State, args: SetAttr3Args) -> SetAttrResult {
    let (id, node) = tri!(state.node(&args.object));
    if let Some(guard) = args.guard {
        if guard != node.ctime {
            return fail(NfsStat3::NotSync);
        }
    }

    let ctime = state.tick();
    let node = tri!(state.nodes.get_mut(&id).ok_or(NfsStat3::Stale));
    if let Some(mode) = args.new_attributes.mode {
        node.mode = mode;
    }
    if let (Some(size), NodeKind::File(data)) = (args.new_attributes.size, &mut node.kind) {
        data.resize(size as usize, 0);
    }
    node.ctime = ctime;

    Ok(SetAttr3ResOk {
        obj_wcc: WccData {
            before: None,
            after: state.attributes(id),
        },
    })
}

fn lookup(state: &mut State, args: Lookup3Args) -> LookupResult {
    let (dir, children) = tri!(state.children(&args.what.dir));
    let id = match args.what.name.as_str() {
        "." => dir,
        ".." => tri!(state.nodes.get(&dir).map(|node| node.parent).ok_or(NfsStat3::Stale)),
        name => *tri!(children.get(name).ok_or(NfsStat3::NoEnt)),
    };

    let res = Lookup3ResOk {
        object: id_to_fh(id),
        obj_attributes: state.attributes(id),
        dir_attributes: state.attributes(dir),
    };
    if state.bump_ctime_on_lookup {
        let ctime = state.tick();
        if let Some(node) = state.nodes.get_mut(&id) {
            node.ctime = ctime;
        }
    }
    Ok(res)
}

fn access(state: &mut State, args: Access3Args) -> AccessResult {
    let (id, _) = tri!(state.node(&args.object));
    Ok(Access3ResOk {
        obj_attributes: state.attributes(id),
        access: args.access & nfs3::ACCESS3_ALL,
    })
}

fn readlink(state: &mut State, args: ReadLink3Args) -> ReadLinkResult {
    match tri!(state.node(&args.symlink)) {
        (id, Node {
            kind: NodeKind::Symlink(target),
            ..
        }) => Ok(ReadLink3ResOk {
            symlink_attributes: state.attributes(id),
            data: target.clone(),
        }),
        _ => fail(NfsStat3::Inval),
    }
}

fn read(state: &mut State, args: Read3Args) -> ReadResult {
    let (id, node) = tri!(state.node(&args.file));
    let data = match &node.kind {
        NodeKind::File(data) => data,
        NodeKind::Dir(_) => return fail(NfsStat3::IsDir),
        NodeKind::Symlink(_) => return fail(NfsStat3::Inval),
    };

    let start = (args.offset as usize).min(data.len());
    let end = (start + args.count as usize).min(data.len());
    let chunk = Bytes::copy_from_slice(&data[start..end]);
    Ok(Read3ResOk {
        file_attributes: state.attributes(id),
        count: chunk.len() as u32,
        eof: end == data.len(),
        data: chunk,
    })
}

fn write(state: &mut State, args: Write3Args) -> WriteResult {
    let accept = match state.short_write {
        Some(max) => args.data.len().min(max as usize),
        None => args.data.len(),
    };
    let (id, _) = tri!(state.node(&args.file));
    let ctime = state.tick();
    let node = tri!(state.nodes.get_mut(&id).ok_or(NfsStat3::Stale));
    let data = match &mut node.kind {
        NodeKind::File(data) => data,
        NodeKind::Dir(_) => return fail(NfsStat3::IsDir),
        NodeKind::Symlink(_) => return fail(NfsStat3::Inval),
    };

    let start = args.offset as usize;
    if data.len() < start + accept {
        data.resize(start + accept, 0);
    }
    data[start..start + accept].copy_from_slice(&args.data[..accept]);
    node.ctime = ctime;

    Ok(Write3ResOk {
        file_wcc: WccData::default(),
        count: accept as u32,
        committed: StableHow::Unstable,
        verifier: state.write_verifier,
    })
}

fn create(state: &mut State, args: Create3Args) -> CreateResult {
    let dir = &args.create_where.dir;
    let name = &args.create_where.name;
    let (_, children) = tri!(state.children(dir));
    let existing = children.get(name).copied();

    let id = match (args.how, existing) {
        (CreateHow3::Unchecked(attributes), Some(id)) => {
            let node = tri!(state.nodes.get_mut(&id).ok_or(NfsStat3::Stale));
            match (&mut node.kind, attributes.size) {
                (NodeKind::File(data), Some(size)) => data.resize(size as usize, 0),
                (NodeKind::File(_), None) => {}
                _ => return fail(NfsStat3::Exist),
            }
            if let Some(mode) = attributes.mode {
                node.mode = mode;
            }
            id
        }
        (CreateHow3::Unchecked(attributes) | CreateHow3::Guarded(attributes), None) => {
            let mode = attributes.mode.unwrap_or(0o644);
            tri!(state.insert(dir, name, NodeKind::File(Vec::new()), mode))
        }
        (CreateHow3::Exclusive(_), None) => {
            tri!(state.insert(dir, name, NodeKind::File(Vec::new()), 0o644))
        }
        (_, Some(_)) => return fail(NfsStat3::Exist),
    };

    Ok(Create3ResOk {
        obj: Some(id_to_fh(id)),
        attributes: state.attributes(id),
        wcc_data: WccData::default(),
    })
}

fn mkdir(state: &mut State, args: Mkdir3Args) -> MkdirResult {
    let mode = args.attributes.mode.unwrap_or(0o755);
    let id = tri!(state.insert(
        &args.mkdir_where.dir,
        &args.mkdir_where.name,
        NodeKind::Dir(BTreeMap::new()),
        mode
    ));

    Ok(Mkdir3ResOk {
        obj: Some(id_to_fh(id)),
        attributes: state.attributes(id),
        wcc_data: WccData::default(),
    })
}

fn symlink(state: &mut State, args: SymLink3Args) -> SymLinkResult {
    let mode = args.data.attributes.mode.unwrap_or(0o777);
    let id = tri!(state.insert(
        &args.symlink_where.dir,
        &args.symlink_where.name,
        NodeKind::Symlink(args.data.data),
        mode
    ));

    Ok(SymLink3ResOk {
        obj: Some(id_to_fh(id)),
        attributes: state.attributes(id),
        wcc_data: WccData::default(),
    })
}

/// Unlinks `name` from `dir` once `check` accepts the node
fn unlink(
    state: &mut State,
    what: &DirOpArgs3,
    check: impl Fn(&Node) -> Result<(), NfsStat3>,
) -> Result<(), NfsStat3> {
    let (_, children) = state.children(&what.dir)?;
    let id = *children.get(&what.name).ok_or(NfsStat3::NoEnt)?;
    check(state.nodes.get(&id).ok_or(NfsStat3::Stale)?)?;

    state.children_mut(&what.dir)?.remove(&what.name);
    state.nodes.remove(&id);
    Ok(())
}

fn remove(state: &mut State, args: Remove3Args) -> RemoveResult {
    tri!(unlink(state, &args.object, |node| match node.kind {
        NodeKind::Dir(_) => Err(NfsStat3::IsDir),
        _ => Ok(()),
    }));
    Ok(Remove3ResOk::default())
}

fn rmdir(state: &mut State, args: Rmdir3Args) -> RmdirResult {
    tri!(unlink(state, &args.object, |node| match &node.kind {
        NodeKind::Dir(children) if children.is_empty() => Ok(()),
        NodeKind::Dir(_) => Err(NfsStat3::NotEmpty),
        _ => Err(NfsStat3::NotDir),
    }));
    Ok(Rmdir3ResOk::default())
}

fn rename(state: &mut State, args: Rename3Args) -> RenameResult {
    let (_, children) = tri!(state.children(&args.from.dir));
    let id = *tri!(children.get(&args.from.name).ok_or(NfsStat3::NoEnt));
    let new_parent = tri!(fh_to_id(&args.to.dir));
    tri!(state.children(&args.to.dir));

    tri!(state.children_mut(&args.from.dir)).remove(&args.from.name);
    tri!(state.children_mut(&args.to.dir)).insert(args.to.name.clone(), id);
    if let Some(node) = state.nodes.get_mut(&id) {
        node.parent = new_parent;
    }
    Ok(Rename3ResOk::default())
}

const COOKIE_VERIFIER: u64 = 0xc00c_1e00;

fn readdirplus(state: &mut State, args: ReaddirPlus3Args) -> ReaddirPlusResult {
    let (dir, children) = tri!(state.children(&args.dir));
    if args.cookie != 0 && args.verifier != COOKIE_VERIFIER {
        return fail(NfsStat3::BadCookie);
    }
    if state.stall_readdir {
        return Ok(ReaddirPlus3ResOk {
            dir_attributes: state.attributes(dir),
            verifier: COOKIE_VERIFIER,
            reply: DirListPlus3 {
                entries: Vec::new(),
                eof: false,
            },
        });
    }

    let parent = state.nodes.get(&dir).map_or(dir, |node| node.parent);
    let mut listing: Vec<(String, u64)> = Vec::new();
    if state.list_dots {
        listing.push((".".to_string(), dir));
        listing.push(("..".to_string(), parent));
    }
    listing.extend(children.iter().map(|(name, id)| (name.clone(), *id)));

    // cookies are 1-based positions in the listing
    let start = args.cookie as usize;
    let end = (start + state.page_size).min(listing.len());
    let entries = listing[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, (name, id))| EntryPlus3 {
            fileid: *id,
            name: name.clone(),
            cookie: (start + i + 1) as u64,
            name_attributes: state
                .plus_attributes
                .then(|| state.attributes(*id))
                .flatten(),
            name_handle: state.plus_attributes.then(|| id_to_fh(*id)),
        })
        .collect();

    Ok(ReaddirPlus3ResOk {
        dir_attributes: state.attributes(dir),
        verifier: COOKIE_VERIFIER,
        reply: DirListPlus3 {
            entries,
            eof: end == listing.len(),
        },
    })
}

fn fsstat(state: &mut State, args: Fsstat3Args) -> FsstatResult {
    let (id, _) = tri!(state.node(&args.root));
    Ok(Fsstat3ResOk {
        obj_attributes: state.attributes(id),
        tbytes: 1 << 30,
        fbytes: 1 << 29,
        abytes: 1 << 29,
        tfiles: 1 << 20,
        ffiles: (1 << 20) - state.nodes.len() as u64,
        afiles: (1 << 20) - state.nodes.len() as u64,
        invarsec: 0,
    })
}

fn fsinfo(state: &mut State, args: Fsinfo3Args) -> FsinfoResult {
    let (id, _) = tri!(state.node(&args.root));
    Ok(Fsinfo3ResOk {
        obj_attributes: state.attributes(id),
        rtmax: 1024 * 1024,
        rtpref: state.rtpref,
        rtmult: 4096,
        wtmax: 1024 * 1024,
        wtpref: state.wtpref,
        wtmult: 4096,
        dtpref: 8192,
        maxfilesize: u64::MAX,
        time_delta: NfsTime3 {
            seconds: 0,
            nano_seconds: 1,
        },
        properties: FSF3_LINK | FSF3_SYMLINK | FSF3_HOMOGENEOUS | FSF3_CANSETTIME,
    })
}

fn commit(state: &mut State, args: Commit3Args) -> CommitResult {
    tri!(state.node(&args.file));
    if state.restart_before_commit {
        state.write_verifier += 1;
    }
    Ok(Commit3ResOk {
        file_wcc: WccData::default(),
        verifier: state.write_verifier,
    })
}
