//! ONC RPC v2 (RFC 5531) client transport.
//!
//! Calls are multiplexed over a single stream by transaction id: a
//! background task reads reply records and hands each one to the caller
//! waiting on the matching xid.  Any transport failure (I/O error, closed
//! stream, oversized record, timeout, a call record left half written)
//! poisons the client.  Calls in flight at that moment fail with the cause;
//! the stream state is unknown from then on, so every later call fails with
//! [`RpcError::ConnectionBroken`] and the caller has to reconnect.
use crate::{
    result::{Error, Result, RpcError},
    xdr::{self, PackTo, Packer as _, UnpackFrom, Unpacker as _},
};
use bytes::{Buf, Bytes, BytesMut};
use nfs3_client_macros::{PackTo, UnpackFrom};
use std::borrow::BorrowMut;
use std::collections::BTreeMap;
use std::io;
use std::sync::{
    atomic::{self, AtomicU32},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Default cap on a reassembled reply record
pub const MAX_PACKET_SIZE: u32 = 4 * 1024 * 1024;

// RFC5531  RPC v2

const RPC_VERSION: u32 = 2;
const LAST_FRAGMENT: u32 = 0x80000000;
pub const CALL: u32 = 0;
pub const REPLY: u32 = 1;

pub const AUTH_NONE: u32 = 0;
pub const AUTH_SYS: u32 = 1;

/// Largest credential or verifier body allowed by RFC 5531
pub const MAX_AUTH_BYTES: u32 = 400;
/// AUTH_SYS limits on machine name and supplementary groups
pub const MAX_MACHINE_NAME: usize = 255;
pub const MAX_GIDS: usize = 16;

/// AUTH_SYS (historically AUTH_UNIX) credential body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSys {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}

impl AuthSys {
    /// Builds a credential, truncating the machine name and group list to
    /// the protocol limits.
    pub fn new(
        stamp: u32,
        machine_name: impl Into<String>,
        uid: u32,
        gid: u32,
        mut gids: Vec<u32>,
    ) -> AuthSys {
        let mut machine_name = machine_name.into();
        if machine_name.len() > MAX_MACHINE_NAME {
            let mut end = MAX_MACHINE_NAME;
            while !machine_name.is_char_boundary(end) {
                end -= 1;
            }
            warn!("machine name truncated to {} bytes", end);
            machine_name.truncate(end);
        }
        if gids.len() > MAX_GIDS {
            warn!("AUTH_SYS carries at most {} groups, dropping {}", MAX_GIDS, gids.len() - MAX_GIDS);
            gids.truncate(MAX_GIDS);
        }

        AuthSys {
            stamp,
            machine_name,
            uid,
            gid,
            gids,
        }
    }

    /// Builds a credential whose stamp is drawn from `rng`
    pub fn with_rng<R: rand::Rng + ?Sized>(
        rng: &mut R,
        machine_name: impl Into<String>,
        uid: u32,
        gid: u32,
        gids: Vec<u32>,
    ) -> AuthSys {
        AuthSys::new(rng.gen(), machine_name, uid, gid, gids)
    }
}

/// RFC5531 opaque_auth
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpaqueAuth {
    None,
    Sys(AuthSys),
    /// A flavor this client does not interpret, e.g. a server's AUTH_SHORT
    /// verifier
    Other { flavor: u32, body: Bytes },
}

impl<B: Packer> xdr::PackTo<B> for OpaqueAuth {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_auth(self);
    }
}

impl<B: Unpacker> xdr::UnpackFrom<B> for OpaqueAuth {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        buf.unpack_auth()
    }
}

impl OpaqueAuth {
    pub fn new_none() -> OpaqueAuth {
        OpaqueAuth::None
    }

    pub fn new_sys(
        stamp: u32,
        machine_name: impl Into<String>,
        uid: u32,
        gid: u32,
        gids: Vec<u32>,
    ) -> OpaqueAuth {
        OpaqueAuth::Sys(AuthSys::new(stamp, machine_name, uid, gid, gids))
    }

    /// Returns the RPC flavor number
    pub fn flavor(&self) -> u32 {
        match self {
            OpaqueAuth::None => AUTH_NONE,
            OpaqueAuth::Sys(_) => AUTH_SYS,
            OpaqueAuth::Other { flavor, .. } => *flavor,
        }
    }
}

/// Corresponds to RFC5531 call_body.
#[derive(Debug, Clone)]
pub struct CallHeader {
    // rpcvers is hardcoded 2
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}

impl<B: Packer> xdr::PackTo<B> for CallHeader {
    #[inline]
    fn pack_to(&self, buf: &mut B) {
        buf.pack_call_header(self);
    }
}

/// Corresponds to RFC5531 reply_body
#[derive(UnpackFrom, PackTo, Debug)]
pub enum ReplyHeader {
    Accepted(AcceptedReply),
    Denied(RejectedReply),
}

#[derive(UnpackFrom, PackTo, Debug)]
pub struct AcceptedReply {
    pub verf: OpaqueAuth,
    pub stat: AcceptedReplyStat,
}

#[derive(UnpackFrom, PackTo, Debug)]
pub enum AcceptedReplyStat {
    Success,
    ProgUnavail,
    ProgMismatch(MismatchInfo),
    ProcUnavail,
    GarbageArgs,
    SystemErr,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy)]
pub struct MismatchInfo {
    pub low: u32,
    pub high: u32,
}

#[derive(PackTo, UnpackFrom, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStat {
    Ok,
    BadCred,
    RejectedCred,
    BadVerf,
    RejectedVerf,
    TooWeak,
    InvalidResp,
    Failed,
    KerbGeneric,
    TimeExpire,
    TktFile,
    Decode,
    NetAddr,
    CredProblem,
    CtxProblem,
}

#[derive(PackTo, UnpackFrom, Debug)]
pub enum RejectedReply {
    RpcMismatch(MismatchInfo),
    AuthError(AuthStat),
}

impl ReplyHeader {
    /// Converts a non-success reply into the matching [`RpcError`]
    pub fn into_result(self) -> std::result::Result<(), RpcError> {
        match self {
            ReplyHeader::Accepted(AcceptedReply { stat, .. }) => match stat {
                AcceptedReplyStat::Success => Ok(()),
                AcceptedReplyStat::ProgUnavail => Err(RpcError::ProgUnavail),
                AcceptedReplyStat::ProgMismatch(MismatchInfo { low, high }) => {
                    Err(RpcError::ProgMismatch { low, high })
                }
                AcceptedReplyStat::ProcUnavail => Err(RpcError::ProcUnavail),
                AcceptedReplyStat::GarbageArgs => Err(RpcError::GarbageArgs),
                AcceptedReplyStat::SystemErr => Err(RpcError::SystemErr),
            },

            ReplyHeader::Denied(denied) => match denied {
                RejectedReply::RpcMismatch(MismatchInfo { low, high }) => {
                    Err(RpcError::RpcMismatch { low, high })
                }
                RejectedReply::AuthError(stat) => Err(RpcError::AuthError(stat)),
            },
        }
    }
}

/// Reads an RPC record from `stream`, potentially comprised of
/// multiple fragments, appending it to `buf`.  Allows at most
/// `max_size` bytes in total.
pub async fn read_packet<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut BytesMut,
    max_size: u32,
) -> Result<()> {
    let mut record_mark_buf: [u8; 4] = [0; 4];
    let mut read_last = false;
    let mut len: u64 = 0;
    while !read_last {
        stream.read_exact(&mut record_mark_buf).await?;
        let record_mark = u32::from_be_bytes(record_mark_buf);
        read_last = (record_mark & LAST_FRAGMENT) != 0;

        let fragment_size = record_mark & !LAST_FRAGMENT;
        trace!("reading fragment length:{}, last:{}", fragment_size, read_last);
        len += fragment_size as u64;
        if len > max_size as u64 {
            return Err(RpcError::RecordTooLarge {
                size: len,
                max: max_size,
            }
            .into());
        }

        let start = buf.len();
        buf.resize(start + fragment_size as usize, 0);
        stream.read_exact(&mut buf[start..]).await?;
    }

    Ok(())
}

/// Trait for packing RPC header
pub trait Packer {
    fn pack_call_header(&mut self, header: &CallHeader);
    fn pack_auth(&mut self, auth: &OpaqueAuth);
    fn pack_auth_sys(&mut self, auth: &AuthSys);
}

/// Trait for unpacking RPC header
pub trait Unpacker {
    fn unpack_auth(&mut self) -> Result<OpaqueAuth>;
    fn unpack_auth_sys(&mut self) -> Result<AuthSys>;
}

impl<T: xdr::Packer> Packer for T {
    fn pack_call_header(&mut self, header: &CallHeader) {
        self.pack_uint(CALL);
        self.pack_uint(RPC_VERSION);
        self.pack_uint(header.prog);
        self.pack_uint(header.vers);
        self.pack_uint(header.proc);
        self.pack_auth(&header.cred);
        self.pack_auth(&header.verf);
    }

    fn pack_auth(&mut self, auth: &OpaqueAuth) {
        match auth {
            OpaqueAuth::None => {
                self.pack_uint(AUTH_NONE);
                self.pack_uint(0)
            }
            OpaqueAuth::Sys(auth_sys) => {
                self.pack_uint(AUTH_SYS);
                self.pack_auth_sys(auth_sys)
            }
            OpaqueAuth::Other { flavor, body } => {
                self.pack_uint(*flavor);
                self.pack_opaque(body);
            }
        }
    }

    fn pack_auth_sys(&mut self, auth: &AuthSys) {
        let mut body = BytesMut::new();
        body.pack_uint(auth.stamp);
        body.pack_string(&auth.machine_name);
        body.pack_uint(auth.uid);
        body.pack_uint(auth.gid);
        body.pack_array(&auth.gids, |packer, item| packer.pack_uint(*item));
        self.pack_opaque(&body);
    }
}

impl<T: xdr::Unpacker> Unpacker for T {
    fn unpack_auth(&mut self) -> Result<OpaqueAuth> {
        let flavor = self.unpack_uint()?;
        match flavor {
            AUTH_NONE => {
                // opaque and undefined, "recommended" to be empty
                self.unpack_opaque_max(MAX_AUTH_BYTES)?;
                Ok(OpaqueAuth::None)
            }
            AUTH_SYS => Ok(OpaqueAuth::Sys(self.unpack_auth_sys()?)),
            _ => Ok(OpaqueAuth::Other {
                flavor,
                body: self.unpack_opaque_max(MAX_AUTH_BYTES)?,
            }),
        }
    }

    fn unpack_auth_sys(&mut self) -> Result<AuthSys> {
        let mut opaque: Bytes = self.unpack_opaque_max(MAX_AUTH_BYTES)?;
        let stamp = opaque.unpack_uint()?;
        let machine_name = opaque.unpack_opaque_max(MAX_MACHINE_NAME as u32)?;
        Ok(AuthSys {
            stamp,
            machine_name: xdr::string_from_bytes(machine_name.to_vec())?,
            uid: opaque.unpack_uint()?,
            gid: opaque.unpack_uint()?,
            gids: opaque.unpack_vec(|unpacker| unpacker.unpack_uint())?,
        })
    }
}

/// Tunables of an [`RpcClient`]
#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// Bound on the wait for each reply, `None` waits forever
    pub timeout: Option<Duration>,
    /// Largest reply record accepted from the server
    pub max_record_size: u32,
    /// First transaction id handed out
    pub xid_seed: u32,
}

impl Default for RpcOptions {
    fn default() -> Self {
        RpcOptions {
            timeout: Some(Duration::from_secs(60)),
            max_record_size: MAX_PACKET_SIZE,
            xid_seed: 0x58494430,
        }
    }
}

/// Calls waiting for a reply, keyed by xid
#[derive(Default)]
struct PendingCalls {
    calls: BTreeMap<u32, oneshot::Sender<Bytes>>,
    /// Set once by the first transport failure
    broken: Option<RpcError>,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<PendingCalls>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PendingCalls> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, xid: u32, tx: oneshot::Sender<Bytes>) -> Result<()> {
        let mut pending = self.lock();
        if pending.broken.is_some() {
            return Err(RpcError::ConnectionBroken.into());
        }
        pending.calls.insert(xid, tx);
        Ok(())
    }

    fn take(&self, xid: u32) -> Option<oneshot::Sender<Bytes>> {
        self.lock().calls.remove(&xid)
    }

    fn is_broken(&self) -> bool {
        self.lock().broken.is_some()
    }

    /// Marks the connection unusable and wakes every waiting caller.  The
    /// first cause recorded is the one reported to them.
    fn poison(&self, cause: RpcError) {
        let mut pending = self.lock();
        if pending.broken.is_none() {
            pending.broken = Some(cause);
        }
        // dropping the senders fails the waiting receivers
        pending.calls.clear();
    }

    /// The failure that broke the connection, for a caller whose reply
    /// sender was dropped
    fn failure(&self) -> RpcError {
        match &self.lock().broken {
            Some(cause) => copy_cause(cause),
            None => RpcError::ConnectionClosed,
        }
    }
}

/// Transport failures are shared by every caller on the connection, so the
/// recorded one is handed out as a copy
fn copy_cause(cause: &RpcError) -> RpcError {
    match cause {
        RpcError::Timeout => RpcError::Timeout,
        RpcError::ConnectionBroken => RpcError::ConnectionBroken,
        RpcError::RecordTooLarge { size, max } => RpcError::RecordTooLarge {
            size: *size,
            max: *max,
        },
        RpcError::Io(err) => RpcError::Io(io::Error::new(err.kind(), err.to_string())),
        _ => RpcError::ConnectionClosed,
    }
}

/// Maps the error that stopped the receiver to the cause reported to callers
fn receiver_cause(err: Error) -> RpcError {
    match err {
        Error::Rpc(RpcError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
            RpcError::ConnectionClosed
        }
        Error::Rpc(err) => err,
        _ => RpcError::ConnectionClosed,
    }
}

/// Poisons the connection if dropped before [`UnfinishedSend::done`]: a
/// record abandoned part way leaves the stream out of sync
struct UnfinishedSend<'a> {
    shared: Option<&'a Shared>,
}

impl<'a> UnfinishedSend<'a> {
    fn new(shared: &'a Shared) -> Self {
        UnfinishedSend {
            shared: Some(shared),
        }
    }

    fn done(mut self) {
        self.shared = None;
    }
}

impl Drop for UnfinishedSend<'_> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared {
            warn!("call record only partially sent, dropping connection");
            shared.poison(RpcError::ConnectionBroken);
        }
    }
}

struct RpcClientReceiver<R> {
    connection: R,
    shared: Arc<Shared>,
    max_size: u32,
}

impl<R: AsyncRead + Unpin> RpcClientReceiver<R> {
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let mut buf = BytesMut::new();
            read_packet(&mut self.connection, &mut buf, self.max_size).await?;
            let mut buf = buf.freeze();
            if buf.remaining() < 8 {
                warn!("bad packet -- too short ({} bytes)", buf.remaining());
                continue;
            }

            let xid = buf.unpack_uint()?;
            let msg_type = buf.unpack_uint()?;
            match msg_type {
                REPLY => match self.shared.take(xid) {
                    None => warn!("unmatched xid {:#x}", xid),
                    Some(tx) => {
                        // the caller may have given up waiting
                        let _ = tx.send(buf);
                    }
                },
                CALL => debug!("ignoring callback call xid {:#x}", xid),
                _ => warn!("corrupt packet msg_type={}", msg_type),
            }
        }
    }
}

/// An RPC client over one established stream.  All methods take `&self`;
/// concurrent callers each get the reply matching their own xid.
pub struct RpcClient {
    connection: tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    shared: Arc<Shared>,
    xid: AtomicU32,
    timeout: Option<Duration>,
    receiver: JoinHandle<()>,
}

impl RpcClient {
    /// Wraps an established stream using default options.  Must be called
    /// from within a tokio runtime.
    pub fn new<S>(connection: S) -> RpcClient
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        RpcClient::with_options(connection, RpcOptions::default())
    }

    pub fn with_options<S>(connection: S, options: RpcOptions) -> RpcClient
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read, write) = tokio::io::split(connection);
        let shared = Arc::new(Shared::default());

        let mut reader = RpcClientReceiver {
            connection: read,
            shared: shared.clone(),
            max_size: options.max_record_size,
        };

        let receiver = tokio::spawn(async move {
            let cause = match reader.run().await {
                Ok(()) => RpcError::ConnectionClosed,
                Err(err) => {
                    debug!("RPC receiver stopped: {}", err);
                    receiver_cause(err)
                }
            };
            reader.shared.poison(cause);
        });

        RpcClient {
            connection: tokio::sync::Mutex::new(Box::new(write)),
            shared,
            xid: AtomicU32::new(options.xid_seed),
            timeout: options.timeout,
            receiver,
        }
    }

    /// Returns a new xid (RPC transaction ID).
    ///
    /// According to the RFC:
    /// "The "xid" field is only used for clients matching reply
    /// messages with call messages or for servers detecting
    /// retransmissions; the service side cannot treat this id as any
    /// type of sequence number."
    pub fn next_xid(&self) -> u32 {
        self.xid.fetch_add(1, atomic::Ordering::Relaxed)
    }

    /// Whether an earlier transport failure made this client unusable
    pub fn is_broken(&self) -> bool {
        self.shared.is_broken()
    }

    /// Sends a finalized call record and waits for the reply with `xid`.
    /// Returns the reply with xid and message type already consumed.
    ///
    /// The configured timeout covers sending as well as waiting.  A call
    /// that fails on the transport, or is dropped before its record is
    /// fully written, poisons the client.
    pub async fn call(&self, buf: Bytes, xid: u32) -> Result<Bytes> {
        let (tx, rx) = oneshot::channel();
        self.shared.register(xid, tx)?;

        let exchange = async {
            self.send(buf).await?;
            rx.await.map_err(|_| Error::from(self.shared.failure()))
        };

        match self.timeout {
            None => exchange.await,
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(reply) => reply,
                Err(_) => {
                    warn!("no reply for xid {:#x} after {:?}", xid, limit);
                    self.shared.take(xid);
                    self.shared.poison(RpcError::Timeout);
                    Err(RpcError::Timeout.into())
                }
            },
        }
    }

    async fn send(&self, mut buf: impl Buf) -> Result<()> {
        let mut connection = self.connection.lock().await;
        let unfinished = UnfinishedSend::new(&self.shared);

        let written = async {
            while buf.has_remaining() {
                if connection.write_buf(&mut buf).await? == 0 {
                    return Err(io::Error::from(io::ErrorKind::WriteZero));
                }
            }
            connection.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                unfinished.done();
                Ok(())
            }
            Err(err) => {
                unfinished.done();
                let cause = RpcError::Io(err);
                self.shared.poison(copy_cause(&cause));
                Err(cause.into())
            }
        }
    }

    /// Validates the reply header, leaving `buf` at the procedure results
    pub fn check_header<B: Buf>(buf: &mut B) -> Result<()> {
        let header = ReplyHeader::unpack_from(buf)?;
        header.into_result().map_err(Error::from)
    }

    /// Issues one call and returns the undecoded procedure results, i.e.
    /// the program's status word and whatever follows it.
    pub async fn invoke<A>(&self, header: &CallHeader, args: &A) -> Result<Bytes>
    where
        A: PackTo<BytesMut> + ?Sized,
    {
        if self.is_broken() {
            return Err(RpcError::ConnectionBroken.into());
        }

        let xid = self.next_xid();
        let mut buf = new_buf_with_call_header(xid, header);
        args.pack_to(&mut buf);
        let buf = finalize(buf);
        trace!(
            "call xid={:#x} prog={} vers={} proc={} len={}",
            xid,
            header.prog,
            header.vers,
            header.proc,
            buf.len()
        );

        let mut response_buf = self.call(buf, xid).await?;
        Self::check_header(&mut response_buf)?;
        Ok(response_buf)
    }

    /// Calls procedure 0, which every RPC program implements as a no-op
    pub async fn null(&self, prog: u32, vers: u32) -> Result<()> {
        let header = CallHeader {
            prog,
            vers,
            proc: 0,
            cred: OpaqueAuth::None,
            verf: OpaqueAuth::None,
        };
        self.invoke(&header, &()).await?;
        Ok(())
    }

    /// Shuts down the write half and stops reading replies.  Calls still in
    /// flight fail with [`RpcError::ConnectionClosed`].
    pub async fn close(&self) -> Result<()> {
        self.shared.poison(RpcError::ConnectionClosed);
        let result = self.connection.lock().await.shutdown().await;
        self.receiver.abort();
        Ok(result?)
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

/// Constructs a new buffer with placeholder for the RPC frag marker,
/// followed by the xid and call header
fn new_buf_with_call_header(xid: u32, header: &CallHeader) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.pack_uint(0); // placeholder for frag
    buf.pack_uint(xid);
    header.pack_to(&mut buf);

    buf
}

/// Cosumes `buf` and updates frag size, returns frozen buffer
fn finalize(mut buf: BytesMut) -> Bytes {
    let frag_size = (buf.len() - 4) as u32;
    let frag_size = frag_size | LAST_FRAGMENT;
    {
        let borrow: &mut [u8] = buf.borrow_mut();
        (&mut borrow[0..4]).pack_uint(frag_size);
    }

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::XdrError;
    use tokio::io::DuplexStream;

    fn header(proc: u32) -> CallHeader {
        CallHeader {
            prog: 100003,
            vers: 3,
            proc,
            cred: OpaqueAuth::new_sys(7, "host", 1000, 100, vec![4, 24]),
            verf: OpaqueAuth::None,
        }
    }

    /// Reads one call record from the server side, returning xid and the
    /// rest of the record after the message type
    async fn read_call(server: &mut DuplexStream) -> (u32, Bytes) {
        let mut buf = BytesMut::new();
        read_packet(server, &mut buf, MAX_PACKET_SIZE).await.unwrap();
        let mut buf = buf.freeze();
        let xid = buf.unpack_uint().unwrap();
        assert_eq!(buf.unpack_uint().unwrap(), CALL);
        (xid, buf)
    }

    async fn write_reply(server: &mut DuplexStream, xid: u32, reply: ReplyHeader, body: &[u8]) {
        let mut buf = BytesMut::new();
        buf.pack_uint(0);
        buf.pack_uint(xid);
        buf.pack_uint(REPLY);
        reply.pack_to(&mut buf);
        buf.extend_from_slice(body);
        let buf = finalize(buf);
        server.write_all(&buf).await.unwrap();
    }

    fn success() -> ReplyHeader {
        ReplyHeader::Accepted(AcceptedReply {
            verf: OpaqueAuth::None,
            stat: AcceptedReplyStat::Success,
        })
    }

    #[test]
    fn auth_sys_body_length_matches_contents() {
        let mut buf = BytesMut::new();
        buf.pack_auth(&OpaqueAuth::new_sys(1, "abcde", 2, 3, vec![10, 11]));
        let mut buf = buf.freeze();
        assert_eq!(buf.unpack_uint().unwrap(), AUTH_SYS);
        // stamp + (len + 8 padded name) + uid + gid + (count + 2 gids)
        assert_eq!(buf.unpack_uint().unwrap(), 4 + 12 + 4 + 4 + 12);

        let mut buf = BytesMut::new();
        let auth = OpaqueAuth::new_sys(1, "abcde", 2, 3, vec![10, 11]);
        auth.pack_to(&mut buf);
        assert_eq!(OpaqueAuth::unpack_from(&mut buf.freeze()).unwrap(), auth);
    }

    #[test]
    fn auth_sys_limits_are_enforced() {
        let auth = AuthSys::new(0, "x".repeat(300), 0, 0, (0..20).collect());
        assert_eq!(auth.machine_name.len(), MAX_MACHINE_NAME);
        assert_eq!(auth.gids.len(), MAX_GIDS);
    }

    #[test]
    fn auth_stamp_comes_from_the_given_rng() {
        use rand::SeedableRng;
        let mut a = rand::rngs::StdRng::seed_from_u64(5);
        let mut b = rand::rngs::StdRng::seed_from_u64(5);
        let first = AuthSys::with_rng(&mut a, "m", 0, 0, Vec::new());
        let second = AuthSys::with_rng(&mut b, "m", 0, 0, Vec::new());
        assert_eq!(first.stamp, second.stamp);
    }

    #[test]
    fn call_header_layout() {
        let mut buf = new_buf_with_call_header(0x11223344, &header(6));
        ().pack_to(&mut buf);
        let mut buf = finalize(buf);
        let mark = buf.unpack_uint().unwrap();
        assert_eq!(mark & LAST_FRAGMENT, LAST_FRAGMENT);
        assert_eq!((mark & !LAST_FRAGMENT) as usize, buf.remaining());
        assert_eq!(buf.unpack_uint().unwrap(), 0x11223344);
        assert_eq!(buf.unpack_uint().unwrap(), CALL);
        assert_eq!(buf.unpack_uint().unwrap(), 2);
        assert_eq!(buf.unpack_uint().unwrap(), 100003);
        assert_eq!(buf.unpack_uint().unwrap(), 3);
        assert_eq!(buf.unpack_uint().unwrap(), 6);
    }

    #[test]
    fn reject_statuses_map_to_rpc_errors() {
        let denied = ReplyHeader::Denied(RejectedReply::AuthError(AuthStat::TooWeak));
        assert!(matches!(
            denied.into_result(),
            Err(RpcError::AuthError(AuthStat::TooWeak))
        ));

        let mismatch = ReplyHeader::Accepted(AcceptedReply {
            verf: OpaqueAuth::None,
            stat: AcceptedReplyStat::ProgMismatch(MismatchInfo { low: 2, high: 2 }),
        });
        assert!(matches!(
            mismatch.into_result(),
            Err(RpcError::ProgMismatch { low: 2, high: 2 })
        ));

        let mut bad: &[u8] = &[0, 0, 0, 2];
        assert!(matches!(
            RpcClient::check_header(&mut bad),
            Err(Error::Xdr(XdrError::InvalidDiscriminant { value: 2, .. }))
        ));
    }

    #[tokio::test]
    async fn invoke_returns_body_after_header() {
        let (client, mut server) = tokio::io::duplex(4096);
        let client = RpcClient::new(client);

        let server = tokio::spawn(async move {
            let (xid, mut args) = read_call(&mut server).await;
            assert_eq!(args.unpack_uint().unwrap(), 2);
            write_reply(&mut server, xid, success(), &[0, 0, 0, 0, 0, 0, 0, 9]).await;
            server
        });

        let mut body = client.invoke(&header(1), &42u32).await.unwrap();
        assert_eq!(body.unpack_uint().unwrap(), 0);
        assert_eq!(body.unpack_uint().unwrap(), 9);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn auth_rejection_is_an_rpc_error() {
        let (client, mut server) = tokio::io::duplex(4096);
        let client = RpcClient::new(client);

        tokio::spawn(async move {
            let (xid, _) = read_call(&mut server).await;
            let reply = ReplyHeader::Denied(RejectedReply::AuthError(AuthStat::BadCred));
            write_reply(&mut server, xid, reply, &[]).await;
            server
        });

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Rpc(RpcError::AuthError(AuthStat::BadCred))
        ));
        assert_eq!(err.nfs_status(), None);
    }

    #[tokio::test]
    async fn replies_are_matched_by_xid() {
        let (client, mut server) = tokio::io::duplex(4096);
        let client = Arc::new(RpcClient::new(client));

        tokio::spawn(async move {
            let (first, mut first_args) = read_call(&mut server).await;
            let (second, mut second_args) = read_call(&mut server).await;
            let first_arg = first_args.split_off(first_args.len() - 4);
            let second_arg = second_args.split_off(second_args.len() - 4);
            // answer in reverse order, echoing each call's argument
            write_reply(&mut server, second, success(), &second_arg).await;
            write_reply(&mut server, first, success(), &first_arg).await;
            server
        });

        let a = {
            let client = client.clone();
            tokio::spawn(async move { client.invoke(&header(1), &1u32).await })
        };
        let b = {
            let client = client.clone();
            tokio::spawn(async move { client.invoke(&header(1), &2u32).await })
        };

        assert_eq!(a.await.unwrap().unwrap().unpack_uint().unwrap(), 1);
        assert_eq!(b.await.unwrap().unwrap().unpack_uint().unwrap(), 2);
    }

    #[tokio::test]
    async fn oversized_record_poisons_client() {
        let (client, mut server) = tokio::io::duplex(4096);
        let options = RpcOptions {
            max_record_size: 64,
            ..Default::default()
        };
        let client = RpcClient::with_options(client, options);

        tokio::spawn(async move {
            let (_xid, _) = read_call(&mut server).await;
            server
                .write_all(&(LAST_FRAGMENT | 65).to_be_bytes())
                .await
                .unwrap();
            server
        });

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Rpc(RpcError::RecordTooLarge { size: 65, max: 64 })
        ));
        assert!(client.is_broken());

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(RpcError::ConnectionBroken)));
    }

    #[tokio::test]
    async fn peer_close_fails_pending_call() {
        let (client, mut server) = tokio::io::duplex(4096);
        let client = RpcClient::new(client);

        tokio::spawn(async move {
            read_call(&mut server).await;
            drop(server);
        });

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(RpcError::ConnectionClosed)));
        assert!(client.is_broken());
    }

    #[tokio::test]
    async fn abandoned_send_poisons_client() {
        // the server never reads, so a 4 KiB record cannot fit the pipe
        let (client, _server) = tokio::io::duplex(16);
        let client = RpcClient::new(client);
        let args = vec![0u8; 4096];

        let res = tokio::time::timeout(
            Duration::from_millis(50),
            client.invoke(&header(1), &args),
        )
        .await;
        assert!(res.is_err());
        assert!(client.is_broken());

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(RpcError::ConnectionBroken)));
    }

    #[tokio::test]
    async fn timeout_covers_a_stalled_send() {
        let (client, _server) = tokio::io::duplex(16);
        let options = RpcOptions {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let client = RpcClient::with_options(client, options);
        let args = vec![0u8; 4096];

        let err = client.invoke(&header(1), &args).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(RpcError::Timeout)));
        assert!(client.is_broken());
    }

    #[tokio::test]
    async fn timeout_poisons_client() {
        let (client, server) = tokio::io::duplex(4096);
        let options = RpcOptions {
            timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let client = RpcClient::with_options(client, options);

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(RpcError::Timeout)));
        assert!(err.is_transport());

        let err = client.invoke(&header(1), &()).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(RpcError::ConnectionBroken)));
        drop(server);
    }
}
