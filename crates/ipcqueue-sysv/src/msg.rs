use ipcqueue_core::{Message, Timeout};
use tracing::{debug, trace};

use crate::error::{Result, SysvMqError, SysvMqErrorKind, SysvMqOp};

/// Largest payload a single message can carry, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 8192;

/// Permission bits for queues created by [`open`].
pub const QUEUE_MODE: libc::c_int = 0o644;

/// Kernel message layout: the type followed by the text.
#[repr(C)]
struct MsgBuf {
    mtype: libc::c_long,
    mtext: [u8; MAX_MESSAGE_SIZE],
}

impl MsgBuf {
    fn new(mtype: libc::c_long) -> Self {
        Self {
            mtype,
            mtext: [0; MAX_MESSAGE_SIZE],
        }
    }
}

/// A System V message queue identifier.
///
/// Plain handle: the queue lives in the kernel until [`close`] removes it.
/// Once removed, every operation on the id fails with
/// [`SysvMqErrorKind::Descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsqId(libc::c_int);

impl MsqId {
    /// Wrap an identifier obtained elsewhere.
    pub fn from_raw(raw: libc::c_int) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> libc::c_int {
        self.0
    }
}

/// Queue counters as reported by `msgctl(IPC_STAT)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysvMqAttributes {
    /// Messages currently queued.
    pub current_messages: usize,
    /// Byte budget shared by all queued messages.
    pub max_bytes: usize,
}

/// Create or open the queue for `key`.
///
/// `key == 0` always creates a new private queue. Any other key in
/// `1..=u32::MAX` creates or opens the queue with that key, so keys from
/// `ftok` with the high bit set work too. Negative keys, and keys wider
/// than 32 bits, are rejected.
pub fn open(key: i64) -> Result<MsqId> {
    let ipc_key = match ipc_key(SysvMqOp::Open, key)? {
        0 => libc::IPC_PRIVATE,
        ipc_key => ipc_key,
    };
    msgget(key, ipc_key, QUEUE_MODE | libc::IPC_CREAT)
}

/// Open the existing queue for `key` without creating it.
///
/// A key with no queue behind it fails with [`SysvMqErrorKind::Descriptor`].
/// Private queues have no key to look up, so `key == 0` is a `Value` error.
pub fn attach(key: i64) -> Result<MsqId> {
    let op = SysvMqOp::Open;
    match ipc_key(op, key)? {
        0 => Err(SysvMqError::rejected(op, SysvMqErrorKind::Value, libc::EINVAL)),
        ipc_key => msgget(key, ipc_key, 0),
    }
}

fn ipc_key(op: SysvMqOp, key: i64) -> Result<libc::key_t> {
    let key = u32::try_from(key)
        .map_err(|_| SysvMqError::rejected(op, SysvMqErrorKind::Value, libc::EINVAL))?;
    // key_t is a signed 32-bit int; keys past i32::MAX keep their bit pattern.
    Ok(key as libc::key_t)
}

fn msgget(key: i64, ipc_key: libc::key_t, flags: libc::c_int) -> Result<MsqId> {
    // SAFETY: msgget takes only integers.
    let raw = unsafe { libc::msgget(ipc_key, flags) };
    if raw == -1 {
        return Err(SysvMqError::last_os_error(SysvMqOp::Open));
    }

    debug!(key, msqid = raw, ipc_creat = flags & libc::IPC_CREAT != 0, "opened sysv message queue");
    Ok(MsqId(raw))
}

/// Remove the queue system-wide. Blocked senders and receivers in any
/// process wake up with a `Descriptor` error.
pub fn close(msqid: MsqId) -> Result<()> {
    // SAFETY: IPC_RMID ignores the buffer argument.
    if unsafe { libc::msgctl(msqid.0, libc::IPC_RMID, std::ptr::null_mut()) } == -1 {
        return Err(SysvMqError::last_os_error(SysvMqOp::Close));
    }
    debug!(msqid = msqid.0, "removed sysv message queue");
    Ok(())
}

/// Send `payload` tagged with `msg_type`.
///
/// `timeout` is `0.0` to fail with `Full` instead of waiting, or
/// `f64::INFINITY` to wait for room. Any other value is a `Value` error.
pub fn put(msqid: MsqId, payload: &[u8], msg_type: i64, timeout: f64) -> Result<()> {
    let op = SysvMqOp::Put;
    let mtype = message_type(msg_type)?;
    check_payload(payload)?;
    let flags = wait_flags_secs(op, timeout)?;
    send(msqid, payload, mtype, flags)
}

/// [`put`] with an already parsed timeout.
pub fn put_timeout(msqid: MsqId, payload: &[u8], msg_type: i64, timeout: Timeout) -> Result<()> {
    let op = SysvMqOp::Put;
    let mtype = message_type(msg_type)?;
    check_payload(payload)?;
    let flags = wait_flags(op, timeout)?;
    send(msqid, payload, mtype, flags)
}

fn message_type(msg_type: i64) -> Result<libc::c_long> {
    match libc::c_long::try_from(msg_type) {
        Ok(mtype) if mtype >= 1 => Ok(mtype),
        _ => Err(SysvMqError::rejected(SysvMqOp::Put, SysvMqErrorKind::Value, libc::EINVAL)),
    }
}

fn check_payload(payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(SysvMqError::rejected(SysvMqOp::Put, SysvMqErrorKind::Size, libc::EMSGSIZE));
    }
    Ok(())
}

fn send(msqid: MsqId, payload: &[u8], mtype: libc::c_long, flags: libc::c_int) -> Result<()> {
    let mut buf = MsgBuf::new(mtype);
    buf.mtext[..payload.len()].copy_from_slice(payload);

    // SAFETY: `buf` is a `#[repr(C)]` type/text pair whose text holds at least
    // `payload.len()` bytes, and it outlives the call.
    let rc = unsafe {
        libc::msgsnd(
            msqid.0,
            (&buf as *const MsgBuf).cast::<libc::c_void>(),
            payload.len(),
            flags,
        )
    };
    if rc == -1 {
        return Err(transfer_error(msqid, SysvMqOp::Put));
    }

    trace!(msqid = msqid.0, len = payload.len(), msg_type = mtype, "sent message");
    Ok(())
}

/// Receive the oldest message matching `msg_type`, at most `capacity` bytes.
///
/// `msg_type == 0` takes the oldest message of any type and a positive value
/// takes the oldest message of exactly that type. Other values are passed to
/// the kernel unchanged. A message longer than `capacity` fails with `Size`
/// and stays queued. Timeout semantics match [`put`], with `Empty` in place
/// of `Full`.
pub fn get(msqid: MsqId, capacity: usize, msg_type: i64, timeout: f64) -> Result<Vec<u8>> {
    let op = SysvMqOp::Get;
    let msgtyp = selector(msg_type)?;
    let flags = wait_flags_secs(op, timeout)?;
    Ok(receive(msqid, capacity, msgtyp, flags)?.payload)
}

/// Like [`get`], also returning the type the message was sent with.
pub fn get_message(
    msqid: MsqId,
    capacity: usize,
    msg_type: i64,
    timeout: Timeout,
) -> Result<Message<i64>> {
    let msgtyp = selector(msg_type)?;
    let flags = wait_flags(SysvMqOp::Get, timeout)?;
    receive(msqid, capacity, msgtyp, flags)
}

fn selector(msg_type: i64) -> Result<libc::c_long> {
    libc::c_long::try_from(msg_type)
        .map_err(|_| SysvMqError::rejected(SysvMqOp::Get, SysvMqErrorKind::Value, libc::EINVAL))
}

fn receive(
    msqid: MsqId,
    capacity: usize,
    msgtyp: libc::c_long,
    flags: libc::c_int,
) -> Result<Message<i64>> {
    let capacity = capacity.min(MAX_MESSAGE_SIZE);
    let mut buf = MsgBuf::new(0);

    // SAFETY: `buf` has room for the type plus `capacity` bytes of text, and
    // without MSG_NOERROR the kernel never writes past `capacity`.
    let received = unsafe {
        libc::msgrcv(
            msqid.0,
            (&mut buf as *mut MsgBuf).cast::<libc::c_void>(),
            capacity,
            msgtyp,
            flags,
        )
    };
    if received < 0 {
        return Err(transfer_error(msqid, SysvMqOp::Get));
    }

    let len = received as usize;
    trace!(msqid = msqid.0, len, msg_type = buf.mtype, "received message");
    Ok(Message {
        payload: buf.mtext[..len].to_vec(),
        tag: i64::from(buf.mtype),
    })
}

/// Current message count and byte budget of the queue.
pub fn get_attributes(msqid: MsqId) -> Result<SysvMqAttributes> {
    let ds = stat(msqid, SysvMqOp::GetAttributes)?;
    Ok(SysvMqAttributes {
        current_messages: ds.msg_qnum as usize,
        max_bytes: ds.msg_qbytes as usize,
    })
}

/// Change the queue's byte budget.
///
/// Lowering it is always allowed for the owner; raising it past the system
/// default needs privilege and fails with `Permissions` otherwise.
pub fn set_max_bytes(msqid: MsqId, max_bytes: usize) -> Result<()> {
    let op = SysvMqOp::SetMaxBytes;
    let mut ds = stat(msqid, op)?;
    ds.msg_qbytes = max_bytes
        .try_into()
        .map_err(|_| SysvMqError::rejected(op, SysvMqErrorKind::Value, libc::EINVAL))?;

    // SAFETY: `ds` was filled by IPC_STAT and is a valid msqid_ds.
    if unsafe { libc::msgctl(msqid.0, libc::IPC_SET, &mut ds) } == -1 {
        return Err(SysvMqError::last_os_error(op));
    }

    debug!(msqid = msqid.0, max_bytes, "updated sysv queue byte limit");
    Ok(())
}

fn stat(msqid: MsqId, op: SysvMqOp) -> Result<libc::msqid_ds> {
    // SAFETY: `msqid_ds` is plain old data; zero is valid for every field.
    let mut ds: libc::msqid_ds = unsafe { std::mem::zeroed() };

    // SAFETY: `ds` is a valid out-pointer for the duration of the call.
    if unsafe { libc::msgctl(msqid.0, libc::IPC_STAT, &mut ds) } == -1 {
        return Err(SysvMqError::last_os_error(op));
    }
    Ok(ds)
}

/// Build the error for a failed msgsnd/msgrcv.
///
/// Arguments are validated up front, so an `EINVAL` from the kernel means
/// the id no longer names a queue unless the queue can still be stat'ed.
fn transfer_error(msqid: MsqId, op: SysvMqOp) -> SysvMqError {
    let err = SysvMqError::last_os_error(op);
    if err.raw_os_error() == Some(libc::EINVAL) && !queue_exists(msqid) {
        return err.with_kind(SysvMqErrorKind::Descriptor);
    }
    err
}

fn queue_exists(msqid: MsqId) -> bool {
    match stat(msqid, SysvMqOp::GetAttributes) {
        Ok(_) => true,
        Err(err) => err.kind() != SysvMqErrorKind::Descriptor,
    }
}

fn wait_flags(op: SysvMqOp, timeout: Timeout) -> Result<libc::c_int> {
    if timeout.is_forever() {
        Ok(0)
    } else if timeout.is_non_blocking() {
        Ok(libc::IPC_NOWAIT)
    } else {
        Err(SysvMqError::rejected(op, SysvMqErrorKind::Value, libc::EINVAL))
    }
}

/// Flags for a timeout given in seconds. Only exactly `0.0` and `+inf` are
/// accepted; the float is checked before any rounding to a `Duration`.
fn wait_flags_secs(op: SysvMqOp, timeout: f64) -> Result<libc::c_int> {
    if timeout == 0.0 {
        Ok(libc::IPC_NOWAIT)
    } else if timeout == f64::INFINITY {
        Ok(0)
    } else {
        Err(SysvMqError::rejected(op, SysvMqErrorKind::Value, libc::EINVAL))
    }
}
