use std::ffi::CString;

use ipcqueue_core::Timeout;
use tracing::{debug, trace};

use crate::error::{PosixMqError, PosixMqErrorKind, PosixMqOp, Result};

/// Permission bits for queues created by [`open`].
pub const QUEUE_MODE: libc::mode_t = 0o644;

/// An open POSIX message queue descriptor.
///
/// Plain handle: copying it does not duplicate the kernel descriptor, and
/// nothing closes it implicitly. After [`close`] every operation on it fails
/// with [`PosixMqErrorKind::Descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MqDescriptor(libc::mqd_t);

impl MqDescriptor {
    /// Wrap a descriptor obtained elsewhere.
    pub fn from_raw(raw: libc::mqd_t) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> libc::mqd_t {
        self.0
    }
}

/// Queue counters as reported by `mq_getattr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixMqAttributes {
    /// Messages currently queued.
    pub current_messages: usize,
    /// Capacity in messages.
    pub max_messages: usize,
    /// Largest message the queue accepts, in bytes.
    pub max_msg_size: usize,
}

/// Create the queue `name` if absent and open it for sending and receiving.
///
/// The capacities only apply when the queue is created; an existing queue
/// keeps its own.
pub fn open(name: &str, max_msg_size: usize, max_messages: usize) -> Result<MqDescriptor> {
    let op = PosixMqOp::Open;
    let c_name = name_to_cstring(op, name)?;

    // SAFETY: `mq_attr` is plain old data; zero is valid for every field.
    let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
    attr.mq_maxmsg = max_messages
        .try_into()
        .map_err(|_| PosixMqError::rejected(op, PosixMqErrorKind::Value, libc::EINVAL))?;
    attr.mq_msgsize = max_msg_size
        .try_into()
        .map_err(|_| PosixMqError::rejected(op, PosixMqErrorKind::Value, libc::EINVAL))?;

    // SAFETY: `c_name` is NUL-terminated and `attr` outlives the call. The
    // mode is passed as `c_uint` because mq_open is variadic.
    let raw = unsafe {
        libc::mq_open(
            c_name.as_ptr(),
            libc::O_CREAT | libc::O_RDWR,
            QUEUE_MODE as libc::c_uint,
            &mut attr as *mut libc::mq_attr,
        )
    };
    if raw == -1 {
        return Err(PosixMqError::last_os_error(op));
    }

    debug!(name, mqd = raw, max_msg_size, max_messages, "opened posix message queue");
    Ok(MqDescriptor(raw))
}

/// Release this process's descriptor. The queue itself stays until unlinked.
pub fn close(mqd: MqDescriptor) -> Result<()> {
    // SAFETY: mq_close only inspects the integer; invalid values yield EBADF.
    if unsafe { libc::mq_close(mqd.0) } == -1 {
        return Err(PosixMqError::last_os_error(PosixMqOp::Close));
    }
    debug!(mqd = mqd.0, "closed posix message queue");
    Ok(())
}

/// Remove `name` from the namespace. Open descriptors stay usable until closed.
pub fn unlink(name: &str) -> Result<()> {
    let op = PosixMqOp::Unlink;
    let c_name = name_to_cstring(op, name)?;

    // SAFETY: `c_name` is a valid NUL-terminated string.
    if unsafe { libc::mq_unlink(c_name.as_ptr()) } == -1 {
        return Err(PosixMqError::last_os_error(op));
    }
    debug!(name, "unlinked posix message queue");
    Ok(())
}

/// Send `payload` with `priority`, waiting at most `timeout` seconds.
///
/// `timeout` is `f64::INFINITY` to block until there is room; any finite
/// non-negative value, zero included, becomes an absolute deadline.
pub fn put(mqd: MqDescriptor, payload: &[u8], priority: u32, timeout: f64) -> Result<()> {
    let timeout = parse_timeout(PosixMqOp::Put, timeout)?;
    put_timeout(mqd, payload, priority, timeout)
}

/// [`put`] with an already parsed timeout.
pub fn put_timeout(
    mqd: MqDescriptor,
    payload: &[u8],
    priority: u32,
    timeout: Timeout,
) -> Result<()> {
    let ptr = payload.as_ptr().cast::<libc::c_char>();

    // SAFETY: `ptr` is valid for `payload.len()` bytes for the whole call and
    // the kernel only reads from it.
    let rc = match timeout.deadline() {
        None => unsafe { libc::mq_send(mqd.0, ptr, payload.len(), priority) },
        Some(deadline) => {
            let ts = deadline.as_timespec();
            unsafe { libc::mq_timedsend(mqd.0, ptr, payload.len(), priority, &ts) }
        }
    };
    if rc == -1 {
        return Err(PosixMqError::last_os_error(PosixMqOp::Put));
    }

    trace!(mqd = mqd.0, len = payload.len(), priority, "sent message");
    Ok(())
}

/// Receive one message into a fresh buffer of `capacity` bytes.
///
/// `capacity` must be at least the queue's maximum message size, otherwise
/// the call fails with [`PosixMqErrorKind::Size`]. Timeout semantics match
/// [`put`]. Returns the payload and its priority.
pub fn get(mqd: MqDescriptor, capacity: usize, timeout: f64) -> Result<(Vec<u8>, u32)> {
    let timeout = parse_timeout(PosixMqOp::Get, timeout)?;
    get_timeout(mqd, capacity, timeout)
}

/// [`get`] with an already parsed timeout.
pub fn get_timeout(mqd: MqDescriptor, capacity: usize, timeout: Timeout) -> Result<(Vec<u8>, u32)> {
    let mut buffer = vec![0u8; capacity];
    let (len, priority) = get_into(mqd, &mut buffer, timeout)?;
    buffer.truncate(len);
    Ok((buffer, priority))
}

/// Receive one message into a caller-owned buffer.
///
/// Returns the number of bytes written and the message priority. The buffer
/// is not referenced after the call returns.
pub fn get_into(mqd: MqDescriptor, buffer: &mut [u8], timeout: Timeout) -> Result<(usize, u32)> {
    let ptr = buffer.as_mut_ptr().cast::<libc::c_char>();
    let mut priority: libc::c_uint = 0;

    // SAFETY: `ptr` is valid for writes of `buffer.len()` bytes and
    // `priority` is a valid out-pointer for the duration of the call.
    let received = match timeout.deadline() {
        None => unsafe { libc::mq_receive(mqd.0, ptr, buffer.len(), &mut priority) },
        Some(deadline) => {
            let ts = deadline.as_timespec();
            unsafe { libc::mq_timedreceive(mqd.0, ptr, buffer.len(), &mut priority, &ts) }
        }
    };
    if received < 0 {
        return Err(PosixMqError::last_os_error(PosixMqOp::Get));
    }

    let len = received as usize;
    trace!(mqd = mqd.0, len, priority, "received message");
    Ok((len, priority))
}

/// Current message count and capacities of the queue.
pub fn get_attributes(mqd: MqDescriptor) -> Result<PosixMqAttributes> {
    // SAFETY: `mq_attr` is plain old data; zero is valid for every field.
    let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };

    // SAFETY: `attr` is a valid out-pointer for the duration of the call.
    if unsafe { libc::mq_getattr(mqd.0, &mut attr) } == -1 {
        return Err(PosixMqError::last_os_error(PosixMqOp::GetAttributes));
    }

    Ok(PosixMqAttributes {
        current_messages: usize::try_from(attr.mq_curmsgs).unwrap_or(0),
        max_messages: usize::try_from(attr.mq_maxmsg).unwrap_or(0),
        max_msg_size: usize::try_from(attr.mq_msgsize).unwrap_or(0),
    })
}

fn name_to_cstring(op: PosixMqOp, name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| PosixMqError::rejected(op, PosixMqErrorKind::Value, libc::EINVAL))
}

fn parse_timeout(op: PosixMqOp, timeout: f64) -> Result<Timeout> {
    Timeout::from_secs_f64(timeout)
        .ok_or_else(|| PosixMqError::rejected(op, PosixMqErrorKind::Value, libc::EINVAL))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_name(tag: &str) -> String {
        format!("/ipcqueue-mq-{tag}-{}", std::process::id())
    }

    #[test]
    fn rejects_interior_nul() {
        let err = open("/bad\0name", 128, 4).unwrap_err();
        assert_eq!(err.kind(), PosixMqErrorKind::Value);
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn rejects_negative_timeout_before_sending() {
        let err = put(MqDescriptor::from_raw(-1), b"x", 0, -1.0).unwrap_err();
        assert_eq!(err.kind(), PosixMqErrorKind::Value);
        let err = get(MqDescriptor::from_raw(-1), 16, f64::NAN).unwrap_err();
        assert_eq!(err.kind(), PosixMqErrorKind::Value);
    }

    #[test]
    fn invalid_descriptor() {
        let mqd = MqDescriptor::from_raw(-1);
        assert_eq!(
            get_attributes(mqd).unwrap_err().kind(),
            PosixMqErrorKind::Descriptor
        );
        assert_eq!(close(mqd).unwrap_err().kind(), PosixMqErrorKind::Descriptor);
    }

    #[test]
    fn open_reports_attributes() {
        let name = queue_name("attrs");
        let _ = unlink(&name);
        let mqd = open(&name, 256, 4).unwrap();

        let attrs = get_attributes(mqd).unwrap();
        assert_eq!(
            attrs,
            PosixMqAttributes {
                current_messages: 0,
                max_messages: 4,
                max_msg_size: 256,
            }
        );

        close(mqd).unwrap();
        unlink(&name).unwrap();
    }

    #[test]
    fn get_into_caller_buffer() {
        let name = queue_name("into");
        let _ = unlink(&name);
        let mqd = open(&name, 64, 2).unwrap();

        put(mqd, b"abc", 9, f64::INFINITY).unwrap();
        let mut buffer = [0u8; 64];
        let (len, priority) = get_into(mqd, &mut buffer, Timeout::NON_BLOCKING).unwrap();
        assert_eq!(&buffer[..len], b"abc");
        assert_eq!(priority, 9);

        close(mqd).unwrap();
        unlink(&name).unwrap();
    }
}
