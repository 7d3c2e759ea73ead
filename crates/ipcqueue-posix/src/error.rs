use std::fmt;
use std::io;

/// What went wrong, independent of the raw errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosixMqErrorKind {
    /// Access to the queue was denied.
    Permissions,
    /// An argument was rejected (name, capacities, priority, timeout).
    Value,
    /// Descriptor, memory or queue-space limits were hit.
    Resources,
    /// The descriptor is not an open queue.
    Descriptor,
    /// A blocked call was interrupted by a signal handler.
    Signal,
    /// The message exceeds the queue's message size, or the receive buffer
    /// is smaller than it.
    Size,
    /// The deadline passed before the call could complete.
    Timeout,
    /// No queue exists under the given name.
    DoesNotExist,
    /// Any failure not covered above.
    Other,
}

impl fmt::Display for PosixMqErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PosixMqErrorKind::Permissions => "permission denied",
            PosixMqErrorKind::Value => "invalid value",
            PosixMqErrorKind::Resources => "system resources exhausted",
            PosixMqErrorKind::Descriptor => "invalid queue descriptor",
            PosixMqErrorKind::Signal => "interrupted by signal",
            PosixMqErrorKind::Size => "message size out of bounds",
            PosixMqErrorKind::Timeout => "timed out",
            PosixMqErrorKind::DoesNotExist => "queue does not exist",
            PosixMqErrorKind::Other => "message queue error",
        };
        f.write_str(text)
    }
}

/// The queue operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosixMqOp {
    Open,
    Close,
    Unlink,
    Put,
    Get,
    GetAttributes,
}

impl fmt::Display for PosixMqOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PosixMqOp::Open => "mq_open",
            PosixMqOp::Close => "mq_close",
            PosixMqOp::Unlink => "mq_unlink",
            PosixMqOp::Put => "mq_send",
            PosixMqOp::Get => "mq_receive",
            PosixMqOp::GetAttributes => "mq_getattr",
        };
        f.write_str(text)
    }
}

/// Map an errno reported by `op` onto an error kind.
///
/// Total: codes an operation is not documented to return map to
/// [`PosixMqErrorKind::Other`].
pub fn classify(op: PosixMqOp, errno: i32) -> PosixMqErrorKind {
    use PosixMqErrorKind::*;

    match op {
        PosixMqOp::Open => match errno {
            libc::EACCES => Permissions,
            libc::EINVAL | libc::ENAMETOOLONG | libc::ENOENT => Value,
            libc::EMFILE | libc::ENFILE | libc::ENOMEM | libc::ENOSPC => Resources,
            _ => Other,
        },
        PosixMqOp::Close | PosixMqOp::GetAttributes => match errno {
            libc::EBADF => Descriptor,
            _ => Other,
        },
        PosixMqOp::Unlink => match errno {
            libc::EACCES => Permissions,
            libc::EINVAL | libc::ENAMETOOLONG => Value,
            libc::ENOENT => DoesNotExist,
            _ => Other,
        },
        PosixMqOp::Put | PosixMqOp::Get => match errno {
            libc::EBADF => Descriptor,
            libc::EINTR => Signal,
            libc::EINVAL => Value,
            libc::EMSGSIZE => Size,
            libc::ETIMEDOUT => Timeout,
            _ => Other,
        },
    }
}

/// A failed POSIX queue operation.
///
/// Keeps the originating OS error so callers can still report the raw errno.
#[derive(Debug, thiserror::Error)]
#[error("{op} failed: {kind}: {source}")]
pub struct PosixMqError {
    op: PosixMqOp,
    kind: PosixMqErrorKind,
    #[source]
    source: io::Error,
}

impl PosixMqError {
    /// Classify an OS error returned by `op`.
    pub fn from_os(op: PosixMqOp, source: io::Error) -> Self {
        let kind = source
            .raw_os_error()
            .map_or(PosixMqErrorKind::Other, |errno| classify(op, errno));
        Self { op, kind, source }
    }

    /// Capture `errno` right after a failed call.
    pub(crate) fn last_os_error(op: PosixMqOp) -> Self {
        Self::from_os(op, io::Error::last_os_error())
    }

    /// An argument rejected before reaching the kernel, reported with the
    /// errno the kernel would have used.
    pub(crate) fn rejected(op: PosixMqOp, kind: PosixMqErrorKind, errno: i32) -> Self {
        Self {
            op,
            kind,
            source: io::Error::from_raw_os_error(errno),
        }
    }

    pub fn kind(&self) -> PosixMqErrorKind {
        self.kind
    }

    pub fn op(&self) -> PosixMqOp {
        self.op
    }

    /// The raw errno behind this error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }

    pub fn into_io_error(self) -> io::Error {
        self.source
    }
}

pub type Result<T> = std::result::Result<T, PosixMqError>;
