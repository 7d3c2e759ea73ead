use std::fmt;
use std::io;

/// What went wrong, independent of the raw errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysvMqErrorKind {
    /// Access to the queue was denied, or raising its byte limit needs privilege.
    Permissions,
    /// An argument was rejected (key, message type, timeout).
    Value,
    /// Memory or queue-count limits were hit.
    Resources,
    /// The queue id or key is unknown, or the queue was removed.
    Descriptor,
    /// A blocked call was interrupted by a signal handler.
    Signal,
    /// The payload exceeds the message buffer, or the message exceeds the
    /// receive capacity.
    Size,
    /// A non-blocking send found the queue full.
    Full,
    /// A non-blocking receive found no matching message.
    Empty,
    /// Any failure not covered above.
    Other,
}

impl fmt::Display for SysvMqErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SysvMqErrorKind::Permissions => "permission denied",
            SysvMqErrorKind::Value => "invalid value",
            SysvMqErrorKind::Resources => "system resources exhausted",
            SysvMqErrorKind::Descriptor => "invalid queue id",
            SysvMqErrorKind::Signal => "interrupted by signal",
            SysvMqErrorKind::Size => "message size out of bounds",
            SysvMqErrorKind::Full => "queue is full",
            SysvMqErrorKind::Empty => "no matching message",
            SysvMqErrorKind::Other => "message queue error",
        };
        f.write_str(text)
    }
}

/// The queue operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysvMqOp {
    Open,
    Close,
    Put,
    Get,
    GetAttributes,
    SetMaxBytes,
}

impl fmt::Display for SysvMqOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SysvMqOp::Open => "msgget",
            SysvMqOp::Close => "msgctl(IPC_RMID)",
            SysvMqOp::Put => "msgsnd",
            SysvMqOp::Get => "msgrcv",
            SysvMqOp::GetAttributes => "msgctl(IPC_STAT)",
            SysvMqOp::SetMaxBytes => "msgctl(IPC_SET)",
        };
        f.write_str(text)
    }
}

/// Map an errno reported by `op` onto an error kind.
///
/// Total: codes an operation is not documented to return map to
/// [`SysvMqErrorKind::Other`]. `EINVAL` from a send or receive is ambiguous
/// (bad id or bad argument); it maps to `Value` here and the caller refines
/// it once it knows whether the queue still exists.
pub fn classify(op: SysvMqOp, errno: i32) -> SysvMqErrorKind {
    use SysvMqErrorKind::*;

    match op {
        SysvMqOp::Open => match errno {
            libc::EACCES => Permissions,
            libc::EINVAL => Value,
            libc::ENOENT => Descriptor,
            libc::ENOMEM | libc::ENOSPC => Resources,
            _ => Other,
        },
        SysvMqOp::Close => match errno {
            libc::EIDRM | libc::EINVAL => Descriptor,
            libc::EPERM => Permissions,
            _ => Other,
        },
        SysvMqOp::Put => match errno {
            libc::EACCES => Permissions,
            libc::EAGAIN => Full,
            libc::EFAULT | libc::EINVAL => Value,
            libc::EIDRM => Descriptor,
            libc::EINTR => Signal,
            libc::ENOMEM => Resources,
            _ => Other,
        },
        SysvMqOp::Get => match errno {
            libc::E2BIG => Size,
            libc::EACCES => Permissions,
            libc::EFAULT | libc::EINVAL => Value,
            libc::EIDRM => Descriptor,
            libc::EINTR => Signal,
            libc::ENOMSG => Empty,
            _ => Other,
        },
        SysvMqOp::GetAttributes | SysvMqOp::SetMaxBytes => match errno {
            libc::EACCES | libc::EPERM => Permissions,
            libc::EIDRM | libc::EINVAL => Descriptor,
            _ => Other,
        },
    }
}

/// A failed System V queue operation.
///
/// Keeps the originating OS error so callers can still report the raw errno.
#[derive(Debug, thiserror::Error)]
#[error("{op} failed: {kind}: {source}")]
pub struct SysvMqError {
    op: SysvMqOp,
    kind: SysvMqErrorKind,
    #[source]
    source: io::Error,
}

impl SysvMqError {
    /// Classify an OS error returned by `op`.
    pub fn from_os(op: SysvMqOp, source: io::Error) -> Self {
        let kind = source
            .raw_os_error()
            .map_or(SysvMqErrorKind::Other, |errno| classify(op, errno));
        Self { op, kind, source }
    }

    /// Capture `errno` right after a failed call.
    pub(crate) fn last_os_error(op: SysvMqOp) -> Self {
        Self::from_os(op, io::Error::last_os_error())
    }

    /// An argument rejected before reaching the kernel, reported with the
    /// errno the kernel would have used.
    pub(crate) fn rejected(op: SysvMqOp, kind: SysvMqErrorKind, errno: i32) -> Self {
        Self {
            op,
            kind,
            source: io::Error::from_raw_os_error(errno),
        }
    }

    pub(crate) fn with_kind(mut self, kind: SysvMqErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> SysvMqErrorKind {
        self.kind
    }

    pub fn op(&self) -> SysvMqOp {
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

pub type Result<T> = std::result::Result<T, SysvMqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_errors() {
        assert_eq!(
            classify(SysvMqOp::Open, libc::EACCES),
            SysvMqErrorKind::Permissions
        );
        assert_eq!(
            classify(SysvMqOp::Open, libc::ENOSPC),
            SysvMqErrorKind::Resources
        );
        assert_eq!(
            classify(SysvMqOp::Open, libc::ENOENT),
            SysvMqErrorKind::Descriptor
        );
        assert_eq!(classify(SysvMqOp::Open, libc::EEXIST), SysvMqErrorKind::Other);
    }

    #[test]
    fn non_blocking_outcomes() {
        assert_eq!(classify(SysvMqOp::Put, libc::EAGAIN), SysvMqErrorKind::Full);
        assert_eq!(classify(SysvMqOp::Get, libc::ENOMSG), SysvMqErrorKind::Empty);
    }

    #[test]
    fn removed_queue_is_descriptor() {
        for op in [
            SysvMqOp::Put,
            SysvMqOp::Get,
            SysvMqOp::Close,
            SysvMqOp::GetAttributes,
            SysvMqOp::SetMaxBytes,
        ] {
            assert_eq!(classify(op, libc::EIDRM), SysvMqErrorKind::Descriptor);
        }
    }

    #[test]
    fn oversized_message_on_receive() {
        assert_eq!(classify(SysvMqOp::Get, libc::E2BIG), SysvMqErrorKind::Size);
        assert_eq!(classify(SysvMqOp::Get, libc::EINTR), SysvMqErrorKind::Signal);
    }

    #[test]
    fn raising_limit_without_privilege() {
        assert_eq!(
            classify(SysvMqOp::SetMaxBytes, libc::EPERM),
            SysvMqErrorKind::Permissions
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_other() {
        assert_eq!(classify(SysvMqOp::Put, libc::EIO), SysvMqErrorKind::Other);
        assert_eq!(classify(SysvMqOp::Close, 0), SysvMqErrorKind::Other);
    }

    #[test]
    fn refined_kind_keeps_errno() {
        let err = SysvMqError::from_os(SysvMqOp::Put, io::Error::from_raw_os_error(libc::EINVAL))
            .with_kind(SysvMqErrorKind::Descriptor);
        assert_eq!(err.kind(), SysvMqErrorKind::Descriptor);
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
        assert_eq!(err.op(), SysvMqOp::Put);
    }
}
