//! System V message queues.
//!
//! Keyed queues bounded by a total byte budget. Every message carries a
//! positive type, and receivers select messages by type (`0` takes the
//! oldest message of any type). There is no deadline-based wait: calls
//! either block indefinitely or fail immediately.
//!
//! Two layers are exposed:
//! - [`msg`]: descriptor-level operations mirroring the kernel calls
//! - [`SysvQueue`]: a handle bound to one queue id

#[cfg(unix)]
pub mod error;

#[cfg(target_os = "linux")]
pub mod msg;
#[cfg(target_os = "linux")]
pub mod queue;

#[cfg(unix)]
pub use error::{classify, Result, SysvMqError, SysvMqErrorKind, SysvMqOp};

#[cfg(target_os = "linux")]
pub use msg::{MsqId, SysvMqAttributes, MAX_MESSAGE_SIZE, QUEUE_MODE};
#[cfg(target_os = "linux")]
pub use queue::{SysvQueue, SysvQueueConfig};
