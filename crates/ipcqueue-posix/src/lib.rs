//! POSIX message queues.
//!
//! Named, kernel-persistent queues with a per-message priority. Messages are
//! delivered highest priority first, FIFO within a priority. The queue's
//! maximum message size is fixed when it is created, and every receive must
//! offer a buffer at least that large.
//!
//! Two layers are exposed:
//! - [`mq`]: descriptor-level operations mirroring the kernel calls
//! - [`PosixQueue`]: an owned handle that closes its descriptor on drop

#[cfg(unix)]
pub mod error;

#[cfg(target_os = "linux")]
pub mod mq;
#[cfg(target_os = "linux")]
pub mod queue;

#[cfg(unix)]
pub use error::{classify, PosixMqError, PosixMqErrorKind, PosixMqOp, Result};

#[cfg(target_os = "linux")]
pub use mq::{MqDescriptor, PosixMqAttributes, QUEUE_MODE};
#[cfg(target_os = "linux")]
pub use queue::{PosixQueue, PosixQueueConfig};
