//! Kernel message queues for Linux.
//!
//! ipcqueue wraps the two message queue facilities the kernel offers behind
//! typed errors and a shared timeout model.
//!
//! # Crate Structure
//!
//! - [`posix`]: named priority queues (`mq_open`, `mq_timedsend`, ...)
//! - [`sysv`]: keyed, typed queues (`msgget`, `msgsnd`, `msgrcv`, ...)
//! - top level: [`Timeout`], [`Deadline`], the [`MessageQueue`] trait and
//!   payload [`Serializer`]s shared by both
//!
//! ```no_run
//! use ipcqueue::posix::{PosixQueue, PosixQueueConfig};
//! use ipcqueue::Timeout;
//!
//! let queue = PosixQueue::open("/jobs", PosixQueueConfig::default())?;
//! queue.put(b"build", 3, Timeout::Forever)?;
//! let (payload, priority) = queue.get(std::time::Duration::from_secs(1))?;
//! # Ok::<(), ipcqueue::posix::PosixMqError>(())
//! ```

pub use ipcqueue_core::*;

/// Re-export POSIX queue types.
pub mod posix {
    pub use ipcqueue_posix::*;
}

/// Re-export System V queue types.
pub mod sysv {
    pub use ipcqueue_sysv::*;
}
