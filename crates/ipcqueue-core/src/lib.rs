//! Shared building blocks for the ipcqueue backends.
//!
//! Both kernel queue facilities (POSIX `mq_*` and System V `msg*`) are driven
//! through the same pieces provided here:
//! - [`Timeout`]: relative timeout parsed from the caller's floating-point value
//! - [`Deadline`]: absolute realtime deadline for `*_timed*` primitives
//! - [`MessageQueue`]: minimal capability set shared by both backends
//! - [`Serializer`]: optional item encoding on top of raw byte payloads

pub mod deadline;
pub mod error;
pub mod serializer;
pub mod timeout;
pub mod traits;

pub use deadline::{Deadline, NANOS_PER_SEC};
pub use error::{ItemError, SerializeError};
pub use serializer::{JsonSerializer, RawSerializer, Serializer};
pub use timeout::Timeout;
pub use traits::{Message, MessageQueue, MessageQueueExt};
