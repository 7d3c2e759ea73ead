use ipcqueue_core::{Message, MessageQueue, Timeout};
use tracing::debug;

use crate::error::{PosixMqError, Result};
use crate::mq::{self, MqDescriptor, PosixMqAttributes};

/// Capacities used when [`PosixQueue::open`] creates the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixQueueConfig {
    /// Maximum number of queued messages.
    pub max_messages: usize,
    /// Maximum size of one message in bytes.
    pub max_msg_size: usize,
}

impl Default for PosixQueueConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            max_msg_size: 1024,
        }
    }
}

/// An open POSIX message queue that owns its descriptor.
///
/// Dropping the handle closes the descriptor. The queue itself has kernel
/// persistence and outlives the handle unless [`PosixQueue::unlink`] is called.
#[derive(Debug)]
pub struct PosixQueue {
    mqd: MqDescriptor,
    name: String,
    max_msg_size: usize,
    closed: bool,
}

impl PosixQueue {
    /// Create or open the queue `name` (which must start with `/`).
    ///
    /// When the queue already exists its original capacities win; the
    /// receive buffer is sized from what the kernel reports.
    pub fn open(name: impl Into<String>, config: PosixQueueConfig) -> Result<Self> {
        let name = name.into();
        let mqd = mq::open(&name, config.max_msg_size, config.max_messages)?;
        let attrs = match mq::get_attributes(mqd) {
            Ok(attrs) => attrs,
            Err(err) => {
                close_logged(mqd, &name, "closing posix queue after failed open");
                return Err(err);
            }
        };

        Ok(Self {
            mqd,
            name,
            max_msg_size: attrs.max_msg_size,
            closed: false,
        })
    }

    /// [`PosixQueue::open`] with the default capacities.
    pub fn create(name: impl Into<String>) -> Result<Self> {
        Self::open(name, PosixQueueConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> MqDescriptor {
        self.mqd
    }

    /// Largest message this queue carries, in bytes.
    pub fn max_msg_size(&self) -> usize {
        self.max_msg_size
    }

    /// Send `payload`; `None` blocks until there is room.
    ///
    /// Higher priorities are received first.
    pub fn put(&self, payload: &[u8], priority: u32, timeout: impl Into<Timeout>) -> Result<()> {
        mq::put_timeout(self.mqd, payload, priority, timeout.into())
    }

    /// Send without waiting; a full queue fails with `Timeout`.
    pub fn put_nowait(&self, payload: &[u8], priority: u32) -> Result<()> {
        self.put(payload, priority, Timeout::NON_BLOCKING)
    }

    /// Receive the highest-priority message and its priority.
    pub fn get(&self, timeout: impl Into<Timeout>) -> Result<(Vec<u8>, u32)> {
        mq::get_timeout(self.mqd, self.max_msg_size, timeout.into())
    }

    /// Receive without waiting; an empty queue fails with `Timeout`.
    pub fn get_nowait(&self) -> Result<(Vec<u8>, u32)> {
        self.get(Timeout::NON_BLOCKING)
    }

    pub fn attributes(&self) -> Result<PosixMqAttributes> {
        mq::get_attributes(self.mqd)
    }

    /// Approximate number of queued messages.
    pub fn qsize(&self) -> Result<usize> {
        Ok(self.attributes()?.current_messages)
    }

    /// Remove the queue's name. This handle stays usable until closed.
    pub fn unlink(&self) -> Result<()> {
        mq::unlink(&self.name)
    }

    /// Close the descriptor, reporting any failure.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        mq::close(self.mqd)
    }
}

impl Drop for PosixQueue {
    fn drop(&mut self) {
        if !self.closed {
            close_logged(self.mqd, &self.name, "closing posix queue on drop");
        }
    }
}

/// Close `mqd` on a path that cannot report errors; failures go to `debug!`.
fn close_logged(mqd: MqDescriptor, name: &str, context: &str) -> bool {
    match mq::close(mqd) {
        Ok(()) => true,
        Err(err) => {
            debug!(name, %err, "{context} failed");
            false
        }
    }
}

impl MessageQueue for PosixQueue {
    type Error = PosixMqError;
    type Tag = u32;
    type Selector = ();
    type Attributes = PosixMqAttributes;

    fn send(&self, payload: &[u8], priority: u32, timeout: Timeout) -> Result<()> {
        self.put(payload, priority, timeout)
    }

    fn receive(&self, _selector: (), timeout: Timeout) -> Result<Message<u32>> {
        let (payload, tag) = self.get(timeout)?;
        Ok(Message { payload, tag })
    }

    fn attributes(&self) -> Result<PosixMqAttributes> {
        PosixQueue::attributes(self)
    }

    fn close(self) -> Result<()> {
        PosixQueue::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_logged_reports_outcome() {
        let name = format!("/ipcqueue-close-logged-{}", std::process::id());
        let _ = mq::unlink(&name);
        let mqd = mq::open(&name, 64, 2).unwrap();

        assert!(close_logged(mqd, &name, "closing test queue"));
        assert!(!close_logged(MqDescriptor::from_raw(-1), &name, "closing bogus descriptor"));

        mq::unlink(&name).unwrap();
    }
}
