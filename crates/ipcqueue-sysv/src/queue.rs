use ipcqueue_core::{Message, MessageQueue, Timeout};
use tracing::warn;

use crate::error::{Result, SysvMqError};
use crate::msg::{self, MsqId, SysvMqAttributes, MAX_MESSAGE_SIZE};

/// Settings applied when [`SysvQueue::open`] attaches to a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SysvQueueConfig {
    /// Byte budget to set right after opening. `None` keeps the queue's
    /// current limit (the system default for new queues).
    pub max_bytes: Option<usize>,
}

/// A System V message queue bound to one queue id.
///
/// Dropping the handle leaves the queue in place, since other processes may
/// share it. [`SysvQueue::close`] removes it for everyone.
#[derive(Debug)]
pub struct SysvQueue {
    msqid: MsqId,
    key: u32,
}

impl SysvQueue {
    /// Create or open the queue for `key`; `None` or `Some(0)` creates a
    /// private queue.
    pub fn open(key: Option<u32>, config: SysvQueueConfig) -> Result<Self> {
        let key = key.unwrap_or(0);
        let msqid = msg::open(i64::from(key))?;

        if let Some(max_bytes) = config.max_bytes {
            if let Err(err) = msg::set_max_bytes(msqid, max_bytes) {
                // A private queue is unreachable once this handle is gone.
                if key == 0 {
                    if let Err(cleanup) = msg::close(msqid) {
                        warn!(msqid = msqid.as_raw(), %cleanup, "failed to remove private queue");
                    }
                }
                return Err(err);
            }
        }

        Ok(Self { msqid, key })
    }

    /// Attach to the existing queue for `key` without creating one.
    ///
    /// A key with no queue fails with `Descriptor`; `0` fails with `Value`.
    pub fn attach(key: u32) -> Result<Self> {
        let msqid = msg::attach(i64::from(key))?;
        Ok(Self { msqid, key })
    }

    /// A new private queue with the system default byte budget.
    pub fn private() -> Result<Self> {
        Self::open(None, SysvQueueConfig::default())
    }

    /// The key this queue was opened with; `0` for private queues.
    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn id(&self) -> MsqId {
        self.msqid
    }

    /// Send `payload` as a message of `msg_type`, waiting for room.
    pub fn put(&self, payload: &[u8], msg_type: i64) -> Result<()> {
        msg::put_timeout(self.msqid, payload, msg_type, Timeout::Forever)
    }

    /// Send without waiting; a full queue fails with `Full`.
    pub fn put_nowait(&self, payload: &[u8], msg_type: i64) -> Result<()> {
        msg::put_timeout(self.msqid, payload, msg_type, Timeout::NON_BLOCKING)
    }

    /// Receive the oldest message matching `msg_type`, waiting for one.
    ///
    /// `0` matches any type, a positive value matches exactly.
    pub fn get(&self, msg_type: i64) -> Result<Vec<u8>> {
        Ok(self.get_message(msg_type, Timeout::Forever)?.payload)
    }

    /// Receive without waiting; no matching message fails with `Empty`.
    pub fn get_nowait(&self, msg_type: i64) -> Result<Vec<u8>> {
        Ok(self.get_message(msg_type, Timeout::NON_BLOCKING)?.payload)
    }

    /// Receive a message together with the type it was sent with.
    ///
    /// Only [`Timeout::Forever`] and [`Timeout::NON_BLOCKING`] are accepted.
    pub fn get_message(&self, msg_type: i64, timeout: Timeout) -> Result<Message<i64>> {
        msg::get_message(self.msqid, MAX_MESSAGE_SIZE, msg_type, timeout)
    }

    pub fn attributes(&self) -> Result<SysvMqAttributes> {
        msg::get_attributes(self.msqid)
    }

    pub fn set_max_bytes(&self, max_bytes: usize) -> Result<()> {
        msg::set_max_bytes(self.msqid, max_bytes)
    }

    /// Approximate number of queued messages.
    pub fn qsize(&self) -> Result<usize> {
        Ok(self.attributes()?.current_messages)
    }

    /// Remove the queue system-wide.
    pub fn close(self) -> Result<()> {
        msg::close(self.msqid)
    }
}

impl MessageQueue for SysvQueue {
    type Error = SysvMqError;
    type Tag = i64;
    type Selector = i64;
    type Attributes = SysvMqAttributes;

    fn send(&self, payload: &[u8], msg_type: i64, timeout: Timeout) -> Result<()> {
        msg::put_timeout(self.msqid, payload, msg_type, timeout)
    }

    fn receive(&self, msg_type: i64, timeout: Timeout) -> Result<Message<i64>> {
        self.get_message(msg_type, timeout)
    }

    fn attributes(&self) -> Result<SysvMqAttributes> {
        SysvQueue::attributes(self)
    }

    fn close(self) -> Result<()> {
        SysvQueue::close(self)
    }
}
