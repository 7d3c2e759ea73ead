use crate::error::ItemError;
use crate::serializer::Serializer;
use crate::timeout::Timeout;

/// A message taken off a queue, with the tag it was sent under.
///
/// The tag is the priority for POSIX queues and the message type for
/// System V queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T> {
    pub payload: Vec<u8>,
    pub tag: T,
}

/// Capabilities shared by both kernel queue facilities.
///
/// Opening is backend-specific (a name and capacities vs. a numeric key), as
/// are extensions such as unlinking or resizing, so they live on the concrete
/// types. The associated types keep the real differences visible: a POSIX
/// send takes a priority and a receive has nothing to select on, while a
/// System V send takes a message type and a receive takes a type selector.
pub trait MessageQueue {
    type Error: std::error::Error + Send + Sync + 'static;
    /// Attached to every sent message.
    type Tag: Copy;
    /// Picks which queued message a receive takes.
    type Selector: Copy;
    type Attributes;

    /// Enqueue one message, blocking according to `timeout`.
    fn send(&self, payload: &[u8], tag: Self::Tag, timeout: Timeout) -> Result<(), Self::Error>;

    /// Dequeue one message, blocking according to `timeout`.
    fn receive(
        &self,
        selector: Self::Selector,
        timeout: Timeout,
    ) -> Result<Message<Self::Tag>, Self::Error>;

    /// Snapshot of the queue's counters and capacity.
    fn attributes(&self) -> Result<Self::Attributes, Self::Error>;

    /// Release the queue handle.
    fn close(self) -> Result<(), Self::Error>
    where
        Self: Sized;
}

/// Item-level helpers layered over [`MessageQueue`] through a [`Serializer`].
pub trait MessageQueueExt: MessageQueue {
    fn send_item<T, S>(
        &self,
        serializer: &S,
        item: &T,
        tag: Self::Tag,
        timeout: Timeout,
    ) -> Result<(), ItemError<Self::Error>>
    where
        S: Serializer<T>,
    {
        let payload = serializer.dumps(item)?;
        self.send(&payload, tag, timeout).map_err(ItemError::Queue)
    }

    fn receive_item<T, S>(
        &self,
        serializer: &S,
        selector: Self::Selector,
        timeout: Timeout,
    ) -> Result<(T, Self::Tag), ItemError<Self::Error>>
    where
        S: Serializer<T>,
    {
        let message = self.receive(selector, timeout).map_err(ItemError::Queue)?;
        let item = serializer.loads(&message.payload)?;
        Ok((item, message.tag))
    }
}

impl<Q: MessageQueue + ?Sized> MessageQueueExt for Q {}
