/// Errors that can occur while encoding or decoding queue items.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the item-level helpers in [`crate::MessageQueueExt`].
#[derive(Debug, thiserror::Error)]
pub enum ItemError<E>
where
    E: std::error::Error + 'static,
{
    /// The underlying queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[source] E),

    /// The item could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialize(#[from] SerializeError),
}
