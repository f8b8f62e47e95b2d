use bytes::Bytes;
use chrono::{DateTime, Utc};

/// An immutable record delivered through an [`crate::EventStream`].
///
/// Offsets strictly increase within a topic. `timestamp` is set to publish
/// time (UTC) when the caller leaves it at the default (`None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub topic: String,
    pub key: String,
    pub value: Bytes,
    /// Always 0 for the in-process backend; wire backends may partition.
    pub partition: u32,
    /// Monotonically increasing position within the topic.
    pub offset: u64,
    pub timestamp: DateTime<Utc>,
}

impl Msg {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Msg {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
            partition: 0,
            offset: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Options passed to `InitStream`.
#[derive(Debug, Clone, Default)]
pub struct StreamOpts {
    pub replicas: u32,
    pub retention_age: Option<std::time::Duration>,
    pub retention_bytes: Option<u64>,
    pub max_msg_bytes: Option<u64>,
}

/// Options passed to `Subscribe`.
#[derive(Debug, Clone, Default)]
pub struct ConsumerOpts {
    pub max_bytes: Option<u64>,
    pub rebalance_timeout: Option<std::time::Duration>,
}
