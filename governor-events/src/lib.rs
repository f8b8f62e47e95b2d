pub mod local;
pub mod msg;
pub mod pubsub;
pub mod ringbuf;

use std::future::Future;
use std::pin::Pin;

use governor_core::GovernorError;
use tokio_util::sync::CancellationToken;

pub use local::{LocalEventStream, LocalSubscription};
pub use msg::{ConsumerOpts, Msg, StreamOpts};
pub use pubsub::{LocalPubsub, PubsubSubscription};
pub use ringbuf::RingBuffer;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Common interface regardless of backend (in-process ring buffer or a wire
/// technology such as NATS JetStream). Object-safe so a service can hold
/// `Box<dyn EventStream>` chosen at config time.
pub trait EventStream: Send + Sync {
    /// Idempotent create; updates existing config if the topic is already present.
    fn init_stream<'a>(&'a self, topic: &'a str, opts: StreamOpts) -> BoxFuture<'a, Result<(), GovernorError>>;

    /// Idempotent delete. A topic created again after deletion is a new
    /// identity — its offset counter restarts at zero.
    fn delete_stream<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<(), GovernorError>>;

    /// Atomic-per-message publication. Fails with `ErrorKind::NotFound` if the
    /// topic is unknown.
    fn publish<'a>(&'a self, msgs: Vec<Msg>) -> BoxFuture<'a, Result<Vec<Msg>, GovernorError>>;

    /// Creates or attaches to a durable consumer. Exactly one active consumer
    /// per (topic, group) sees a given message.
    fn subscribe<'a>(
        &'a self,
        topic: &'a str,
        group: &'a str,
        opts: ConsumerOpts,
    ) -> BoxFuture<'a, Result<Box<dyn Subscription>, GovernorError>>;
}

/// A live reader bound to (topic, group).
pub trait Subscription: Send + Sync {
    /// Blocks until a message is assigned to this subscription, the
    /// subscription closes (`ErrorKind::ClientClosed`), its partition/group
    /// is unassigned (`ErrorKind::PartitionUnassigned`), or `cancel` fires.
    fn read_msg<'a>(&'a self, cancel: CancellationToken) -> BoxFuture<'a, Result<Msg, GovernorError>>;

    /// Advances the group's read cursor past `msg.offset`. Idempotent:
    /// committing a stale or mismatched offset is a no-op.
    fn commit<'a>(&'a self, msg: &'a Msg) -> BoxFuture<'a, Result<(), GovernorError>>;

    /// Resolves when this subscription loses the right to commit messages
    /// (rebalance, close, or topic removal).
    fn msg_unassigned<'a>(&'a self) -> BoxFuture<'a, ()>;

    /// Idempotent. Releases group membership; if active, another member is
    /// elected; waiters on this subscription observe `ErrorKind::ClientClosed`.
    fn close<'a>(&'a self) -> BoxFuture<'a, ()>;
}

pub mod prelude {
    pub use crate::{
        BoxFuture, ConsumerOpts, EventStream, LocalEventStream, LocalPubsub, LocalSubscription, Msg, PubsubSubscription,
        RingBuffer, StreamOpts, Subscription,
    };
}
