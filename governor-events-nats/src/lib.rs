//! NATS JetStream-backed [`governor_events::EventStream`]: stream per topic,
//! durable pull-consumer per group, the message key carried in a header
//! since JetStream has no native key field. The wire counterpart to
//! `governor-events`'s in-process `LocalEventStream`.

pub mod config;
pub mod error;
pub mod pubsub;
pub mod stream;

pub use config::NatsConfig;
pub use error::NatsErrorExt;
pub use pubsub::{NatsPubsub, NatsPubsubSubscription};
pub use stream::NatsEventStream;

pub mod prelude {
    pub use crate::{NatsConfig, NatsEventStream, NatsPubsub};
    pub use governor_events::{EventStream, Subscription};
}
