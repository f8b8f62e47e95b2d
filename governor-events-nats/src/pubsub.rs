//! `NatsPubsub`: the wire counterpart to [`governor_events::LocalPubsub`],
//! built on core NATS pub/sub (no JetStream — fire-and-forget, nothing
//! persisted, nothing to ack). A non-empty group name uses a NATS queue
//! group so only one member of the group sees a given message, matching
//! `LocalPubsub`'s queue-group fan-to-one-member behaviour.

use futures_util::StreamExt;
use governor_core::GovernorError;
use governor_events::Msg;

use crate::error::NatsErrorExt;

#[derive(Clone)]
pub struct NatsPubsub {
    client: async_nats::Client,
}

impl NatsPubsub {
    pub fn new(client: async_nats::Client) -> Self {
        NatsPubsub { client }
    }

    pub async fn publish(&self, subject: &str, msg: Msg) -> Result<(), GovernorError> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("events.key", msg.key.as_str());
        self.client
            .publish_with_headers(subject.to_string(), headers, msg.value)
            .await
            .map_err(|e| e.into_governor_error("publishing to subject"))
    }

    /// An empty `group` subscribes independently (every subscriber sees
    /// every message); a non-empty `group` joins a NATS queue group.
    pub async fn subscribe(&self, subject: &str, group: &str) -> Result<NatsPubsubSubscription, GovernorError> {
        let subscriber = if group.is_empty() {
            self.client.subscribe(subject.to_string()).await
        } else {
            self.client.queue_subscribe(subject.to_string(), group.to_string()).await
        }
        .map_err(|e| e.into_governor_error("subscribing to subject"))?;
        Ok(NatsPubsubSubscription { subscriber })
    }
}

pub struct NatsPubsubSubscription {
    subscriber: async_nats::Subscriber,
}

impl NatsPubsubSubscription {
    /// Waits for the next message. Returns `None` once the subscription is
    /// unsubscribed or the connection closes permanently.
    pub async fn next(&mut self) -> Option<Msg> {
        let raw = self.subscriber.next().await?;
        let key = raw
            .headers
            .as_ref()
            .and_then(|h| h.get("events.key"))
            .map(|v| v.to_string())
            .unwrap_or_default();
        Some(Msg::new(raw.subject.to_string(), key, raw.payload))
    }
}
