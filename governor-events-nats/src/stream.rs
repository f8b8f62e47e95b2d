//! `NatsEventStream`: the wire counterpart to
//! [`governor_events::LocalEventStream`], backed by NATS JetStream.
//!
//! One JetStream stream per topic; the stream's only subject is the topic
//! name itself (subjects may contain dots, so the topic is kept verbatim
//! there). Stream and consumer *names* cannot contain dots, so `.` is
//! replaced with `_` when deriving them from a topic or group. Each group
//! is a durable pull consumer on the topic's stream; the message key rides
//! in the `events.key` header so it survives the JetStream envelope.

use std::sync::atomic::{AtomicBool, Ordering};

use async_nats::jetstream::consumer::{pull::Config as PullConfig, AckPolicy, DeliverPolicy};
use async_nats::jetstream::stream::{Config as StreamConfig, RetentionPolicy};
use async_nats::jetstream::Context as JetStreamContext;
use chrono::{DateTime, Utc};
use governor_core::{ErrorKind, GovernorError};
use governor_events::{BoxFuture, ConsumerOpts, EventStream, Msg, StreamOpts, Subscription};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::NatsConfig;
use crate::error::NatsErrorExt;

/// Header carrying the message key, since a JetStream message's only
/// addressable fields are its subject and payload.
const KEY_HEADER: &str = "events.key";

/// Stream and consumer names reject `.`; topic and group names otherwise use
/// a dotted hierarchy, so the two are kept distinct.
fn sanitize_name(name: &str) -> String {
    name.replace('.', "_")
}

pub struct NatsEventStream {
    jetstream: JetStreamContext,
}

impl NatsEventStream {
    pub async fn connect(config: NatsConfig) -> Result<Self, GovernorError> {
        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| e.into_governor_error("connecting to nats"))?;
        let jetstream = async_nats::jetstream::new(client);
        Ok(NatsEventStream { jetstream })
    }

    pub fn from_client(client: async_nats::Client) -> Self {
        NatsEventStream { jetstream: async_nats::jetstream::new(client) }
    }
}

impl EventStream for NatsEventStream {
    fn init_stream<'a>(&'a self, topic: &'a str, opts: StreamOpts) -> BoxFuture<'a, Result<(), GovernorError>> {
        Box::pin(async move {
            let config = StreamConfig {
                name: sanitize_name(topic),
                subjects: vec![topic.to_string()],
                retention: RetentionPolicy::Limits,
                num_replicas: opts.replicas.max(1) as usize,
                max_age: opts.retention_age.unwrap_or_default(),
                max_bytes: opts.retention_bytes.map(|b| b as i64).unwrap_or(-1),
                max_message_size: opts.max_msg_bytes.map(|b| b as i32).unwrap_or(-1),
                ..Default::default()
            };
            self.jetstream
                .get_or_create_stream(config)
                .await
                .map_err(|e| e.into_governor_error("creating stream"))?;
            Ok(())
        })
    }

    fn delete_stream<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<(), GovernorError>> {
        Box::pin(async move {
            // A topic never created, or already deleted, leaves nothing to
            // remove: idempotent the same way `LocalEventStream` is.
            if self.jetstream.get_stream(sanitize_name(topic)).await.is_err() {
                return Ok(());
            }
            self.jetstream
                .delete_stream(sanitize_name(topic))
                .await
                .map_err(|e| e.into_governor_error("deleting stream"))?;
            Ok(())
        })
    }

    fn publish<'a>(&'a self, msgs: Vec<Msg>) -> BoxFuture<'a, Result<Vec<Msg>, GovernorError>> {
        Box::pin(async move {
            let mut acked = Vec::with_capacity(msgs.len());
            for mut msg in msgs {
                let mut headers = async_nats::HeaderMap::new();
                headers.insert(KEY_HEADER, msg.key.as_str());
                let ack = self
                    .jetstream
                    .publish_with_headers(msg.topic.clone(), headers, msg.value.clone())
                    .await
                    .map_err(|e| e.into_governor_error("publishing message"))?
                    .await
                    .map_err(|e| e.into_governor_error("awaiting publish ack"))?;
                msg.offset = ack.sequence;
                msg.timestamp = Utc::now();
                acked.push(msg);
            }
            Ok(acked)
        })
    }

    fn subscribe<'a>(&'a self, topic: &'a str, group: &'a str, opts: ConsumerOpts) -> BoxFuture<'a, Result<Box<dyn Subscription>, GovernorError>> {
        Box::pin(async move {
            let stream = self
                .jetstream
                .get_stream(sanitize_name(topic))
                .await
                .map_err(|e| e.into_governor_error("looking up stream"))?;

            let durable_name = sanitize_name(group);
            let config = PullConfig {
                durable_name: Some(durable_name.clone()),
                filter_subject: topic.to_string(),
                ack_policy: AckPolicy::Explicit,
                deliver_policy: DeliverPolicy::ByStartTime { start_time: time::OffsetDateTime::now_utc() },
                ack_wait: std::time::Duration::from_nanos(1),
                max_ack_pending: 1,
                max_waiting: 1,
                inactive_threshold: opts.rebalance_timeout.unwrap_or(std::time::Duration::from_secs(300)),
                ..Default::default()
            };

            let consumer = stream
                .get_or_create_consumer(&durable_name, config)
                .await
                .map_err(|e| e.into_governor_error("creating consumer"))?;

            let sub: Box<dyn Subscription> = Box::new(NatsSubscription {
                consumer,
                max_bytes: opts.max_bytes,
                pending: Mutex::new(None),
                closed: AtomicBool::new(false),
                closed_notify: tokio::sync::Notify::new(),
            });
            Ok(sub)
        })
    }
}

type PullConsumer = async_nats::jetstream::consumer::Consumer<PullConfig>;

struct NatsSubscription {
    consumer: PullConsumer,
    max_bytes: Option<u64>,
    /// The one outstanding, unacked message (`MaxAckPending = 1` mirrors
    /// this at the server). `commit` matches on offset so a stale or
    /// repeated commit is a no-op.
    pending: Mutex<Option<(u64, async_nats::jetstream::Message)>>,
    closed: AtomicBool,
    closed_notify: tokio::sync::Notify,
}

impl NatsSubscription {
    async fn fetch_one(&self) -> Result<async_nats::jetstream::Message, GovernorError> {
        use futures_util::StreamExt;

        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(GovernorError::new(ErrorKind::ClientClosed, "subscription closed"));
            }
            let mut batch = self
                .consumer
                .fetch()
                .max_messages(1)
                .max_bytes(self.max_bytes.unwrap_or(1024 * 1024) as usize)
                .expires(std::time::Duration::from_secs(30))
                .messages()
                .await
                .map_err(|e| e.into_governor_error("fetching messages"))?;

            match batch.next().await {
                Some(Ok(msg)) => return Ok(msg),
                Some(Err(e)) => {
                    let err = e.into_governor_error("receiving message");
                    tracing::warn!(%err, "nats fetch batch returned an error");
                    return Err(err);
                }
                None => continue,
            }
        }
    }
}

impl Subscription for NatsSubscription {
    fn read_msg<'a>(&'a self, cancel: CancellationToken) -> BoxFuture<'a, Result<Msg, GovernorError>> {
        Box::pin(async move {
            let raw = tokio::select! {
                result = self.fetch_one() => result?,
                _ = cancel.cancelled() => return Err(GovernorError::new(ErrorKind::ClientClosed, "read cancelled")),
                _ = self.closed_notify.notified() => return Err(GovernorError::new(ErrorKind::ClientClosed, "subscription closed")),
            };

            let info = raw.info().map_err(|e| e.into_governor_error("reading message info"))?;
            let offset = info.stream_sequence;
            let key = raw
                .headers
                .as_ref()
                .and_then(|h| h.get(KEY_HEADER))
                .map(|v| v.to_string())
                .unwrap_or_default();
            let timestamp = DateTime::<Utc>::from_timestamp_nanos(info.published.unix_timestamp_nanos() as i64);
            let topic = raw.subject.to_string();
            let value = raw.payload.clone();

            *self.pending.lock().await = Some((offset, raw));

            Ok(Msg { topic, key, value, partition: 0, offset, timestamp })
        })
    }

    fn commit<'a>(&'a self, msg: &'a Msg) -> BoxFuture<'a, Result<(), GovernorError>> {
        Box::pin(async move {
            let mut pending = self.pending.lock().await;
            match pending.as_ref() {
                Some((offset, _)) if *offset == msg.offset => {
                    let (_, raw) = pending.take().unwrap();
                    raw.ack().await.map_err(|e| GovernorError::new(ErrorKind::Connection, e.to_string()))?;
                }
                _ => {}
            }
            Ok(())
        })
    }

    fn msg_unassigned<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async move { self.closed_notify.notified().await })
    }

    fn close<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
            self.closed_notify.notify_waiters();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_replaces_dots() {
        assert_eq!(sanitize_name("gov.users.updated"), "gov_users_updated");
        assert_eq!(sanitize_name("no-dots-here"), "no-dots-here");
    }
}
