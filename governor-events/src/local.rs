//! In-process `EventStream` backed by [`crate::ringbuf::RingBuffer`].
//!
//! Topics own their groups; groups own the ring buffer of pending messages
//! and the currently-active subscription. A subscription holds only a `Weak`
//! reference back to its group so that closing a subscription (dropping the
//! strong `Arc`) doesn't leak group state, and so a group can outlive a
//! subscription that walks away without calling `close`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use governor_core::{ErrorKind, GovernorError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::msg::{ConsumerOpts, Msg, StreamOpts};
use crate::ringbuf::RingBuffer;
use crate::{BoxFuture, EventStream, Subscription};

struct Group {
    pending: Mutex<RingBuffer<Msg>>,
    /// Bumped by `publish` / on re-election so waiting readers wake up.
    notify_read: Notify,
    /// Fired whenever the active member changes (new subscribe, or close of
    /// the current active member). A subscription observes this to learn it
    /// has lost its claim.
    notify_unassigned: Notify,
    active: Mutex<Option<u64>>,
    next_member_id: AtomicU64,
    members: Mutex<Vec<u64>>,
}

impl Group {
    fn new() -> Self {
        Group {
            pending: Mutex::new(RingBuffer::new()),
            notify_read: Notify::new(),
            notify_unassigned: Notify::new(),
            active: Mutex::new(None),
            next_member_id: AtomicU64::new(0),
            members: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new member and elects it active if no member is currently active.
    fn join(self: &Arc<Self>) -> u64 {
        let id = self.next_member_id.fetch_add(1, Ordering::SeqCst);
        self.members.lock().unwrap().push(id);
        let mut active = self.active.lock().unwrap();
        if active.is_none() {
            *active = Some(id);
        }
        id
    }

    /// Removes `id` from membership, electing a new active member if `id` was active.
    fn leave(&self, id: u64) {
        self.members.lock().unwrap().retain(|&m| m != id);
        let mut active = self.active.lock().unwrap();
        if *active == Some(id) {
            *active = self.members.lock().unwrap().first().copied();
            tracing::debug!(?active, "group rebalanced after active member left");
            self.notify_unassigned.notify_waiters();
        }
    }

    fn is_active(&self, id: u64) -> bool {
        *self.active.lock().unwrap() == Some(id)
    }
}

struct Topic {
    next_offset: AtomicU64,
    groups: RwLock<HashMap<String, Arc<Group>>>,
    opts: Mutex<StreamOpts>,
}

impl Topic {
    fn new(opts: StreamOpts) -> Self {
        Topic {
            next_offset: AtomicU64::new(0),
            groups: RwLock::new(HashMap::new()),
            opts: Mutex::new(opts),
        }
    }

    fn group(&self, name: &str) -> Arc<Group> {
        if let Some(g) = self.groups.read().unwrap().get(name) {
            return g.clone();
        }
        let mut groups = self.groups.write().unwrap();
        groups.entry(name.to_string()).or_insert_with(|| Arc::new(Group::new())).clone()
    }
}

/// In-process, single-binary `EventStream`. Topics and their offsets live
/// only as long as the process; there is no persistence across restarts.
#[derive(Default)]
pub struct LocalEventStream {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl LocalEventStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.read().unwrap().get(name).cloned()
    }
}

impl EventStream for LocalEventStream {
    fn init_stream<'a>(&'a self, topic: &'a str, opts: StreamOpts) -> BoxFuture<'a, Result<(), GovernorError>> {
        Box::pin(async move {
            let existing = self.topics.read().unwrap().get(topic).cloned();
            if let Some(existing) = existing {
                *existing.opts.lock().unwrap() = opts;
                return Ok(());
            }
            let mut topics = self.topics.write().unwrap();
            topics.entry(topic.to_string()).or_insert_with(|| Arc::new(Topic::new(opts)));
            Ok(())
        })
    }

    fn delete_stream<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<(), GovernorError>> {
        Box::pin(async move {
            self.topics.write().unwrap().remove(topic);
            Ok(())
        })
    }

    fn publish<'a>(&'a self, msgs: Vec<Msg>) -> BoxFuture<'a, Result<Vec<Msg>, GovernorError>> {
        Box::pin(async move {
            let mut written = Vec::with_capacity(msgs.len());
            for mut msg in msgs {
                let topic = self.topic(&msg.topic).ok_or_else(|| {
                    tracing::warn!(topic = %msg.topic, "rejecting publish: topic not initialized");
                    GovernorError::not_found(format!("topic {} not found", msg.topic))
                })?;
                msg.offset = topic.next_offset.fetch_add(1, Ordering::SeqCst);
                for group in topic.groups.read().unwrap().values() {
                    group.pending.lock().unwrap().write(msg.clone());
                    group.notify_read.notify_waiters();
                }
                written.push(msg);
            }
            Ok(written)
        })
    }

    fn subscribe<'a>(
        &'a self,
        topic: &'a str,
        group_name: &'a str,
        _opts: ConsumerOpts,
    ) -> BoxFuture<'a, Result<Box<dyn Subscription>, GovernorError>> {
        Box::pin(async move {
            let topic = self
                .topic(topic)
                .ok_or_else(|| GovernorError::not_found(format!("topic {topic} not found")))?;
            let group = topic.group(group_name);
            let member_id = group.join();
            group.notify_unassigned.notify_waiters();
            Ok(Box::new(LocalSubscription {
                group: Arc::downgrade(&group),
                member_id,
                closed: std::sync::atomic::AtomicBool::new(false),
            }) as Box<dyn Subscription>)
        })
    }
}

/// A live reader bound to a `(topic, group)` pair of a [`LocalEventStream`].
pub struct LocalSubscription {
    group: Weak<Group>,
    member_id: u64,
    closed: std::sync::atomic::AtomicBool,
}

impl Subscription for LocalSubscription {
    fn read_msg<'a>(&'a self, cancel: CancellationToken) -> BoxFuture<'a, Result<Msg, GovernorError>> {
        Box::pin(async move {
            loop {
                if self.closed.load(Ordering::SeqCst) {
                    return Err(GovernorError::new(ErrorKind::ClientClosed, "subscription closed"));
                }
                let Some(group) = self.group.upgrade() else {
                    return Err(GovernorError::new(ErrorKind::ClientClosed, "topic removed"));
                };
                if !group.is_active(self.member_id) {
                    return Err(GovernorError::new(
                        ErrorKind::PartitionUnassigned,
                        "no longer the active consumer",
                    ));
                }
                if let Some(msg) = group.pending.lock().unwrap().peek().cloned() {
                    return Ok(msg);
                }
                let notified = group.notify_read.notified();
                let unassigned = group.notify_unassigned.notified();
                tokio::select! {
                    _ = notified => {},
                    _ = unassigned => {},
                    _ = cancel.cancelled() => {
                        return Err(GovernorError::new(ErrorKind::ClientClosed, "read cancelled"));
                    }
                }
            }
        })
    }

    fn commit<'a>(&'a self, msg: &'a Msg) -> BoxFuture<'a, Result<(), GovernorError>> {
        Box::pin(async move {
            let Some(group) = self.group.upgrade() else {
                return Ok(());
            };
            if !group.is_active(self.member_id) {
                return Ok(());
            }
            let mut pending = group.pending.lock().unwrap();
            if pending.peek().map(|m| m.offset) == Some(msg.offset) {
                pending.read();
            }
            Ok(())
        })
    }

    fn msg_unassigned<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            loop {
                let Some(group) = self.group.upgrade() else {
                    return;
                };
                if self.closed.load(Ordering::SeqCst) || !group.is_active(self.member_id) {
                    return;
                }
                group.notify_unassigned.notified().await;
            }
        })
    }

    fn close<'a>(&'a self) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(group) = self.group.upgrade() {
                group.leave(self.member_id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn msg(topic: &str, key: &str, value: &str) -> Msg {
        Msg::new(topic, key, Bytes::from(value.to_string()))
    }

    #[tokio::test]
    async fn publish_then_read_then_commit() {
        let stream = LocalEventStream::new();
        stream.init_stream("orders", StreamOpts::default()).await.unwrap();
        stream.publish(vec![msg("orders", "k1", "created")]).await.unwrap();

        let sub = stream
            .subscribe("orders", "workers", ConsumerOpts::default())
            .await
            .unwrap();
        let got = sub.read_msg(CancellationToken::new()).await.unwrap();
        assert_eq!(got.key, "k1");
        sub.commit(&got).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = sub.read_msg(cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientClosed);
    }

    #[tokio::test]
    async fn publish_to_unknown_topic_is_not_found() {
        let stream = LocalEventStream::new();
        let err = stream.publish(vec![msg("missing", "k", "v")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn commit_with_stale_offset_is_noop() {
        let stream = LocalEventStream::new();
        stream.init_stream("t", StreamOpts::default()).await.unwrap();
        stream.publish(vec![msg("t", "a", "1")]).await.unwrap();
        stream.publish(vec![msg("t", "b", "2")]).await.unwrap();

        let sub = stream.subscribe("t", "g", ConsumerOpts::default()).await.unwrap();
        let first = sub.read_msg(CancellationToken::new()).await.unwrap();
        let mut stale = Msg::new("t", "b", Bytes::from_static(b"2"));
        stale.offset = first.offset + 99;
        sub.commit(&stale).await.unwrap();

        let still_first = sub.read_msg(CancellationToken::new()).await.unwrap();
        assert_eq!(still_first.offset, first.offset);
    }

    #[tokio::test]
    async fn second_subscriber_is_not_active_until_first_closes() {
        let stream = LocalEventStream::new();
        stream.init_stream("t", StreamOpts::default()).await.unwrap();
        let first = stream.subscribe("t", "g", ConsumerOpts::default()).await.unwrap();
        let second = stream.subscribe("t", "g", ConsumerOpts::default()).await.unwrap();

        stream.publish(vec![msg("t", "a", "1")]).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = second.read_msg(cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PartitionUnassigned);

        first.close().await;
        let got = second.read_msg(CancellationToken::new()).await.unwrap();
        assert_eq!(got.key, "a");
    }

    #[tokio::test]
    async fn msg_unassigned_resolves_on_rebalance() {
        let stream = LocalEventStream::new();
        stream.init_stream("t", StreamOpts::default()).await.unwrap();
        let first = stream.subscribe("t", "g", ConsumerOpts::default()).await.unwrap();
        let second = stream.subscribe("t", "g", ConsumerOpts::default()).await.unwrap();

        second.close().await;
        stream.publish(vec![msg("t", "a", "v")]).await.unwrap();
        let got = first.read_msg(CancellationToken::new()).await.unwrap();
        assert_eq!(got.key, "a");
    }

    #[tokio::test]
    async fn delete_stream_causes_client_closed_on_read() {
        let stream = LocalEventStream::new();
        stream.init_stream("t", StreamOpts::default()).await.unwrap();
        let sub = stream.subscribe("t", "g", ConsumerOpts::default()).await.unwrap();
        stream.delete_stream("t").await.unwrap();
        let err = sub.read_msg(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientClosed);
    }
}
