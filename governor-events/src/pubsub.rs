//! Fire-and-forget publish/subscribe overlay with no offsets or commits.
//!
//! Unlike [`crate::EventStream`], a pubsub message that arrives while nobody
//! is listening is simply dropped. Subscribing with the same queue group
//! fans a single message to exactly one member of that group; an empty
//! group name fans out to every subscriber independently.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use governor_core::GovernorError;
use tokio::sync::{broadcast, mpsc};

use crate::msg::Msg;

const BROADCAST_CAPACITY: usize = 1024;
const QUEUE_CAPACITY: usize = 1024;

struct Subject {
    broadcast: broadcast::Sender<Msg>,
    queues: RwLock<HashMap<String, Vec<mpsc::Sender<Msg>>>>,
    next_queue_member: std::sync::atomic::AtomicUsize,
}

impl Subject {
    fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Subject {
            broadcast: tx,
            queues: RwLock::new(HashMap::new()),
            next_queue_member: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

/// In-process publish/subscribe. One instance is shared by every publisher
/// and subscriber that needs to see each other's traffic.
#[derive(Default, Clone)]
pub struct LocalPubsub {
    subjects: Arc<RwLock<HashMap<String, Arc<Subject>>>>,
}

impl LocalPubsub {
    pub fn new() -> Self {
        Self::default()
    }

    fn subject(&self, name: &str) -> Arc<Subject> {
        if let Some(s) = self.subjects.read().unwrap().get(name) {
            return s.clone();
        }
        let mut subjects = self.subjects.write().unwrap();
        subjects.entry(name.to_string()).or_insert_with(|| Arc::new(Subject::new())).clone()
    }

    /// Publishes to every broadcast subscriber and to one member of each
    /// queue group registered on `subject`. Never fails: an absent subject
    /// has no subscribers and the message is simply dropped.
    pub async fn publish(&self, subject: &str, msg: Msg) -> Result<(), GovernorError> {
        let subject = self.subject(subject);
        let _ = subject.broadcast.send(msg.clone());
        let queues = subject.queues.read().unwrap();
        for members in queues.values() {
            if members.is_empty() {
                continue;
            }
            let idx = subject.next_queue_member.fetch_add(1, std::sync::atomic::Ordering::SeqCst) % members.len();
            let _ = members[idx].try_send(msg.clone());
        }
        Ok(())
    }

    /// Subscribes to `subject`. An empty `group` receives every message
    /// independently; a non-empty `group` joins a queue where messages are
    /// fanned to exactly one member per publish.
    pub fn subscribe(&self, subject: &str, group: &str) -> PubsubSubscription {
        let subj = self.subject(subject);
        if group.is_empty() {
            let rx = subj.broadcast.subscribe();
            PubsubSubscription::Broadcast(rx)
        } else {
            let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
            subj.queues.write().unwrap().entry(group.to_string()).or_default().push(tx);
            PubsubSubscription::Queue(rx)
        }
    }
}

/// A live pubsub reader, returned by [`LocalPubsub::subscribe`].
pub enum PubsubSubscription {
    Broadcast(broadcast::Receiver<Msg>),
    Queue(mpsc::Receiver<Msg>),
}

impl PubsubSubscription {
    /// Waits for the next message. Returns `None` once the subject's
    /// publisher side is gone and no further messages can arrive.
    pub async fn next(&mut self) -> Option<Msg> {
        match self {
            PubsubSubscription::Broadcast(rx) => loop {
                match rx.recv().await {
                    Ok(msg) => return Some(msg),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
            PubsubSubscription::Queue(rx) => rx.recv().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn msg(subject: &str, body: &str) -> Msg {
        Msg::new(subject, "k", Bytes::from(body.to_string()))
    }

    #[tokio::test]
    async fn broadcast_fans_out_to_every_subscriber() {
        let pubsub = LocalPubsub::new();
        let mut a = pubsub.subscribe("topic", "");
        let mut b = pubsub.subscribe("topic", "");

        pubsub.publish("topic", msg("topic", "hi")).await.unwrap();

        assert_eq!(a.next().await.unwrap().value, Bytes::from("hi"));
        assert_eq!(b.next().await.unwrap().value, Bytes::from("hi"));
    }

    #[tokio::test]
    async fn queue_group_delivers_to_exactly_one_member() {
        let pubsub = LocalPubsub::new();
        let mut a = pubsub.subscribe("jobs", "workers");
        let mut b = pubsub.subscribe("jobs", "workers");

        pubsub.publish("jobs", msg("jobs", "task")).await.unwrap();

        let got_a = tokio::time::timeout(std::time::Duration::from_millis(20), a.next()).await;
        let got_b = tokio::time::timeout(std::time::Duration::from_millis(20), b.next()).await;
        let delivered = got_a.map(|m| m.is_some()).unwrap_or(false) as u8 + got_b.map(|m| m.is_some()).unwrap_or(false) as u8;
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_not_an_error() {
        let pubsub = LocalPubsub::new();
        pubsub.publish("nobody-listening", msg("x", "y")).await.unwrap();
    }
}
