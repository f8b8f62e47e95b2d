use bytes::Bytes;
use governor_core::ErrorKind;
use governor_events::{ConsumerOpts, EventStream, LocalEventStream, Msg, StreamOpts};
use tokio_util::sync::CancellationToken;

fn msg(topic: &str, key: &str, value: &str) -> Msg {
    Msg::new(topic, key, Bytes::from(value.to_string()))
}

#[tokio::test]
async fn single_consumer_sees_messages_in_publish_order() {
    let stream = LocalEventStream::new();
    stream.init_stream("orders", StreamOpts::default()).await.unwrap();

    stream
        .publish(vec![msg("orders", "a", "1"), msg("orders", "b", "2"), msg("orders", "c", "3")])
        .await
        .unwrap();

    let sub = stream
        .subscribe("orders", "workers", ConsumerOpts::default())
        .await
        .unwrap();

    for expected in ["a", "b", "c"] {
        let got = sub.read_msg(CancellationToken::new()).await.unwrap();
        assert_eq!(got.key, expected);
        sub.commit(&got).await.unwrap();
    }
}

#[tokio::test]
async fn two_groups_each_see_every_message() {
    let stream = LocalEventStream::new();
    stream.init_stream("orders", StreamOpts::default()).await.unwrap();

    let billing = stream
        .subscribe("orders", "billing", ConsumerOpts::default())
        .await
        .unwrap();
    let shipping = stream
        .subscribe("orders", "shipping", ConsumerOpts::default())
        .await
        .unwrap();

    stream.publish(vec![msg("orders", "a", "1")]).await.unwrap();

    assert_eq!(billing.read_msg(CancellationToken::new()).await.unwrap().key, "a");
    assert_eq!(shipping.read_msg(CancellationToken::new()).await.unwrap().key, "a");
}

#[tokio::test]
async fn read_blocks_until_publish_then_wakes() {
    let stream = LocalEventStream::new();
    stream.init_stream("orders", StreamOpts::default()).await.unwrap();
    let sub = stream
        .subscribe("orders", "workers", ConsumerOpts::default())
        .await
        .unwrap();

    let reader = tokio::spawn(async move { sub.read_msg(CancellationToken::new()).await });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    stream.publish(vec![msg("orders", "late", "v")]).await.unwrap();

    let got = reader.await.unwrap().unwrap();
    assert_eq!(got.key, "late");
}

#[tokio::test]
async fn cancellation_token_interrupts_a_blocked_read() {
    let stream = LocalEventStream::new();
    stream.init_stream("orders", StreamOpts::default()).await.unwrap();
    let sub = stream
        .subscribe("orders", "workers", ConsumerOpts::default())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let reader = tokio::spawn(async move { sub.read_msg(cancel_clone).await });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    cancel.cancel();

    let err = reader.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientClosed);
}

#[tokio::test]
async fn closing_the_active_consumer_hands_off_to_the_next_member() {
    let stream = LocalEventStream::new();
    stream.init_stream("orders", StreamOpts::default()).await.unwrap();

    let first = stream
        .subscribe("orders", "workers", ConsumerOpts::default())
        .await
        .unwrap();
    let second = stream
        .subscribe("orders", "workers", ConsumerOpts::default())
        .await
        .unwrap();

    stream.publish(vec![msg("orders", "a", "1")]).await.unwrap();

    // second isn't active yet; reading with an already-cancelled token makes
    // the call resolve immediately rather than hang, surfacing the
    // unassigned state.
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = second.read_msg(cancel).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartitionUnassigned);

    first.close().await;
    let got = second.read_msg(CancellationToken::new()).await.unwrap();
    assert_eq!(got.key, "a");
}
