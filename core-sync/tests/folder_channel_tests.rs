//! Integration tests for the push-fed folder channel
//!
//! - listing updates replace and sort the observable listing
//! - navigation waits for the channel, sends the change request and fetches metadata
//! - navigation on a closed channel contacts nothing

mod common;

use bridge_traits::ChannelState;
use common::{FakeConnector, FakePushChannel, FakeServer};
use core_runtime::events::{CoreEvent, EventBus, FolderEvent};
use core_runtime::state::SharedState;
use core_sync::{FolderSyncChannel, SyncError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    channel: FolderSyncChannel,
    push: Arc<FakePushChannel>,
    connector: Arc<FakeConnector>,
    server: Arc<FakeServer>,
    shared: SharedState,
    bus: EventBus,
}

fn harness(server: FakeServer, push: Arc<FakePushChannel>) -> Harness {
    let server = Arc::new(server);
    let connector = Arc::new(FakeConnector::new(push.clone()));
    let (shared, writers) = SharedState::new();
    let bus = EventBus::new(64);
    let channel = FolderSyncChannel::new(
        server.clone(),
        connector.clone(),
        writers.current_folder,
        writers.listing,
        bus.clone(),
    );
    Harness {
        channel,
        push,
        connector,
        server,
        shared,
        bus,
    }
}

#[tokio::test]
async fn test_open_is_idempotent() {
    let h = harness(FakeServer::new(), FakePushChannel::new(ChannelState::Open));

    h.channel.open(0).await.unwrap();
    h.channel.open(9).await.unwrap();

    assert_eq!(h.connector.open_count(), 1);
    assert_eq!(
        h.connector.urls.lock().unwrap()[0],
        "ws://files.test/ws/fileList?id=0"
    );
    assert_eq!(h.channel.channel_state(), ChannelState::Open);
}

#[tokio::test]
async fn test_pushed_listing_is_sorted() {
    let h = harness(FakeServer::new(), FakePushChannel::new(ChannelState::Open));
    h.channel.open(0).await.unwrap();

    h.push.push(
        r#"[{"type":"file","id":1,"name":"c"},
            {"type":"folder","id":2,"name":"b"},
            {"type":"file","id":3,"name":"a"}]"#,
    );

    let listing = tokio::time::timeout(
        Duration::from_secs(1),
        h.shared.listing.wait_for(|entries| !entries.is_empty()),
    )
    .await
    .unwrap()
    .unwrap();
    let names: Vec<&str> = listing.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
}

#[tokio::test]
async fn test_last_message_wins_and_malformed_is_dropped() {
    let h = harness(FakeServer::new(), FakePushChannel::new(ChannelState::Open));
    let mut events = h.bus.subscribe();
    h.channel.open(0).await.unwrap();

    h.push.push(r#"[{"type":"file","id":1,"name":"first"}]"#);
    h.push.push("not a listing");
    h.push.push(r#"[{"type":"file","id":2,"name":"second"},{"type":"file","id":3,"name":"third"}]"#);

    let mut rejected = 0;
    let mut updates = Vec::new();
    while updates.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            CoreEvent::Folder(FolderEvent::ListingUpdated { entries }) => updates.push(entries),
            CoreEvent::Folder(FolderEvent::ListingRejected { .. }) => rejected += 1,
            _ => {}
        }
    }

    assert_eq!(updates, vec![1, 2]);
    assert_eq!(rejected, 1);
    let names: Vec<String> = h
        .shared
        .listing
        .get()
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    assert_eq!(names, vec!["second", "third"]);
}

#[tokio::test]
async fn test_navigate_on_closed_channel_contacts_nothing() {
    let h = harness(FakeServer::new(), FakePushChannel::new(ChannelState::Closed));
    h.channel.open(0).await.unwrap();

    let err = h.channel.navigate(5).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::ChannelNotReady {
            state: ChannelState::Closed
        }
    ));
    assert!(h.push.sent().is_empty());
    assert_eq!(h.server.metadata_calls.load(Ordering::SeqCst), 0);
    assert!(h.shared.current_folder.get().is_none());
}

#[tokio::test]
async fn test_navigate_on_closing_channel_is_not_ready() {
    let h = harness(FakeServer::new(), FakePushChannel::new(ChannelState::Closing));
    h.channel.open(0).await.unwrap();

    let err = h.channel.navigate(5).await.unwrap_err();
    assert!(err.is_channel_not_ready());
    assert_eq!(h.server.metadata_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_navigate_sends_request_and_updates_current_folder() {
    let h = harness(FakeServer::new(), FakePushChannel::new(ChannelState::Open));
    let mut events = h.bus.subscribe();
    h.channel.open(0).await.unwrap();

    let folder = h.channel.navigate(42).await.unwrap();

    assert_eq!(folder.id, 42);
    assert_eq!(folder.path.len(), 2);
    assert_eq!(h.push.sent(), vec![r#"{"action":"change_folder","id":42}"#.to_string()]);
    assert_eq!(h.shared.current_folder.get(), Some(folder.clone()));

    loop {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        if let CoreEvent::Folder(FolderEvent::Navigated { folder_id, name }) = event {
            assert_eq!(folder_id, 42);
            assert_eq!(name, "folder-42");
            break;
        }
    }
}

#[tokio::test]
async fn test_navigate_waits_for_connecting_channel() {
    let h = harness(
        FakeServer::new(),
        FakePushChannel::new(ChannelState::Connecting),
    );
    h.channel.open(0).await.unwrap();

    let channel = h.channel.clone();
    let navigation = tokio::spawn(async move { channel.navigate(7).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!navigation.is_finished());
    assert_eq!(h.server.metadata_calls.load(Ordering::SeqCst), 0);

    h.push.set_state(ChannelState::Open);
    let folder = tokio::time::timeout(Duration::from_secs(1), navigation)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(folder.id, 7);
    assert_eq!(h.push.sent().len(), 1);
}

#[tokio::test]
async fn test_connecting_channel_that_closes_is_not_ready() {
    let h = harness(
        FakeServer::new(),
        FakePushChannel::new(ChannelState::Connecting),
    );
    h.channel.open(0).await.unwrap();

    let channel = h.channel.clone();
    let navigation = tokio::spawn(async move { channel.navigate(7).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.push.set_state(ChannelState::Closed);

    let err = navigation.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        SyncError::ChannelNotReady {
            state: ChannelState::Closed
        }
    ));
    assert_eq!(h.server.metadata_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_send_does_not_fail_navigation() {
    let h = harness(
        FakeServer::new(),
        FakePushChannel::failing_sends(ChannelState::Open),
    );
    h.channel.open(0).await.unwrap();

    let folder = h.channel.navigate(3).await.unwrap();
    assert_eq!(folder.id, 3);
    assert!(h.push.sent().is_empty());
}

#[tokio::test]
async fn test_listing_may_arrive_before_navigation_completes() {
    let h = harness(
        FakeServer::new().with_metadata_delay(Duration::from_millis(100)),
        FakePushChannel::new(ChannelState::Open),
    );
    h.channel.open(0).await.unwrap();

    let channel = h.channel.clone();
    let navigation = tokio::spawn(async move { channel.navigate(8).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    h.push.push(r#"[{"type":"file","id":80,"name":"inside"}]"#);
    h.shared
        .listing
        .wait_for(|entries| entries.len() == 1)
        .await
        .unwrap();
    assert!(h.shared.current_folder.get().is_none());

    navigation.await.unwrap().unwrap();
    assert_eq!(h.shared.current_folder.get().map(|f| f.id), Some(8));
}

#[tokio::test]
async fn test_channel_state_changes_are_forwarded() {
    let h = harness(
        FakeServer::new(),
        FakePushChannel::new(ChannelState::Connecting),
    );
    let mut events = h.bus.subscribe();
    h.channel.open(0).await.unwrap();

    h.push.set_state(ChannelState::Open);

    loop {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        if let CoreEvent::Folder(FolderEvent::ChannelStateChanged { state }) = event {
            assert_eq!(state, ChannelState::Open);
            break;
        }
    }
}

#[tokio::test]
async fn test_overlapping_navigation_keeps_latest_folder() {
    let h = harness(
        FakeServer::new().with_folder_delay(1, Duration::from_millis(150)),
        FakePushChannel::new(ChannelState::Open),
    );
    let mut events = h.bus.subscribe();
    h.channel.open(0).await.unwrap();

    let channel = h.channel.clone();
    let slow = tokio::spawn(async move { channel.navigate(1).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let latest = h.channel.navigate(2).await.unwrap();
    assert_eq!(latest.id, 2);

    let stale = tokio::time::timeout(Duration::from_secs(1), slow)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stale.id, 1);
    assert_eq!(h.shared.current_folder.get().map(|f| f.id), Some(2));
    assert_eq!(
        h.push.sent(),
        vec![
            r#"{"action":"change_folder","id":1}"#.to_string(),
            r#"{"action":"change_folder","id":2}"#.to_string()
        ]
    );

    let mut navigated = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Folder(FolderEvent::Navigated { folder_id, .. }) = event {
            navigated.push(folder_id);
        }
    }
    assert_eq!(navigated, vec![2]);
}
