//! Client session integration tests
//!
//! A `HubSession` talking to a real hub through the in-process connector.

use assert_matches::assert_matches;
use chathub::client::{HubSession, InProcessConnector, ReconnectPolicy, SessionNotice, SessionState};
use chathub::shared::{AddMessageDto, HubError, HubEvent};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;

use crate::common::{test_hub, token, TestHub, ROOM};

const WAIT: Duration = Duration::from_secs(5);

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy::new(Duration::from_millis(10), Duration::from_millis(100))
}

fn session_for(t: &TestHub, user_id: i64) -> HubSession {
    HubSession::new(
        InProcessConnector::new(t.hub.clone()),
        move || Some(token(user_id)),
        fast_policy(),
    )
}

#[tokio::test]
async fn test_session_lifecycle_round_trip() {
    let t = test_hub().await;
    let alice = session_for(&t, 1);
    let bob = session_for(&t, 2);
    assert_eq!(alice.state(), SessionState::Disconnected);

    alice.start().await;
    bob.start().await;
    alice.wait_connected(WAIT).await.unwrap();
    bob.wait_connected(WAIT).await.unwrap();
    bob.join(ROOM).await.unwrap();

    let mut events = bob.subscribe();
    let id = alice
        .send_message(AddMessageDto::text(ROOM, 1, "hello"))
        .await
        .unwrap();
    alice.edit_message(id, "hello, edited").await.unwrap();
    alice.delete_message(id).await.unwrap();

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(timeout(WAIT, events.next()).await.unwrap().unwrap().unwrap());
    }
    assert_matches!(&received[0], HubEvent::ReceiveMessage(message) if message.id == id);
    assert_eq!(received[1], HubEvent::OnMessageEdited(id, "hello, edited".to_string()));
    assert_eq!(received[2], HubEvent::OnMessageDeleted(ROOM, id));

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn test_bob_cannot_delete_alices_message() {
    let t = test_hub().await;
    let alice = session_for(&t, 1);
    let bob = session_for(&t, 2);
    alice.start().await;
    bob.start().await;
    alice.wait_connected(WAIT).await.unwrap();
    bob.wait_connected(WAIT).await.unwrap();

    let id = alice
        .send_message(AddMessageDto::text(ROOM, 1, "mine"))
        .await
        .unwrap();
    assert_matches!(
        bob.delete_message(id).await,
        Err(HubError::AuthorizationError { .. })
    );
    assert_matches!(
        bob.delete_message(id + 1000).await,
        Err(HubError::NotFoundError { .. })
    );

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn test_session_recovers_after_hub_drops_connection() {
    let t = test_hub().await;
    let session = session_for(&t, 2);
    let mut notices = session.notices();
    session.start().await;
    session.join(ROOM).await.unwrap();

    let first = session.wait_connected(WAIT).await.unwrap();
    assert_matches!(notices.recv().await.unwrap(), SessionNotice::Connected(id) if id == first);

    t.hub.disconnect(first, "maintenance").await;
    assert_matches!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        SessionNotice::Disconnected { reason } if reason == "maintenance"
    );
    let second = match timeout(WAIT, notices.recv()).await.unwrap().unwrap() {
        SessionNotice::Connected(id) => id,
        other => panic!("Expected Connected, got {:?}", other),
    };
    assert_ne!(first, second);

    timeout(WAIT, async {
        while !t.hub.members_of(ROOM).await.contains(&second) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(!t.hub.members_of(ROOM).await.contains(&first));

    session.stop().await;
}

#[tokio::test]
async fn test_stop_unregisters_from_hub() {
    let t = test_hub().await;
    let session = session_for(&t, 1);
    session.start().await;
    session.join(ROOM).await.unwrap();
    let id = session.wait_connected(WAIT).await.unwrap();

    session.stop().await;
    timeout(WAIT, async {
        while t.hub.lookup(id).await.is_ok() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(t.hub.members_of(ROOM).await.is_empty());
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_invalid_token_is_reported_per_attempt() {
    let t = test_hub().await;
    let session = HubSession::new(
        InProcessConnector::new(t.hub.clone()),
        || Some("not-a-jwt".to_string()),
        fast_policy().with_max_attempts(3),
    );
    let mut notices = session.notices();
    session.start().await;

    for attempt in 1..=3 {
        assert_matches!(
            timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
            SessionNotice::AttemptFailed { attempt: n, error: HubError::AuthenticationError { .. } } if n == attempt
        );
    }
    assert_matches!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        SessionNotice::Disconnected { .. }
    );
    assert_eq!(t.hub.stats().await.connections, 0);
}

#[tokio::test]
async fn test_hub_shutdown_ends_sessions() {
    let t = test_hub().await;
    let session = HubSession::new(
        InProcessConnector::new(t.hub.clone()),
        || Some(token(1)),
        fast_policy().with_max_attempts(1),
    );
    let mut notices = session.notices();
    session.start().await;
    session.wait_connected(WAIT).await.unwrap();
    assert_matches!(notices.recv().await.unwrap(), SessionNotice::Connected(_));

    t.hub.shutdown().await;
    assert_matches!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        SessionNotice::Disconnected { .. }
    );
    assert_matches!(
        timeout(WAIT, notices.recv()).await.unwrap().unwrap(),
        SessionNotice::AttemptFailed { error: HubError::TransportError { .. }, .. }
    );
}
