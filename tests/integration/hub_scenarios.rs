//! Hub scenario tests
//!
//! Room membership, ordered fan-out and the message lifecycle, driven
//! through the public `Hub` API with raw mailboxes as connections.

use assert_matches::assert_matches;
use chathub::backend::persistence::MessageStore;
use chathub::shared::message::TOMBSTONE;
use chathub::shared::{AddMessageDto, HubError, HubEvent, UpdateMessageDto};
use pretty_assertions::assert_eq;
use std::sync::Arc;

use crate::common::{connect, jittery_hub, test_hub, OTHER_ROOM, ROOM};

#[tokio::test]
async fn test_hello_then_delete_leaves_tombstone() {
    let t = test_hub().await;
    let mut c1 = connect(&t.hub, 1).await;
    let mut c2 = connect(&t.hub, 2).await;
    t.hub.join(c1.id, ROOM).await.unwrap();
    t.hub.join(c2.id, ROOM).await.unwrap();

    let stored = t
        .hub
        .send_message(c1.id, AddMessageDto::text(ROOM, 1, "hello"))
        .await
        .unwrap();

    for peer in [&mut c1, &mut c2] {
        assert_matches!(
            peer.drain_events().as_slice(),
            [HubEvent::ReceiveMessage(message)] if message.content == "hello" && message.id == stored.id
        );
    }

    t.hub.delete_message(c1.id, stored.id).await.unwrap();
    for peer in [&mut c1, &mut c2] {
        assert_eq!(
            peer.drain_events(),
            vec![HubEvent::OnMessageDeleted(ROOM, stored.id)]
        );
    }

    let history = t.hub.history(c2.id, ROOM).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_deleted);
    assert_eq!(history[0].content, TOMBSTONE);
    assert_eq!(history[0].id, stored.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_arrive_in_commit_order() {
    let t = jittery_hub().await;
    let author = connect(&t.hub, 1).await;
    let mut watcher = connect(&t.hub, 2).await;
    t.hub.join(watcher.id, ROOM).await.unwrap();

    let mut seeded = Vec::new();
    for n in 0..10 {
        let stored = t
            .hub
            .send_message(author.id, AddMessageDto::text(ROOM, 1, format!("seed {}", n)))
            .await
            .unwrap();
        seeded.push(stored.id);
    }
    watcher.drain_events();
    t.store.take_commits().await;

    let mut tasks = Vec::new();
    for n in 0..20 {
        let hub = t.hub.clone();
        let id = author.id;
        tasks.push(tokio::spawn(async move {
            hub.send_message(id, AddMessageDto::text(ROOM, 1, format!("m{}", n)))
                .await
                .map(|_| ())
        }));
    }
    for (n, message_id) in seeded.iter().copied().enumerate() {
        let hub = t.hub.clone();
        let id = author.id;
        tasks.push(tokio::spawn(async move {
            if n % 2 == 0 {
                let dto = UpdateMessageDto {
                    id: message_id,
                    content: format!("edit {}", n),
                };
                hub.edit_message(id, dto).await.map(|_| ())
            } else {
                hub.delete_message(id, message_id).await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let committed = t.store.take_commits().await;
    assert_eq!(committed.len(), 30);
    assert_eq!(watcher.drain_events(), committed);
}

#[tokio::test]
async fn test_join_is_idempotent() {
    let t = test_hub().await;
    let mut c = connect(&t.hub, 2).await;

    assert!(t.hub.join(c.id, ROOM).await.unwrap());
    assert!(!t.hub.join(c.id, ROOM).await.unwrap());
    assert_eq!(t.hub.members_of(ROOM).await, vec![c.id]);

    let sender = connect(&t.hub, 1).await;
    t.hub
        .send_message(sender.id, AddMessageDto::text(ROOM, 1, "once"))
        .await
        .unwrap();
    assert_eq!(c.drain_events().len(), 1);
}

#[tokio::test]
async fn test_unregister_removes_every_membership() {
    let t = test_hub().await;
    let c = connect(&t.hub, 1).await;
    let other = connect(&t.hub, 2).await;
    t.hub.join(c.id, ROOM).await.unwrap();
    t.hub.join(c.id, OTHER_ROOM).await.unwrap();
    t.hub.join(other.id, ROOM).await.unwrap();

    assert!(t.hub.unregister(c.id).await);
    assert!(!t.hub.unregister(c.id).await);

    assert_eq!(t.hub.members_of(ROOM).await, vec![other.id]);
    assert!(t.hub.members_of(OTHER_ROOM).await.is_empty());
    assert_eq!(t.hub.stats().await.rooms, 1);
    assert_matches!(
        t.hub.join(c.id, ROOM).await,
        Err(HubError::NotFoundError { .. })
    );
}

#[tokio::test]
async fn test_empty_content_is_rejected_without_side_effects() {
    let t = test_hub().await;
    let sender = connect(&t.hub, 1).await;
    let mut watcher = connect(&t.hub, 2).await;
    t.hub.join(watcher.id, ROOM).await.unwrap();

    for content in ["", "   ", "\n\t"] {
        let result = t
            .hub
            .send_message(sender.id, AddMessageDto::text(ROOM, 1, content))
            .await;
        assert_matches!(result, Err(HubError::ValidationError { .. }));
    }

    assert!(t.store.is_empty().await);
    assert!(watcher.drain_events().is_empty());
}

#[tokio::test]
async fn test_non_sender_edit_is_rejected() {
    let t = test_hub().await;
    let author = connect(&t.hub, 1).await;
    let other = connect(&t.hub, 2).await;
    let stored = t
        .hub
        .send_message(author.id, AddMessageDto::text(ROOM, 1, "original"))
        .await
        .unwrap();

    let result = t
        .hub
        .edit_message(
            other.id,
            UpdateMessageDto {
                id: stored.id,
                content: "hijacked".to_string(),
            },
        )
        .await;
    assert_matches!(result, Err(HubError::AuthorizationError { .. }));

    let unchanged = t.store.get(stored.id).await.unwrap().unwrap();
    assert_eq!(unchanged.content, "original");
    assert!(unchanged.edited_at.is_none());
}

#[tokio::test]
async fn test_edit_reaches_room_members() {
    let t = test_hub().await;
    let author = connect(&t.hub, 1).await;
    let mut watcher = connect(&t.hub, 3).await;
    t.hub.join(watcher.id, ROOM).await.unwrap();

    let stored = t
        .hub
        .send_message(author.id, AddMessageDto::text(ROOM, 1, "draft"))
        .await
        .unwrap();
    let edited = t
        .hub
        .edit_message(
            author.id,
            UpdateMessageDto {
                id: stored.id,
                content: "final".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(edited.edited_at.is_some());

    let events = watcher.drain_events();
    assert_eq!(
        events.last(),
        Some(&HubEvent::OnMessageEdited(stored.id, "final".to_string()))
    );
}

#[tokio::test]
async fn test_disconnect_without_leave_stops_delivery() {
    let t = test_hub().await;
    let sender = connect(&t.hub, 1).await;
    let mut gone = connect(&t.hub, 2).await;
    let mut stays = connect(&t.hub, 3).await;
    t.hub.join(gone.id, ROOM).await.unwrap();
    t.hub.join(stays.id, ROOM).await.unwrap();

    // The transport goes away before the hub notices
    gone.mailbox.close();

    let result = t
        .hub
        .send_message(sender.id, AddMessageDto::text(ROOM, 1, "still here?"))
        .await;
    assert!(result.is_ok());
    assert_eq!(stays.drain_events().len(), 1);

    t.hub.unregister(gone.id).await;
    t.hub
        .send_message(sender.id, AddMessageDto::text(ROOM, 1, "after"))
        .await
        .unwrap();
    assert_eq!(stays.drain_events().len(), 1);
    assert!(gone.drain_events().is_empty());
}

#[tokio::test]
async fn test_reconnected_connection_must_rejoin() {
    let t = test_hub().await;
    let sender = connect(&t.hub, 1).await;
    let first = connect(&t.hub, 2).await;
    t.hub.join(first.id, ROOM).await.unwrap();

    assert!(t.hub.disconnect(first.id, "forced").await);
    let mut second = connect(&t.hub, 2).await;
    assert_ne!(first.id, second.id);

    t.hub
        .send_message(sender.id, AddMessageDto::text(ROOM, 1, "missed"))
        .await
        .unwrap();
    assert!(second.drain_events().is_empty());

    t.hub.join(second.id, ROOM).await.unwrap();
    t.hub
        .send_message(sender.id, AddMessageDto::text(ROOM, 1, "seen"))
        .await
        .unwrap();
    assert_matches!(
        second.drain_events().as_slice(),
        [HubEvent::ReceiveMessage(message)] if message.content == "seen"
    );
}

#[tokio::test]
async fn test_rooms_do_not_cross_deliver() {
    let t = test_hub().await;
    let sender = connect(&t.hub, 1).await;
    let mut in_seven = connect(&t.hub, 2).await;
    let mut in_eight = connect(&t.hub, 4).await;
    t.hub.join(in_seven.id, ROOM).await.unwrap();
    t.hub.join(in_eight.id, OTHER_ROOM).await.unwrap();

    t.hub
        .send_message(sender.id, AddMessageDto::text(OTHER_ROOM, 1, "eight"))
        .await
        .unwrap();

    assert!(in_seven.drain_events().is_empty());
    assert_eq!(in_eight.drain_events().len(), 1);
}

#[tokio::test]
async fn test_revoked_membership_blocks_submit() {
    let t = test_hub().await;
    let c = connect(&t.hub, 3).await;
    t.directory.remove_member(ROOM, 3).await;

    let result = t
        .hub
        .send_message(c.id, AddMessageDto::text(ROOM, 3, "hi"))
        .await;
    assert_matches!(result, Err(HubError::AuthorizationError { .. }));
}

#[tokio::test]
async fn test_store_outage_aborts_before_dispatch() {
    let t = test_hub().await;
    let sender = connect(&t.hub, 1).await;
    let mut watcher = connect(&t.hub, 2).await;
    t.hub.join(watcher.id, ROOM).await.unwrap();

    t.store.set_unavailable(true);
    let result = t
        .hub
        .send_message(sender.id, AddMessageDto::text(ROOM, 1, "lost"))
        .await;
    assert_matches!(result, Err(HubError::PersistenceError { .. }));
    assert!(watcher.drain_events().is_empty());
}

#[tokio::test]
async fn test_concurrent_joins_and_leaves_across_rooms() {
    let t = test_hub().await;
    let mut tasks = Vec::new();
    for n in 0..32 {
        let hub = Arc::clone(&t.hub);
        tasks.push(tokio::spawn(async move {
            let peer = connect(&hub, 1).await;
            let room = if n % 2 == 0 { ROOM } else { OTHER_ROOM };
            hub.join(peer.id, room).await.unwrap();
            if n % 4 == 0 {
                hub.leave(peer.id, room).await.unwrap();
            }
            peer
        }));
    }
    let mut peers = Vec::new();
    for task in tasks {
        peers.push(task.await.unwrap());
    }

    assert_eq!(t.hub.members_of(ROOM).await.len(), 8);
    assert_eq!(t.hub.members_of(OTHER_ROOM).await.len(), 16);

    for peer in &peers {
        t.hub.unregister(peer.id).await;
    }
    assert_eq!(t.hub.stats().await.rooms, 0);
    assert_eq!(t.hub.stats().await.connections, 0);
}
