//! HTTP server integration tests
//!
//! Runs the full Axum application on a local port with chat membership
//! answered by a mocked REST directory, then talks to it over HTTP and
//! WebSocket.

use chathub::backend::{create_app, Hub, ServerConfig};
use chathub::client::{HubSession, ReconnectPolicy, WsConnector};
use chathub::shared::{AddMessageDto, ChatMessage, HubConfig, HubEvent};
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{token, ROOM, SECRET};

const WAIT: Duration = Duration::from_secs(10);

struct TestServer {
    addr: SocketAddr,
    hub: Arc<Hub>,
    _directory: MockServer,
}

impl TestServer {
    fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn session(&self, user_id: i64) -> HubSession {
        let connector = WsConnector::new(&format!("ws://{}/hubs/message", self.addr))
            .expect("Failed to build connector");
        HubSession::new(
            connector,
            move || Some(token(user_id)),
            ReconnectPolicy::new(Duration::from_millis(20), Duration::from_millis(200)),
        )
    }
}

/// Users 1 and 2 are members of room 7; everything else is unknown
async fn start_server() -> TestServer {
    let directory = MockServer::start().await;
    for user in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path("/chat-user/is-member"))
            .and(query_param("chatId", ROOM.to_string()))
            .and(query_param("userId", user))
            .respond_with(ResponseTemplate::new(200).set_body_json(true))
            .mount(&directory)
            .await;
    }
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&directory)
        .await;

    let config = ServerConfig {
        port: 0,
        database_url: Some("sqlite::memory:".to_string()),
        jwt_secret: SECRET.to_string(),
        chat_directory_url: Some(directory.uri()),
        chat_directory_token: None,
        hub: HubConfig::default(),
    };
    let (app, hub) = create_app(&config).await.expect("Failed to create app");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        hub,
        _directory: directory,
    }
}

#[tokio::test]
async fn test_health_and_stats() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let health = client.get(server.http("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "ok");

    let stats: serde_json::Value = client
        .get(server.http("/api/hub/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["connections"], 0);

    let missing = client.get(server.http("/nope")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_requires_token_and_membership() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let url = server.http(&format!("/api/chats/{}/history", ROOM));

    let anonymous = client.get(&url).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let outsider = client.get(&url).bearer_auth(token(3)).send().await.unwrap();
    assert_eq!(outsider.status(), StatusCode::FORBIDDEN);

    let member = client.get(&url).bearer_auth(token(1)).send().await.unwrap();
    assert_eq!(member.status(), StatusCode::OK);
    let history: Vec<ChatMessage> = member.json().await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_messages_flow_over_websocket() {
    let server = start_server().await;
    let alice = server.session(1);
    let bob = server.session(2);
    alice.start().await;
    bob.start().await;
    alice.wait_connected(WAIT).await.unwrap();
    bob.wait_connected(WAIT).await.unwrap();
    alice.join(ROOM).await.unwrap();
    bob.join(ROOM).await.unwrap();
    assert_eq!(server.hub.members_of(ROOM).await.len(), 2);

    let mut events = bob.subscribe();
    let id = alice
        .send_message(AddMessageDto::text(ROOM, 1, "over the wire"))
        .await
        .unwrap();
    let event = timeout(WAIT, events.next()).await.unwrap().unwrap().unwrap();
    assert!(matches!(event, HubEvent::ReceiveMessage(ref message) if message.id == id));

    alice.delete_message(id).await.unwrap();
    let event = timeout(WAIT, events.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(event, HubEvent::OnMessageDeleted(ROOM, id));

    let history: Vec<ChatMessage> = reqwest::Client::new()
        .get(server.http(&format!("/api/chats/{}/history", ROOM)))
        .bearer_auth(token(2))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_deleted);

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn test_websocket_rejects_bad_token() {
    let server = start_server().await;
    let connector = WsConnector::new(&format!("ws://{}/hubs/message", server.addr)).unwrap();
    let session = HubSession::new(
        connector,
        || Some("forged".to_string()),
        ReconnectPolicy::new(Duration::from_millis(20), Duration::from_millis(20)).with_max_attempts(1),
    );
    let mut notices = session.notices();
    session.start().await;

    let notice = timeout(WAIT, notices.recv()).await.unwrap().unwrap();
    assert!(matches!(
        notice,
        chathub::client::SessionNotice::AttemptFailed {
            error: chathub::shared::HubError::AuthenticationError { .. },
            ..
        }
    ));
    assert_eq!(server.hub.stats().await.connections, 0);
}
