//! Socket session tests
//!
//! A `SocketSession` is driven directly with an in-memory channel standing in
//! for the websocket writer.

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use crate::common::{TestApp, TestUser};
use teamchat::backend::middleware::AuthenticatedUser;
use teamchat::backend::realtime::socket::OUTBOUND_CAPACITY;
use teamchat::backend::realtime::SocketSession;
use teamchat::shared::event::PresenceEntry;
use teamchat::shared::{ClientEvent, ServerEvent};

struct Client {
    session: SocketSession,
    rx: mpsc::Receiver<ServerEvent>,
}

fn connect(app: &TestApp, user: &TestUser) -> Client {
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let identity = AuthenticatedUser {
        user_id: user.id,
        is_admin: false,
    };
    Client {
        session: SocketSession::new(app.state.clone(), identity, tx),
        rx,
    }
}

impl Client {
    /// Skip events until one matches, failing after one second
    async fn expect(&mut self, mut matches: impl FnMut(&ServerEvent) -> bool) -> ServerEvent {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            let event = tokio::time::timeout_at(deadline, self.rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("socket channel closed");
            if matches(&event) {
                return event;
            }
        }
    }

    /// Nothing matching arrives within a short grace period
    async fn expect_none(&mut self, mut matches: impl FnMut(&ServerEvent) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(100);
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, self.rx.recv()).await {
            assert!(!matches(&event), "unexpected event {:?}", event);
        }
    }
}

fn presence_of(user: &TestUser, status: &'static str) -> impl Fn(&ServerEvent) -> bool {
    let user_id = user.id;
    move |event| matches!(event, ServerEvent::PresenceUpdate(p) if p.user_id == user_id && p.status == status)
}

#[tokio::test]
async fn join_requires_membership() {
    let app = TestApp::new().await;
    let member = app.user("Member").await;
    let outsider = app.user("Outsider").await;
    let group = app.group("general", &[&member]).await;

    let mut client = connect(&app, &outsider);
    client.session.handle_event(ClientEvent::JoinGroup(group)).await;

    let event = client.expect(|e| matches!(e, ServerEvent::Error { .. })).await;
    assert_matches!(event, ServerEvent::Error { message } if message.contains("not a member"));
    assert_eq!(client.session.joined_rooms().count(), 0);
    assert_eq!(app.state.rooms.subscriber_count(group), 0);
}

#[tokio::test]
async fn joined_room_events_are_forwarded_until_leave() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;

    let mut client = connect(&app, &yara);
    client.session.handle_event(ClientEvent::JoinGroup(group)).await;
    // joining twice keeps a single subscription
    client.session.handle_event(ClientEvent::JoinGroup(group)).await;
    assert_eq!(app.state.rooms.subscriber_count(group), 1);

    app.server
        .post(&format!("/api/messages/{}", group))
        .authorization_bearer(&xena.token)
        .json(&serde_json::json!({ "content": "first" }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    let event = client.expect(|e| matches!(e, ServerEvent::MessageNew(_))).await;
    assert_matches!(event, ServerEvent::MessageNew(m) if m.content == "first");

    client.session.handle_event(ClientEvent::LeaveGroup(group)).await;
    app.server
        .post(&format!("/api/messages/{}", group))
        .authorization_bearer(&xena.token)
        .json(&serde_json::json!({ "content": "second" }))
        .await;
    client.expect_none(|e| matches!(e, ServerEvent::MessageNew(_))).await;
}

#[tokio::test]
async fn presence_is_counted_per_session() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let watcher = app.user("Watcher").await;

    let mut observer = connect(&app, &watcher);
    let mut laptop = connect(&app, &xena);
    let mut phone = connect(&app, &xena);

    laptop.session.handle_event(ClientEvent::PresenceOnline { status: None }).await;
    observer.expect(presence_of(&xena, "online")).await;
    let snapshot = laptop
        .expect(|e| matches!(e, ServerEvent::PresenceSnapshot(_)))
        .await;
    assert_eq!(
        snapshot,
        ServerEvent::PresenceSnapshot(teamchat::shared::event::PresenceSnapshot {
            users: vec![PresenceEntry {
                user_id: xena.id,
                status: "online".to_string()
            }]
        })
    );

    // a second session without a status change is silent
    phone.session.handle_event(ClientEvent::PresenceOnline { status: None }).await;
    observer.expect_none(presence_of(&xena, "online")).await;
    assert_eq!(app.state.presence.session_count(), 2);

    phone.session.close();
    observer.expect_none(presence_of(&xena, "offline")).await;
    assert!(app.state.presence.is_online(xena.id));

    drop(laptop);
    observer.expect(presence_of(&xena, "offline")).await;
    assert!(!app.state.presence.is_online(xena.id));
}

#[tokio::test]
async fn status_changes_are_broadcast_once() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let watcher = app.user("Watcher").await;

    let mut observer = connect(&app, &watcher);
    let mut client = connect(&app, &xena);

    client.session.handle_event(ClientEvent::PresenceOnline { status: Some("busy".into()) }).await;
    observer.expect(presence_of(&xena, "busy")).await;

    client.session.handle_event(ClientEvent::PresenceSet { status: "away".into() }).await;
    observer.expect(presence_of(&xena, "away")).await;

    client.session.handle_event(ClientEvent::PresenceSet { status: "away".into() }).await;
    observer.expect_none(presence_of(&xena, "away")).await;

    observer.session.handle_event(ClientEvent::PresenceWho).await;
    let snapshot = observer
        .expect(|e| matches!(e, ServerEvent::PresenceSnapshot(_)))
        .await;
    assert_matches!(
        snapshot,
        ServerEvent::PresenceSnapshot(s) if s.users == vec![PresenceEntry { user_id: xena.id, status: "away".into() }]
    );
}

#[tokio::test]
async fn ping_and_bad_frames() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let mut client = connect(&app, &xena);

    client.session.handle_frame(r#"{"event":"ping"}"#).await;
    assert_eq!(client.expect(|_| true).await, ServerEvent::Pong);

    client.session.handle_frame("not json").await;
    let event = client.expect(|_| true).await;
    assert_matches!(event, ServerEvent::Error { message } if message.starts_with("invalid frame"));

    client.session.handle_frame(r#"{"event":"group:join","data":"nope"}"#).await;
    assert_matches!(client.expect(|_| true).await, ServerEvent::Error { .. });
}
