//! Client session tests against a mocked REST server

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use teamchat::client::{ApiClient, ChatSession, ClientError, Config, LocalPrefs};
use teamchat::shared::config::AppConfig;
use teamchat::shared::messaging::{AuthorSummary, GroupSummary, MarkReadResponse, Message, MessageType};
use teamchat::shared::ServerEvent;

const TOKEN: &str = "test-token";

fn client_for(server: &MockServer) -> ApiClient {
    let mut config = Config::with_builder(AppConfig::builder().server_url(server.uri()).page_size(20))
        .expect("valid config");
    config.set_token(Some(TOKEN.to_string()));
    ApiClient::new(config)
}

fn message(group_id: Uuid, author_id: Uuid, content: &str, seconds_ago: i64) -> Message {
    Message {
        id: Uuid::new_v4(),
        group_id,
        author_id,
        author: AuthorSummary {
            id: author_id,
            name: "Someone".to_string(),
            avatar_url: None,
        },
        kind: MessageType::Text,
        content: content.to_string(),
        reply_to_id: None,
        reply_to: None,
        reply_count: 0,
        reactions: Vec::new(),
        reaction_summary: Vec::new(),
        read_by: Vec::new(),
        edited_at: None,
        deleted_at: None,
        created_at: Utc::now() - Duration::seconds(seconds_ago),
    }
}

fn group(id: Uuid, name: &str, unread: u32) -> GroupSummary {
    GroupSummary {
        id,
        name: name.to_string(),
        is_private: false,
        last_message_at: Some(Utc::now() - Duration::minutes(1)),
        unread,
        mentions: 0,
    }
}

async fn mount_sidebar(server: &MockServer, groups: Vec<GroupSummary>) {
    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(groups))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn api_errors_carry_server_text() {
    let server = MockServer::start().await;
    let group_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", group_id)))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "error": "not a member of this group", "status": 403 })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_messages(group_id, None, None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(matches!(err, ClientError::Api { ref message, .. } if message == "not a member of this group"));
}

#[tokio::test]
async fn requests_need_a_token() {
    let server = MockServer::start().await;
    let config = Config::with_builder(AppConfig::builder().server_url(server.uri())).expect("valid config");
    let err = ApiClient::new(config).groups().await.unwrap_err();
    assert!(matches!(err, ClientError::NotAuthenticated));
}

#[tokio::test]
async fn opening_a_conversation_loads_and_marks_read() {
    let server = MockServer::start().await;
    let viewer = Uuid::new_v4();
    let sender = Uuid::new_v4();
    let group_id = Uuid::new_v4();
    mount_sidebar(&server, vec![group(group_id, "general", 3)]).await;

    let page = vec![
        message(group_id, sender, "three", 1),
        message(group_id, sender, "two", 2),
        message(group_id, sender, "one", 3),
    ];
    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", group_id)))
        .and(query_param("take", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&page))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 3 }))
        .expect(1)
        .mount(&server)
        .await;

    let prefs = LocalPrefs::in_memory().await.expect("prefs");
    let mut session = ChatSession::new(client_for(&server), viewer, prefs);
    session.refresh_sidebar().await.expect("sidebar");
    assert_eq!(session.sidebar_rows().await.expect("rows")[0].unread, 3);

    session.open_conversation(group_id).await.expect("open");

    let contents: Vec<&str> = session
        .conversation()
        .expect("open conversation")
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
    assert_eq!(session.sidebar_rows().await.expect("rows")[0].unread, 0);
    assert!(!session.conversation().expect("open conversation").has_more());
}

#[tokio::test]
async fn older_pages_prepend_until_history_runs_out() {
    let server = MockServer::start().await;
    let viewer = Uuid::new_v4();
    let sender = Uuid::new_v4();
    let group_id = Uuid::new_v4();
    mount_sidebar(&server, vec![group(group_id, "general", 0)]).await;

    let newest: Vec<Message> = (1..=20).map(|s| message(group_id, sender, &format!("m{}", s), s)).collect();
    let older: Vec<Message> = (21..=23).map(|s| message(group_id, sender, &format!("m{}", s), s)).collect();
    let oldest_loaded = newest[19].id;

    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", group_id)))
        .and(query_param("cursor", oldest_loaded.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&older))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&newest))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 0 }))
        .mount(&server)
        .await;

    let prefs = LocalPrefs::in_memory().await.expect("prefs");
    let mut session = ChatSession::new(client_for(&server), viewer, prefs);
    session.refresh_sidebar().await.expect("sidebar");
    session.open_conversation(group_id).await.expect("open");
    assert!(session.conversation().expect("open").has_more());

    assert_eq!(session.load_older().await.expect("older"), 3);
    let conversation = session.conversation().expect("open");
    assert_eq!(conversation.messages().len(), 23);
    assert_eq!(conversation.messages()[0].content, "m23");
    assert!(!conversation.has_more());

    assert_eq!(session.load_older().await.expect("nothing left"), 0);
}

#[tokio::test]
async fn live_messages_mark_read_only_when_open() {
    let server = MockServer::start().await;
    let viewer = Uuid::new_v4();
    let sender = Uuid::new_v4();
    let (open_id, other_id) = (Uuid::new_v4(), Uuid::new_v4());
    mount_sidebar(&server, vec![group(open_id, "general", 0), group(other_id, "random", 0)]).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", open_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    // once on open, once for the live message
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", open_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 0 }))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", other_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 0 }))
        .expect(0)
        .mount(&server)
        .await;

    let prefs = LocalPrefs::in_memory().await.expect("prefs");
    let mut session = ChatSession::new(client_for(&server), viewer, prefs);
    session.refresh_sidebar().await.expect("sidebar");
    session.open_conversation(open_id).await.expect("open");

    let here = message(open_id, sender, "in the open room", 0);
    let elsewhere = message(other_id, sender, "somewhere else", 0);
    session.handle_event(&ServerEvent::MessageNew(here.clone())).await.expect("event");
    session.handle_event(&ServerEvent::MessageNew(elsewhere)).await.expect("event");

    assert!(session.conversation().expect("open").contains(here.id));
    assert_eq!(session.sidebar().get(open_id).map(|e| e.unread), Some(0));
    assert_eq!(session.sidebar().get(other_id).map(|e| e.unread), Some(1));
    assert_eq!(
        session.sidebar().get(other_id).and_then(|e| e.preview.clone()),
        Some("somewhere else".to_string())
    );
}

#[tokio::test]
async fn repeated_delivery_is_counted_once() {
    let server = MockServer::start().await;
    let viewer = Uuid::new_v4();
    let (open_id, other_id) = (Uuid::new_v4(), Uuid::new_v4());
    mount_sidebar(&server, vec![group(open_id, "general", 0), group(other_id, "random", 2)]).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", open_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    // once on open, once for the first delivery only
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", open_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 0 }))
        .expect(2)
        .mount(&server)
        .await;

    let prefs = LocalPrefs::in_memory().await.expect("prefs");
    let mut session = ChatSession::new(client_for(&server), viewer, prefs);
    session.refresh_sidebar().await.expect("sidebar");
    session.open_conversation(open_id).await.expect("open");

    let elsewhere = ServerEvent::MessageNew(message(other_id, Uuid::new_v4(), "again?", 0));
    let here = ServerEvent::MessageNew(message(open_id, Uuid::new_v4(), "hello", 0));
    for _ in 0..2 {
        session.handle_event(&elsewhere).await.expect("event");
        session.handle_event(&here).await.expect("event");
    }

    assert_eq!(session.sidebar().get(other_id).map(|e| e.unread), Some(3));
    assert_eq!(session.conversation().expect("open").messages().len(), 1);
}

#[tokio::test]
async fn sent_message_and_its_echo_are_not_duplicated() {
    let server = MockServer::start().await;
    let viewer = Uuid::new_v4();
    let group_id = Uuid::new_v4();
    mount_sidebar(&server, vec![group(group_id, "general", 0)]).await;

    let sent = message(group_id, viewer, "hello", 0);
    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 0 }))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}", group_id)))
        .respond_with(ResponseTemplate::new(201).set_body_json(&sent))
        .expect(1)
        .mount(&server)
        .await;

    let prefs = LocalPrefs::in_memory().await.expect("prefs");
    let mut session = ChatSession::new(client_for(&server), viewer, prefs);

    let err = session.send_text("too early", None).await.unwrap_err();
    assert!(matches!(err, ClientError::NoConversation));

    session.refresh_sidebar().await.expect("sidebar");
    session.open_conversation(group_id).await.expect("open");
    let returned = session.send_text("hello", None).await.expect("send");
    assert_eq!(returned.id, sent.id);

    session.handle_event(&ServerEvent::MessageNew(sent.clone())).await.expect("echo");
    assert_eq!(session.conversation().expect("open").messages().len(), 1);
    assert_eq!(
        session.sidebar().get(group_id).and_then(|e| e.preview.clone()),
        Some("You: hello".to_string())
    );
}

#[tokio::test]
async fn manual_unread_is_local_and_cleared_on_open() {
    let server = MockServer::start().await;
    let viewer = Uuid::new_v4();
    let group_id = Uuid::new_v4();
    mount_sidebar(&server, vec![group(group_id, "general", 0)]).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/messages/{}", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/messages/{}/read", group_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MarkReadResponse { ok: true, marked: 0 }))
        .mount(&server)
        .await;

    let prefs = LocalPrefs::in_memory().await.expect("prefs");
    let mut session = ChatSession::new(client_for(&server), viewer, prefs);
    session.refresh_sidebar().await.expect("sidebar");

    session.mark_unread(group_id).await.expect("flag");
    assert_eq!(session.sidebar_rows().await.expect("rows")[0].unread, 1);

    session.open_conversation(group_id).await.expect("open");
    session.close_conversation();
    assert_eq!(session.sidebar_rows().await.expect("rows")[0].unread, 0);
}
