//! REST surface tests
//!
//! Drive the real router in-process and observe room events through the
//! broker the handlers publish to.

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::future::IntoFuture;
use uuid::Uuid;

use crate::common::{next_event, TestApp};
use crate::{assert_contains, assert_no_event};
use teamchat::shared::messaging::{
    DeleteResponse, DirectThread, FavoriteEntry, GroupSummary, MarkReadResponse, Message,
    MessageType, ReactionResponse,
};
use teamchat::shared::ServerEvent;

async fn post_text(app: &TestApp, token: &str, group: Uuid, content: &str) -> Message {
    let response = app
        .server
        .post(&format!("/api/messages/{}", group))
        .authorization_bearer(token)
        .json(&json!({ "type": "text", "content": content }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Message>()
}

async fn list(app: &TestApp, token: &str, group: Uuid, take: u32, cursor: Option<Uuid>) -> Vec<Message> {
    let mut request = app
        .server
        .get(&format!("/api/messages/{}", group))
        .authorization_bearer(token)
        .add_query_param("take", take);
    if let Some(cursor) = cursor {
        request = request.add_query_param("cursor", cursor);
    }
    let response = request.await;
    response.assert_status_ok();
    response.json::<Vec<Message>>()
}

#[tokio::test]
async fn create_broadcasts_and_bumps_last_activity() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;
    let mut room = app.subscribe(group);

    let message = post_text(&app, &xena.token, group, "hello").await;
    assert_eq!(message.kind, MessageType::Text);
    assert_eq!(message.content, "hello");
    assert_eq!(message.deleted_at, None);
    assert_eq!(message.author.name, "Xena");

    assert_matches!(next_event(&mut room).await, ServerEvent::MessageNew(m) if m.id == message.id);

    let groups: Vec<GroupSummary> = app
        .server
        .get("/api/groups")
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].last_message_at, Some(message.created_at));
    assert_eq!(groups[0].unread, 1);
}

#[tokio::test]
async fn non_member_cannot_post() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let outsider = app.user("Yusuf").await;
    let group = app.group("general", &[&xena]).await;
    let mut room = app.subscribe(group);

    let response = app
        .server
        .post(&format!("/api/messages/{}", group))
        .authorization_bearer(&outsider.token)
        .json(&json!({ "content": "let me in" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_contains!(response.text(), "not a member");

    assert_no_event!(room);
    assert!(list(&app, &xena.token, group, 50, None).await.is_empty());
}

#[tokio::test]
async fn edit_recomputes_mentions_and_broadcasts() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara Okafor").await;
    let group = app.group("general", &[&xena, &yara]).await;

    let message = post_text(&app, &xena.token, group, "hello").await;
    let mut room = app.subscribe(group);

    let response = app
        .server
        .patch(&format!("/api/messages/{}", message.id))
        .authorization_bearer(&xena.token)
        .json(&json!({ "content": "hello @Yara" }))
        .await;
    response.assert_status_ok();
    let edited: Message = response.json();
    assert_eq!(edited.content, "hello @Yara");
    assert!(edited.edited_at.is_some());

    assert_matches!(
        next_event(&mut room).await,
        ServerEvent::MessageUpdated(m) if m.content == "hello @Yara" && m.edited_at.is_some()
    );

    let groups: Vec<GroupSummary> = app
        .server
        .get("/api/groups")
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert_eq!(groups[0].mentions, 1);
}

#[tokio::test]
async fn edit_rules() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;
    let message = post_text(&app, &xena.token, group, "mine").await;

    app.server
        .patch(&format!("/api/messages/{}", message.id))
        .authorization_bearer(&yara.token)
        .json(&json!({ "content": "yours now" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let gif = app
        .server
        .post(&format!("/api/messages/{}", group))
        .authorization_bearer(&xena.token)
        .json(&json!({ "type": "gif", "content": "https://media.example/cat.gif" }))
        .await
        .json::<Message>();
    app.server
        .patch(&format!("/api/messages/{}", gif.id))
        .authorization_bearer(&xena.token)
        .json(&json!({ "content": "not a gif" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .patch(&format!("/api/messages/{}", Uuid::new_v4()))
        .authorization_bearer(&xena.token)
        .json(&json!({ "content": "ghost" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_identical_reactions_cancel_out() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;
    let message = post_text(&app, &xena.token, group, "vote").await;
    let path = format!("/api/messages/{}/reaction", message.id);

    let first = app
        .server
        .put(&path)
        .authorization_bearer(&yara.token)
        .json(&json!({ "emoji": "👍" }));
    let second = app
        .server
        .put(&path)
        .authorization_bearer(&yara.token)
        .json(&json!({ "emoji": "👍" }));
    let (a, b) = tokio::join!(first.into_future(), second.into_future());
    a.assert_status_ok();
    b.assert_status_ok();

    let history = list(&app, &yara.token, group, 50, None).await;
    assert!(history[0].reactions.iter().all(|r| r.user_id != yara.id));
}

#[tokio::test]
async fn reaction_replace_keeps_one_per_user() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;
    let message = post_text(&app, &xena.token, group, "lunch?").await;
    let path = format!("/api/messages/{}/reaction", message.id);
    let mut room = app.subscribe(group);

    for (user, emoji) in [(&xena, "🎉"), (&yara, "🎉"), (&yara, "👍")] {
        app.server
            .put(&path)
            .authorization_bearer(&user.token)
            .json(&json!({ "emoji": emoji }))
            .await
            .assert_status_ok();
    }

    for _ in 0..3 {
        assert_matches!(next_event(&mut room).await, ServerEvent::MessageReactions(r) if r.message_id == message.id);
    }

    let response: ReactionResponse = app
        .server
        .put(&path)
        .authorization_bearer(&xena.token)
        .json(&json!({ "emoji": "👍" }))
        .await
        .json();
    let thumbs = response.reactions.iter().find(|s| s.emoji == "👍").expect("thumbs summary");
    assert_eq!(thumbs.count, 2);
    assert!(thumbs.reacted_by_me);
    assert!(response.reactions.iter().all(|s| s.emoji != "🎉"));
}

#[tokio::test]
async fn pagination_walks_full_history_without_overlap() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;

    let mut posted = Vec::new();
    for i in 0..8 {
        posted.push(post_text(&app, &xena.token, group, &format!("m{}", i)).await.id);
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = list(&app, &xena.token, group, 3, cursor).await;
        if page.is_empty() {
            break;
        }
        cursor = page.last().map(|m| m.id);
        seen.extend(page.into_iter().map(|m| m.id));
    }

    posted.reverse();
    assert_eq!(seen, posted);
}

#[tokio::test]
async fn unknown_cursor_is_not_found() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;

    app.server
        .get(&format!("/api/messages/{}", group))
        .authorization_bearer(&xena.token)
        .add_query_param("cursor", Uuid::new_v4())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_messages_stay_as_tombstones() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;
    let keep = post_text(&app, &xena.token, group, "keep").await;
    let gone = post_text(&app, &xena.token, group, "secret").await;
    let mut room = app.subscribe(group);

    app.server
        .delete(&format!("/api/messages/{}", gone.id))
        .authorization_bearer(&yara.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response: DeleteResponse = app
        .server
        .delete(&format!("/api/messages/{}", gone.id))
        .authorization_bearer(&xena.token)
        .await
        .json();
    assert_eq!(response, DeleteResponse { ok: true, id: gone.id });
    assert_matches!(next_event(&mut room).await, ServerEvent::MessageDeleted(d) if d.id == gone.id);

    let history = list(&app, &yara.token, group, 50, None).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, gone.id);
    assert!(history[0].deleted_at.is_some());
    assert_eq!(history[0].content, "");
    assert_eq!(history[1].id, keep.id);

    app.server
        .put(&format!("/api/messages/{}/reaction", gone.id))
        .authorization_bearer(&yara.token)
        .json(&json!({ "emoji": "👍" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn global_admin_can_delete_others_messages() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let moderator = app.admin("Mod").await;
    let group = app.group("general", &[&xena, &moderator]).await;
    let message = post_text(&app, &xena.token, group, "spam").await;

    app.server
        .delete(&format!("/api/messages/{}", message.id))
        .authorization_bearer(&moderator.token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn mark_read_notifies_senders() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;
    let group = app.group("general", &[&xena, &yara]).await;

    let mut sent = Vec::new();
    for text in ["one", "two", "three"] {
        sent.push(post_text(&app, &xena.token, group, text).await.id);
    }
    let mut room = app.subscribe(group);

    let response: MarkReadResponse = app
        .server
        .post(&format!("/api/messages/{}/read", group))
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert_eq!(response, MarkReadResponse { ok: true, marked: 3 });

    match next_event(&mut room).await {
        ServerEvent::MessagesRead(read) => {
            assert_eq!(read.user_id, yara.id);
            let mut ids = read.ids.clone();
            ids.sort();
            sent.sort();
            assert_eq!(ids, sent);
        }
        other => panic!("expected messages:read, got {:?}", other),
    }

    let groups: Vec<GroupSummary> = app
        .server
        .get("/api/groups")
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert_eq!(groups[0].unread, 0);

    let again: MarkReadResponse = app
        .server
        .post(&format!("/api/messages/{}/read", group))
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert_eq!(again.marked, 0);
    assert_no_event!(room);
}

#[tokio::test]
async fn validation_failures_are_bad_requests() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;
    let path = format!("/api/messages/{}", group);

    app.server
        .post(&path)
        .authorization_bearer(&xena.token)
        .json(&json!({ "content": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post(&path)
        .authorization_bearer(&xena.token)
        .json(&json!({ "type": "video", "content": "x" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/messages/not-a-uuid")
        .authorization_bearer(&xena.token)
        .json(&json!({ "content": "x" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;
    let path = format!("/api/messages/{}", group);

    app.server.get(&path).await.assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get(&path)
        .authorization_bearer("not.a.jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server.get("/api/ping").await.assert_status_ok();
}

#[tokio::test]
async fn favorites_round_trip() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;
    let other = app.group("random", &[&xena]).await;
    let message = post_text(&app, &xena.token, group, "bookmark me").await;
    let elsewhere = post_text(&app, &xena.token, other, "and me").await;

    for id in [message.id, elsewhere.id] {
        app.server
            .post(&format!("/api/messages/{}/favorite", id))
            .authorization_bearer(&xena.token)
            .await
            .assert_status_ok();
    }

    let scoped: Vec<FavoriteEntry> = app
        .server
        .get("/api/messages/favorites")
        .authorization_bearer(&xena.token)
        .add_query_param("groupId", group)
        .await
        .json();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].message_id, message.id);
    assert_eq!(scoped[0].author_name, "Xena");

    app.server
        .delete(&format!("/api/messages/{}/favorite", message.id))
        .authorization_bearer(&xena.token)
        .await
        .assert_status_ok();

    let all: Vec<FavoriteEntry> = app
        .server
        .get("/api/messages/favorites")
        .authorization_bearer(&xena.token)
        .await
        .json();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].message_id, elsewhere.id);
}

#[tokio::test]
async fn upload_stores_file_and_posts_message() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;
    let mut room = app.subscribe(group);

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"fake-webm-bytes".to_vec())
            .file_name("clip.webm")
            .mime_type("audio/webm"),
    );
    let response = app
        .server
        .post(&format!("/api/messages/{}/upload", group))
        .authorization_bearer(&xena.token)
        .add_query_param("type", "audio")
        .multipart(form)
        .await;
    response.assert_status(StatusCode::CREATED);
    let message: Message = response.json();
    assert_eq!(message.kind, MessageType::Audio);
    assert!(message.content.starts_with("/uploads/"));
    assert!(message.content.ends_with("?name=clip.webm"));

    assert_matches!(next_event(&mut room).await, ServerEvent::MessageNew(m) if m.id == message.id);

    let path = message.content.split('?').next().unwrap_or_default().to_string();
    let served = app.server.get(&path).await;
    served.assert_status_ok();
    assert_eq!(served.as_bytes().as_ref(), b"fake-webm-bytes");
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;

    let form = MultipartForm::new().add_text("note", "no file here");
    app.server
        .post(&format!("/api/messages/{}/upload", group))
        .authorization_bearer(&xena.token)
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_foreign_reply_target_writes_nothing() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let group = app.group("general", &[&xena]).await;
    let other = app.group("random", &[&xena]).await;
    let elsewhere = post_text(&app, &xena.token, other, "not in general").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"fake-png-bytes".to_vec())
            .file_name("shot.png")
            .mime_type("image/png"),
    );
    app.server
        .post(&format!("/api/messages/{}/upload", group))
        .authorization_bearer(&xena.token)
        .add_query_param("type", "image")
        .add_query_param("replyToId", elsewhere.id)
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let stored = std::fs::read_dir(app.uploads.path()).expect("upload dir").count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn direct_threads_are_unique_per_pair() {
    let app = TestApp::new().await;
    let xena = app.user("Xena").await;
    let yara = app.user("Yara").await;

    app.server
        .get(&format!("/api/dm/with/{}", yara.id))
        .authorization_bearer(&xena.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let first: DirectThread = app
        .server
        .post(&format!("/api/dm/{}", yara.id))
        .authorization_bearer(&xena.token)
        .await
        .json();
    let second: DirectThread = app
        .server
        .post(&format!("/api/dm/{}", xena.id))
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert_eq!(first.id, second.id);
    assert_eq!(first.other_participant(xena.id), yara.id);

    app.server
        .post(&format!("/api/dm/{}", xena.id))
        .authorization_bearer(&xena.token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    post_text(&app, &xena.token, first.group_id, "psst").await;
    let groups: Vec<GroupSummary> = app
        .server
        .get("/api/groups")
        .authorization_bearer(&yara.token)
        .await
        .json();
    assert!(groups.is_empty());
}
