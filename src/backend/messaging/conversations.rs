//! Conversation Listing Handlers
//!
//! Sidebar data: the caller's rooms with unread and mention counters, and
//! direct threads with the other participant and the latest message.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::service::MessageService;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::shared::messaging::{DirectThread, DirectThreadSummary, GroupSummary};

/// `GET /api/groups`
pub async fn list_groups(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<GroupSummary>>, BackendError> {
    Ok(Json(service.groups(&user).await?))
}

/// `GET /api/dm`
pub async fn list_direct_threads(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<DirectThreadSummary>>, BackendError> {
    Ok(Json(service.direct_threads(&user).await?))
}

/// `GET /api/dm/with/{userId}`
pub async fn direct_thread_with(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DirectThread>, BackendError> {
    let Path(other) = path?;
    Ok(Json(service.direct_thread_with(&user, other).await?))
}

/// `POST /api/dm/{userId}`
pub async fn open_direct_thread(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DirectThread>, BackendError> {
    let Path(other) = path?;
    Ok(Json(service.open_direct_thread(&user, other).await?))
}

/// `GET /api/ping`
pub async fn ping() -> Json<Value> {
    Json(json!({ "ok": true, "ts": Utc::now().timestamp_millis() }))
}
