//! Messaging HTTP Handlers
//!
//! Thin axum wrappers around [`MessageService`]: extract, delegate, wrap in
//! `Json`. Extractor rejections become 400s through `BackendError`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::service::MessageService;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::storage::UploadedFile;
use crate::shared::messaging::{
    CreateMessageRequest, DeleteResponse, EditMessageRequest, FavoriteEntry, FavoritesParams,
    ListMessagesParams, MarkReadResponse, Message, OkResponse, ReactRequest, ReactionResponse,
    UploadParams,
};

type ApiResult<T> = Result<Json<T>, BackendError>;

/// `GET /api/messages/{groupId}?take=&cursor=`
pub async fn list_messages(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ListMessagesParams>, QueryRejection>,
) -> ApiResult<Vec<Message>> {
    let Path(group_id) = path?;
    let Query(params) = query?;
    Ok(Json(service.list(&user, group_id, &params).await?))
}

/// `POST /api/messages/{groupId}`
pub async fn create_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), BackendError> {
    let Path(group_id) = path?;
    let Json(request) = body?;
    let message = service.create(&user, group_id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// `POST /api/messages/{groupId}/upload?type=audio|image|file`
///
/// Multipart body with a single `file` field.
pub async fn upload_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<UploadParams>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Message>), BackendError> {
    let Path(group_id) = path?;
    let Query(params) = query?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BackendError::validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| BackendError::validation(e.body_text()))?;
        file = Some(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let message = service.upload(&user, group_id, &params, file).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// `PATCH /api/messages/{messageId}`
pub async fn edit_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<EditMessageRequest>, JsonRejection>,
) -> ApiResult<Message> {
    let Path(message_id) = path?;
    let Json(request) = body?;
    Ok(Json(service.edit(&user, message_id, request).await?))
}

/// `DELETE /api/messages/{messageId}`
pub async fn delete_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<DeleteResponse> {
    let Path(message_id) = path?;
    Ok(Json(service.delete(&user, message_id).await?))
}

/// `PUT /api/messages/{messageId}/reaction`
pub async fn react_to_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReactRequest>, JsonRejection>,
) -> ApiResult<ReactionResponse> {
    let Path(message_id) = path?;
    let Json(request) = body?;
    Ok(Json(service.react(&user, message_id, &request.emoji).await?))
}

/// `POST /api/messages/{messageId}/favorite`
pub async fn favorite_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<OkResponse> {
    let Path(message_id) = path?;
    service.favorite(&user, message_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// `DELETE /api/messages/{messageId}/favorite`
pub async fn unfavorite_message(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<OkResponse> {
    let Path(message_id) = path?;
    service.unfavorite(&user, message_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// `GET /api/messages/favorites?groupId=`
pub async fn list_favorites(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    query: Result<Query<FavoritesParams>, QueryRejection>,
) -> ApiResult<Vec<FavoriteEntry>> {
    let Query(params) = query?;
    Ok(Json(service.favorites(&user, params.group_id).await?))
}

/// `POST /api/messages/{groupId}/read`
pub async fn mark_group_read(
    State(service): State<MessageService>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<MarkReadResponse> {
    let Path(group_id) = path?;
    Ok(Json(service.mark_read(&user, group_id).await?))
}
