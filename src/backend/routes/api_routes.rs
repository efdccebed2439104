/**
 * API Routes
 *
 * All message and conversation endpoints. Every route except `/api/ping`
 * sits behind the bearer-token middleware.
 *
 * # Routes
 *
 * ## Messages
 * - `GET /api/messages/favorites?groupId=` - caller's bookmarks
 * - `GET /api/messages/{groupId}?take=&cursor=` - history page, newest first
 * - `POST /api/messages/{groupId}` - post a message
 * - `POST /api/messages/{groupId}/upload?type=` - post an attachment
 * - `POST /api/messages/{groupId}/read` - mark the group read
 * - `PATCH /api/messages/{messageId}` - edit
 * - `DELETE /api/messages/{messageId}` - soft delete
 * - `PUT /api/messages/{messageId}/reaction` - toggle reaction
 * - `POST|DELETE /api/messages/{messageId}/favorite` - bookmark
 *
 * ## Conversations
 * - `GET /api/groups`, `GET /api/dm`, `GET /api/dm/with/{userId}`,
 *   `POST /api/dm/{userId}`
 *
 * Group and message ids share one path slot, so both are bound as `{id}`.
 */

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::backend::messaging::conversations::{
    direct_thread_with, list_direct_threads, list_groups, open_direct_thread, ping,
};
use crate::backend::messaging::handlers::{
    create_message, delete_message, edit_message, favorite_message, list_favorites,
    list_messages, mark_group_read, react_to_message, unfavorite_message, upload_message,
};
use crate::backend::middleware::auth_middleware;
use crate::backend::server::state::AppState;

pub fn configure_api_routes(router: Router<AppState>, app_state: &AppState) -> Router<AppState> {
    let max_upload_bytes = app_state.config.max_upload_bytes;

    let protected = Router::new()
        .route("/api/messages/favorites", get(list_favorites))
        .route(
            "/api/messages/{id}",
            get(list_messages)
                .post(create_message)
                .patch(edit_message)
                .delete(delete_message),
        )
        .route(
            "/api/messages/{id}/upload",
            post(upload_message).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/messages/{id}/read", post(mark_group_read))
        .route("/api/messages/{id}/reaction", put(react_to_message))
        .route(
            "/api/messages/{id}/favorite",
            post(favorite_message).delete(unfavorite_message),
        )
        .route("/api/groups", get(list_groups))
        .route("/api/dm", get(list_direct_threads))
        .route("/api/dm/with/{id}", get(direct_thread_with))
        .route("/api/dm/{id}", post(open_direct_thread))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), auth_middleware));

    router
        .merge(protected)
        .route("/api/ping", get(ping))
}
