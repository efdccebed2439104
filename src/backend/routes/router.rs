/**
 * Router Configuration
 *
 * Combines the API routes, the socket endpoint, upload serving and the
 * fallback into one router, then applies tracing and CORS layers.
 *
 * # Route Order
 *
 * 1. API routes (`/api/...`)
 * 2. Socket endpoint (`/ws`)
 * 3. Uploaded files (`/uploads`)
 * 4. Fallback handler (404)
 */

use axum::{
    http::{HeaderValue, StatusCode},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::backend::realtime::socket_handler;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;
use crate::backend::storage::UPLOAD_MOUNT;

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!("Invalid CORS_ORIGIN {:?} ({}), allowing any origin", origin, e);
                AllowOrigin::any()
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_api_routes(Router::new(), &app_state);

    let router = router.route("/ws", get(socket_handler));

    let router = router.nest_service(UPLOAD_MOUNT, ServeDir::new(&app_state.config.upload_dir));

    let router = router.fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") });

    let cors = cors_layer(&app_state.config.cors_origin);
    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
