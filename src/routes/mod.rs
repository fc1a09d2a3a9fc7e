//! Route composition

use std::sync::Arc;

use axum::response::Redirect;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{api, ws};
use crate::state::AppState;

/// Build the application router: health check, the conversation
/// WebSocket and (optionally) the static client bundle.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(api::health_check))
        .route("/ws", get(ws::ws_agent_handler));

    // With a client bundle configured, the root points a browser at it;
    // otherwise the root doubles as the health check.
    match &state.config.static_asset_mount {
        Some(mount) => {
            info!(path = %mount.display(), "Serving client bundle at /client");
            router = router
                .nest_service("/client", ServeDir::new(mount))
                .route("/", get(|| async { Redirect::permanent("/client/") }));
        }
        None => {
            router = router.route("/", get(api::health_check));
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
