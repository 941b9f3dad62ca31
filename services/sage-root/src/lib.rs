//! Library surface for `sage-root`'s axum app, split out of `main.rs` so
//! integration tests can drive the router through `tower::ServiceExt`
//! without binding this process's own TCP listener.

pub mod hpke_keys;
pub mod http;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::{AppState, REPLAY_WINDOW};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/process", post(http::process_handler))
        .route("/status", get(http::status_handler))
        .route("/sage/status", get(http::sage_status_handler))
        .route("/toggle-sage", post(http::toggle_sage_handler))
        .route("/hpke/config", post(http::hpke_config_handler))
        .route("/hpke/status", get(http::hpke_status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
