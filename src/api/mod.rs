//! HTTP transport: router construction and shared handler state.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::plugins::PluginRegistry;
use crate::search::SearchProvider;
use crate::tts::Synthesizer;

/// Shared state accessible by all API handlers.
///
/// Everything here is built once at startup and read-only afterwards; the
/// registry is passed through state rather than living in a process-wide
/// global.
#[derive(Clone)]
pub struct ApiState {
    pub plugins: Arc<PluginRegistry>,
    pub search: Arc<dyn SearchProvider>,
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Synthesis voice identifier from configuration.
    pub voice: String,
}

/// Build the API router with all routes.
///
/// All endpoints permit cross-origin calls; the gateway fronts browser
/// clients served from other origins.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .nest("/api", handlers::api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
