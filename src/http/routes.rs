//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::GeometryCatalog;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/geometry", get(geometry_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the browser client. `*` allows any origin; otherwise a
/// comma-separated list of origins.
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick: u64,
    sim_time_ms: u64,
    players: usize,
    bullets: usize,
    connections: usize,
    snapshots_published: u64,
    publish_failures: u64,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.arena.status();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        tick: status.tick,
        sim_time_ms: status.sim_time_ms,
        players: status.players,
        bullets: status.bullets,
        connections: state.presence.len(),
        snapshots_published: status.snapshots_published,
        publish_failures: status.publish_failures,
    })
}

/// Static cover layout, so clients render exactly what the server collides with
async fn geometry_handler(State(state): State<AppState>) -> Json<GeometryCatalog> {
    Json(state.catalog.as_ref().clone())
}
