//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
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
use crate::game::{PlayerRecord, RoomSummary};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/rooms", get(rooms_handler))
        .route("/rooms/:room", get(room_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origins))
        .with_state(state)
}

/// CORS for the configured origins, or any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<header::HeaderValue> = origins
        .iter()
        .filter_map(|s| s.parse::<header::HeaderValue>().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_credentials(true)
    };

    cors.allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    players: usize,
    rooms: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connections: state.game.connection_count(),
        players: state.game.player_count(),
        rooms: state.game.room_summaries().len(),
    })
}

// ============================================================================
// Room endpoints
// ============================================================================

#[derive(Serialize)]
struct RoomsResponse {
    rooms: Vec<RoomSummary>,
}

async fn rooms_handler(State(state): State<AppState>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: state.game.room_summaries(),
    })
}

#[derive(Serialize)]
struct RoomResponse {
    room: String,
    players: Vec<PlayerRecord>,
}

async fn room_handler(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let players = state.game.room_members(&room);
    if players.is_empty() {
        return Err(AppError::NotFound(format!("room '{}' has no players", room)));
    }

    Ok(Json(RoomResponse { room, players }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
