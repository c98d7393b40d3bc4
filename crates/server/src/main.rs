use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use server_api::{
    create_song, delete_song, get_song, list_songs, song_statistics, update_song, ApiContext,
};
use shared::{
    domain::{Song, SongId, SongPatch},
    error::{ApiError, ErrorCode},
    protocol::{HealthResponse, ListSongsQuery, ListSongsResponse, MessageResponse, Statistics},
};
use storage::Storage;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

const SERVICE_NAME: &str = "Song Management API";

const ENDPOINTS: [&str; 8] = [
    "GET /health",
    "GET /api/songs",
    "GET /api/songs/statistics",
    "GET /api/songs/:id",
    "POST /api/songs",
    "PUT /api/songs/:id",
    "DELETE /api/songs/:id",
    "GET /",
];

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
        max_body_bytes: settings.max_body_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "song catalog listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    let songs = Router::new()
        .route("/songs", get(http_list_songs).post(http_create_song))
        .route("/songs/statistics", get(http_song_statistics))
        .route("/songs/stats", get(http_song_statistics))
        .route(
            "/songs/:id",
            get(http_get_song).put(http_update_song).delete(http_delete_song),
        );

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .nest("/api", songs)
        .fallback(route_not_found)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> HttpError {
    if err.code == ErrorCode::Internal {
        error!(message = %err.message, "catalog request failed");
    }
    (status_for(err.code), Json(err))
}

fn malformed(message: String) -> HttpError {
    reject(ApiError::validation(message))
}

async fn banner() -> impl IntoResponse {
    Json(json!({
        "message": format!("Welcome to the {SERVICE_NAME}"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.api.storage.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "OK".into(),
                message: format!("{SERVICE_NAME} is running"),
                timestamp: Utc::now(),
            }),
        ),
        Err(error) => {
            warn!(%error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "ERROR".into(),
                    message: "database is unavailable".into(),
                    timestamp: Utc::now(),
                }),
            )
        }
    }
}

async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "message": "Route not found",
            "requestedUrl": uri.to_string(),
            "availableEndpoints": ENDPOINTS,
        })),
    )
}

async fn http_list_songs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListSongsQuery>, QueryRejection>,
) -> Result<Json<ListSongsResponse>, HttpError> {
    let Query(query) = query.map_err(|e| malformed(e.body_text()))?;
    list_songs(&state.api, &query).await.map(Json).map_err(reject)
}

async fn http_song_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Statistics>, HttpError> {
    song_statistics(&state.api).await.map(Json).map_err(reject)
}

async fn http_get_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Song>, HttpError> {
    get_song(&state.api, &SongId(id)).await.map(Json).map_err(reject)
}

async fn http_create_song(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SongPatch>, JsonRejection>,
) -> Result<(StatusCode, Json<Song>), HttpError> {
    let Json(fields) = payload.map_err(|e| malformed(e.body_text()))?;
    let song = create_song(&state.api, fields).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(song)))
}

async fn http_update_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SongPatch>, JsonRejection>,
) -> Result<Json<Song>, HttpError> {
    let Json(patch) = payload.map_err(|e| malformed(e.body_text()))?;
    update_song(&state.api, &SongId(id), patch)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_delete_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HttpError> {
    delete_song(&state.api, &SongId(id))
        .await
        .map(Json)
        .map_err(reject)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
