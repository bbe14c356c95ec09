//! HTTP search API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/search?q=&mode=&field=&limit=` | Search documents |
//! | `GET`  | `/suggest?q=` | File-name autocomplete |
//! | `GET`  | `/documents/{id}` | One record |
//! | `DELETE` | `/documents/{id}` | Delete a record and its blobs |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "unknown match mode: fuzzy" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the API directly.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use docsift_core::models::{DocumentRecord, MatchMode, SearchField, SearchResult, Suggestion};
use docsift_core::search::{search, suggest, SearchRequest};
use docsift_core::store::DocumentStore;

use crate::backends::Backends;
use crate::config::Config;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    backends: Arc<Backends>,
}

impl AppState {
    pub fn new(config: Config, backends: Backends) -> Self {
        Self {
            config: Arc::new(config),
            backends: Arc::new(backends),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", get(handle_search))
        .route("/suggest", get(handle_suggest))
        .route(
            "/documents/{id}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let backends = Backends::open(config).await?;
    let app = router(AppState::new(config.clone(), backends));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");
    println!("docsift server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    mode: Option<String>,
    field: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.q.ok_or_else(|| bad_request("q is required"))?;
    let mode = match params.mode.as_deref() {
        Some(m) => m.parse::<MatchMode>().map_err(|e| bad_request(e.to_string()))?,
        None => MatchMode::default(),
    };
    let field = match params.field.as_deref() {
        Some(f) => f.parse::<SearchField>().map_err(|e| bad_request(e.to_string()))?,
        None => SearchField::default(),
    };

    if params.limit == Some(0) {
        return Err(bad_request("limit must be >= 1"));
    }
    let search_params = state.config.search.params_with_limit(params.limit);

    let request = SearchRequest {
        query: &query,
        mode,
        field,
        params: search_params,
    };
    let results = search(&state.backends.store, &*state.backends.blobs, &request)
        .await
        .map_err(internal)?;

    Ok(Json(SearchResponse { results }))
}

// ============ GET /suggest ============

#[derive(Deserialize)]
struct SuggestQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct SuggestResponse {
    suggestions: Vec<Suggestion>,
}

async fn handle_suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>, AppError> {
    let partial = params.q.ok_or_else(|| bad_request("q is required"))?;
    let suggestions = suggest(
        &state.backends.store,
        &partial,
        state.config.search.params().suggest_limit,
    )
    .await
    .map_err(internal)?;
    Ok(Json(SuggestResponse { suggestions }))
}

// ============ /documents/{id} ============

async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, AppError> {
    state
        .backends
        .store
        .get_document(&id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("document not found: {}", id)))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: String,
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    match state.backends.remove_document(&id).await.map_err(internal)? {
        Some(doc) => Ok(Json(DeleteResponse { deleted: doc.id })),
        None => Err(not_found(format!("document not found: {}", id))),
    }
}
