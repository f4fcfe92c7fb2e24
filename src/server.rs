//! JSON HTTP query interface.
//!
//! Serves the retrieval side of Episode Browser to a presentation layer.
//! `POST /search` is the query state machine over HTTP: the client sends
//! its current [`Query`] and one [`QueryEvent`], and gets back the next
//! query together with the page it selects.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/search` | Apply an event to a query and run it |
//! | `GET`  | `/episodes/{show}/{season}/{episode}` | Episode plus similar episodes |
//! | `GET`  | `/episodes/{show}/{season}/{episode}/similar` | Similar episodes (`?limit=N`) |
//! | `GET`  | `/series` | All series |
//! | `GET`  | `/series/{title}` | One series |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "episode not found: Futurama S1.E99" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can be served from anywhere.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, Query as UrlQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use episode_browser_core::models::{EpisodeFilter, EpisodeKey, EpisodeOrder, Series};
use episode_browser_core::query::{transition, Query, QueryEvent};
use episode_browser_core::rank::ScoredEpisode;
use episode_browser_core::search::{episode_detail, search, EpisodeDetail, ResultPage};
use episode_browser_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    fn initial_query(&self) -> Query {
        let mut q = Query::new(self.config.retrieval.page_size);
        q.rank = self.config.retrieval.rank_free_text;
        q
    }
}

/// Build the router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/episodes/{show}/{season}/{episode}", get(handle_episode))
        .route(
            "/episodes/{show}/{season}/{episode}/similar",
            get(handle_similar),
        )
        .route("/series", get(handle_list_series))
        .route("/series/{title}", get(handle_series))
        .layer(cors)
        .with_state(state)
}

/// Serve on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    let state = AppState::new(config.clone(), Arc::new(SqliteStore::new(pool)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Episode Browser listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");
    axum::serve(listener, router(state)).await?;

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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("request failed: {:#}", err);
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: format!("{:#}", err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        bad_request(rej.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rej: PathRejection) -> Self {
        bad_request(rej.body_text())
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

// ============ POST /search ============

/// Body of `POST /search`. Both parts are optional: no `query` starts from
/// the configured defaults, no `event` re-runs the query as is.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<QueryState>,
    #[serde(default)]
    pub event: Option<QueryEvent>,
}

/// Query state echoed back by a client. Fields it leaves out keep their
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct QueryState {
    #[serde(default)]
    pub filter: Option<EpisodeFilter>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub rank: Option<bool>,
    #[serde(default)]
    pub order: Option<EpisodeOrder>,
}

impl QueryState {
    fn over(self, mut base: Query) -> Query {
        if let Some(filter) = self.filter {
            base.filter = filter;
        }
        if let Some(page) = self.page {
            base.page = page.max(1);
        }
        if let Some(page_size) = self.page_size {
            base.page_size = page_size.max(1);
        }
        if let Some(rank) = self.rank {
            base.rank = rank;
        }
        if let Some(order) = self.order {
            base.order = order;
        }
        base
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: Query,
    pub page: ResultPage,
}

async fn handle_search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = body?;
    let current = req
        .query
        .unwrap_or_default()
        .over(state.initial_query());
    let next = match &req.event {
        Some(event) => transition(&current, event),
        None => current,
    };

    let page = search(state.store.as_ref(), &next).await?;
    Ok(Json(SearchResponse { query: next, page }))
}

// ============ GET /episodes/... ============

fn episode_key((show, season, episode): (String, u32, u32)) -> EpisodeKey {
    EpisodeKey {
        show,
        season,
        episode,
    }
}

async fn handle_episode(
    State(state): State<AppState>,
    path: Result<Path<(String, u32, u32)>, PathRejection>,
) -> Result<Json<EpisodeDetail>, AppError> {
    let Path(parts) = path?;
    let key = episode_key(parts);
    let limit = state.config.retrieval.similar_limit;
    match episode_detail(state.store.as_ref(), &key, limit).await? {
        Some(detail) => Ok(Json(detail)),
        None => Err(not_found(format!("episode not found: {}", key))),
    }
}

#[derive(Debug, Deserialize)]
struct SimilarParams {
    limit: Option<usize>,
}

async fn handle_similar(
    State(state): State<AppState>,
    path: Result<Path<(String, u32, u32)>, PathRejection>,
    UrlQuery(params): UrlQuery<SimilarParams>,
) -> Result<Json<Vec<ScoredEpisode>>, AppError> {
    let Path(parts) = path?;
    let key = episode_key(parts);
    let limit = params
        .limit
        .unwrap_or(state.config.retrieval.similar_limit);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }
    match episode_detail(state.store.as_ref(), &key, limit).await? {
        Some(detail) => Ok(Json(detail.similar)),
        None => Err(not_found(format!("episode not found: {}", key))),
    }
}

// ============ GET /series ============

async fn handle_list_series(State(state): State<AppState>) -> Result<Json<Vec<Series>>, AppError> {
    Ok(Json(state.store.list_series().await?))
}

async fn handle_series(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Series>, AppError> {
    match state.store.get_series(&title).await? {
        Some(s) => Ok(Json(s)),
        None => Err(not_found(format!("series not found: {}", title))),
    }
}
