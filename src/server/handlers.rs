use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info};

use crate::ocr::ClovaOcr;
use crate::settings;
use crate::store::{FolderOverview, Store};

use super::error::ServerError;
use super::models::{
    Credentials, FolderCreateRequest, FolderUpdateRequest, HistoryCreate, HistoryPoint,
    HistoryResponse, LoginResponse, MessageResponse, StatsUpdate, UsernameQuery,
};
use super::problems;
use super::state::ServerState;

const PREVIEW_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_server(settings: settings::Settings) -> Result<()> {
    let store = match settings.data_path.as_deref() {
        Some(path) => Store::open(std::path::Path::new(path))?,
        None => {
            info!("store: no data_path configured; data lives in memory only");
            Store::in_memory()
        }
    };
    let ocr = ClovaOcr::new(
        settings.ocr_url.clone(),
        settings.ocr_secret.clone(),
        settings.ocr_timeout(),
    )?;
    let addr = settings.server_addr.clone();
    let state = Arc::new(ServerState::new(settings, store, Arc::new(ocr)));
    spawn_preview_purge(state.clone());
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/:folder_id", put(update_folder).delete(delete_folder))
        .route("/ocr", post(problems::ocr_preview))
        .route(
            "/problems",
            get(problems::list_problems).post(problems::save_problem),
        )
        .route("/problems/wrong-note", patch(problems::bulk_update_wrong_note))
        .route(
            "/problems/:problem_id",
            put(problems::update_problem).delete(problems::delete_problem),
        )
        .route(
            "/problems/:problem_id/submissions",
            post(problems::check_answer),
        )
        .route("/wrong-notes", get(problems::wrong_notes))
        .route("/user/stats", put(update_stats))
        .route("/history", get(list_history).post(create_history))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

fn spawn_preview_purge(state: Arc<ServerState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PREVIEW_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = state.previews.purge_expired();
            if purged > 0 {
                debug!("preview cache: purged {} expired entries", purged);
            }
        }
    })
}

/// Runs password hashing off the async workers.
async fn run_blocking<T, F>(func: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, ServerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(func)
        .await
        .map_err(|err| ServerError::internal(format!("server task failed: {}", err)))?
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    debug!("{} {}", req.method(), req.uri().path());
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,PUT,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn register(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    let user =
        run_blocking(move || Ok(state.store.register(&payload.username, &payload.password)?))
            .await?;
    info!("user registered: {}", user.username);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("registered")),
    ))
}

async fn login(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<LoginResponse>, ServerError> {
    let user = run_blocking(move || Ok(state.store.login(&payload.username, &payload.password)?))
        .await?;
    Ok(Json(LoginResponse {
        message: "logged in".to_string(),
        username: user.username,
    }))
}

async fn list_folders(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<FolderOverview>, ServerError> {
    Ok(Json(state.store.folders_overview(&query.username)?))
}

async fn create_folder(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<FolderCreateRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    let folder = state.store.create_folder(
        &payload.username,
        &payload.folder_name,
        payload.color.as_deref(),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id("folder created", folder.id)),
    ))
}

async fn update_folder(
    State(state): State<Arc<ServerState>>,
    Path(folder_id): Path<u64>,
    Json(payload): Json<FolderUpdateRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    state.store.update_folder(
        folder_id,
        &payload.username,
        &payload.new_name,
        &payload.new_color,
    )?;
    Ok(Json(MessageResponse::new("folder updated")))
}

async fn delete_folder(
    State(state): State<Arc<ServerState>>,
    Path(folder_id): Path<u64>,
    Query(query): Query<UsernameQuery>,
) -> Result<StatusCode, ServerError> {
    state.store.delete_folder(folder_id, &query.username)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_stats(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<StatsUpdate>,
) -> Result<Json<MessageResponse>, ServerError> {
    state.store.record_stats(
        &payload.username,
        payload.solved_count,
        payload.correct_count,
    )?;
    Ok(Json(MessageResponse::new("stats updated")))
}

async fn create_history(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<HistoryCreate>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    let entry = state.store.add_history(&payload.username, payload.score)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id("history recorded", entry.id)),
    ))
}

async fn list_history(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let entries = state
        .store
        .recent_history(&query.username, state.settings.history_limit)?;
    let data = entries
        .into_iter()
        .map(|entry| {
            Ok(HistoryPoint {
                date: month_day(entry.solved_at)?,
                score: entry.score,
            })
        })
        .collect::<Result<Vec<_>, ServerError>>()?;
    Ok(Json(HistoryResponse { data }))
}

fn month_day(unix_secs: u64) -> Result<String, ServerError> {
    let datetime = OffsetDateTime::from_unix_timestamp(unix_secs as i64)
        .map_err(|err| ServerError::internal(format!("invalid timestamp: {}", err)))?;
    datetime
        .format(format_description!("[month]/[day]"))
        .map_err(|err| ServerError::internal(format!("failed to format date: {}", err)))
}
