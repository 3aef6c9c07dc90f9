use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub forkable: bool,
    #[serde(default)]
    pub branches: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

/// A request seen by `/status/{code}` or `/echo`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone, Default)]
pub struct AppState {
    repos: Arc<RwLock<HashMap<u64, Repository>>>,
    next_id: Arc<AtomicU64>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

pub fn app() -> Router {
    let api = Router::new()
        .route("/repos", post(create_repo))
        .route(
            "/repos/{id}",
            get(get_repo).put(update_repo).delete(delete_repo),
        )
        .route("/repos/{id}/raw", get(get_repo_raw))
        .route("/repos/{id}/branches", delete(delete_branch))
        .route("/status/{code}", any(respond_with_status))
        .route("/echo", any(echo))
        .route("/encoded/{kind}", get(encoded_body))
        .route("/requests", get(list_requests))
        .with_state(AppState::default());

    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn empty_object(status: StatusCode) -> Response {
    (status, Json(serde_json::json!({}))).into_response()
}

async fn create_repo(State(state): State<AppState>, Json(mut repo): Json<Repository>) -> Response {
    repo.id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    state.repos.write().await.insert(repo.id, repo.clone());
    debug!(id = repo.id, name = %repo.name, "repository created");
    (StatusCode::CREATED, Json(repo)).into_response()
}

async fn get_repo(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let repos = state.repos.read().await;
    match repos.get(&id) {
        Some(repo) => Json(repo.clone()).into_response(),
        None => empty_object(StatusCode::NOT_FOUND),
    }
}

/// Serves the repository JSON with a misleading content type.
async fn get_repo_raw(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let repos = state.repos.read().await;
    let Some(repo) = repos.get(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match serde_json::to_string(repo) {
        Ok(body) => ([(header::CONTENT_TYPE, "text/plain")], body).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// A JSON body replaces the repository (200); an empty body only checks
/// that it exists (204).
async fn update_repo(State(state): State<AppState>, Path(id): Path<u64>, body: Bytes) -> Response {
    let mut repos = state.repos.write().await;
    let Some(existing) = repos.get_mut(&id) else {
        return empty_object(StatusCode::NOT_FOUND);
    };
    if body.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    match serde_json::from_slice::<Repository>(&body) {
        Ok(mut update) => {
            update.id = id;
            *existing = update.clone();
            Json(update).into_response()
        }
        Err(_) => empty_object(StatusCode::BAD_REQUEST),
    }
}

async fn delete_repo(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let removed = state.repos.write().await.remove(&id);
    match removed {
        Some(repo) => (StatusCode::ACCEPTED, Json(repo)).into_response(),
        None => empty_object(StatusCode::NOT_FOUND),
    }
}

async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(branch): Json<BranchRef>,
) -> StatusCode {
    let mut repos = state.repos.write().await;
    let Some(repo) = repos.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    let before = repo.branches.len();
    repo.branches.retain(|name| name != &branch.name);
    if repo.branches.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn record(state: &AppState, method: &Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
    let value_of = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: value_of(header::AUTHORIZATION),
        content_type: value_of(header::CONTENT_TYPE),
        body: (!body.is_empty()).then(|| String::from_utf8_lossy(body).into_owned()),
    };
    state.requests.write().await.push(recorded);
}

/// Responds with the requested status and a `{}` body (none for 204).
async fn respond_with_status(
    State(state): State<AppState>,
    Path(code): Path<u16>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, &uri, &headers, &body).await;
    let Ok(status) = StatusCode::from_u16(code) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    empty_object(status)
}

async fn echo(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, &uri, &headers, &body).await;
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Serves a repository body in a byte encoding other than plain UTF-8.
async fn encoded_body(Path(kind): Path<String>) -> Response {
    match kind.as_str() {
        "bom" => {
            let mut body = vec![0xEF, 0xBB, 0xBF];
            body.extend_from_slice(br#"{"id":42,"name":"demo"}"#);
            ([(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        "latin1" => {
            let body = b"{\"id\":7,\"name\":\"J\xfcrgen\"}".to_vec();
            (
                [(header::CONTENT_TYPE, "application/json; charset=iso-8859-1")],
                body,
            )
                .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_requests(State(state): State<AppState>) -> Json<Vec<RecordedRequest>> {
    Json(state.requests.read().await.clone())
}
