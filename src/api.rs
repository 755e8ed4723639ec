use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::db::Store;
use crate::document::Document;
use crate::error::{self, Error};
use crate::ingest::Ingestor;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub ingestor: Ingestor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/source/{title}", get(source).delete(delete_source))
        .route("/api/sources/", get(sources))
        .route("/api/titles/", get(titles))
        .route("/api/source/", post(create))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Error body written for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    err: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_fetch() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(code = self.status.as_u16(), "http error: {}", self.message);
        (self.status, Json(ErrorBody { err: self.message })).into_response()
    }
}

/// Run a store call on the blocking pool; queries hold a std mutex around rusqlite.
async fn with_store<T, F>(state: &AppState, f: F) -> error::Result<T>
where
    F: FnOnce(&Store) -> error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store)).await?
}

async fn source(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Document>, ApiError> {
    let doc = with_store(&state, move |store| store.source(&title)).await?;
    Ok(Json(doc))
}

async fn sources(State(state): State<AppState>) -> Result<Response, ApiError> {
    let all = with_store(&state, |store| store.sources()).await?;
    if all.is_empty() {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    Ok(Json(all).into_response())
}

async fn titles(State(state): State<AppState>) -> Result<Response, ApiError> {
    let all = with_store(&state, |store| store.titles()).await?;
    if all.is_empty() {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    Ok(Json(all).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSource {
    url: Option<String>,
}

/// Accepts the page URL either as a form field or as a query parameter.
async fn create(
    State(state): State<AppState>,
    Query(query): Query<CreateSource>,
    form: Result<Form<CreateSource>, FormRejection>,
) -> Result<Json<Document>, ApiError> {
    let url = form
        .ok()
        .and_then(|Form(body)| body.url)
        .or(query.url)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "missing url"))?;
    let doc = state.ingestor.ingest(&state.store, &url).await?;
    Ok(Json(doc))
}

async fn delete_source(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<StatusCode, ApiError> {
    with_store(&state, move |store| store.delete(&title)).await?;
    Ok(StatusCode::NO_CONTENT)
}
