use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::survey::TraversalError;

use super::service::{ServiceError, SessionId, TriageService};

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub access_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectPathRequest {
    pub path_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub value: String,
}

/// Router builder exposing the session lifecycle over JSON.
pub fn session_router(service: Arc<TriageService>) -> Router {
    Router::new()
        .route("/api/v1/sessions", post(open_handler))
        .route(
            "/api/v1/sessions/:session_id",
            get(view_handler).delete(close_handler),
        )
        .route("/api/v1/sessions/:session_id/paths", get(paths_handler))
        .route("/api/v1/sessions/:session_id/path", put(select_path_handler))
        .route("/api/v1/sessions/:session_id/answers", post(answer_handler))
        .route("/api/v1/sessions/:session_id/back", post(back_handler))
        .route("/api/v1/sessions/:session_id/reset", post(reset_handler))
        .route("/api/v1/sessions/:session_id/edit", post(edit_handler))
        .route("/api/v1/sessions/:session_id/export", get(export_handler))
        .with_state(service)
}

pub(crate) async fn open_handler(
    State(service): State<Arc<TriageService>>,
    axum::Json(request): axum::Json<OpenSessionRequest>,
) -> Response {
    match service.open_session(&request.access_code) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    respond(service.view(&SessionId(session_id)))
}

pub(crate) async fn paths_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    respond(service.paths(&SessionId(session_id)))
}

pub(crate) async fn select_path_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<SelectPathRequest>,
) -> Response {
    respond(service.select_path(&SessionId(session_id), &request.path_id))
}

pub(crate) async fn answer_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response {
    respond(service.answer(&SessionId(session_id), &request.value).await)
}

pub(crate) async fn back_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    respond(service.go_back(&SessionId(session_id)))
}

pub(crate) async fn reset_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    respond(service.reset(&SessionId(session_id)))
}

pub(crate) async fn edit_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    respond(service.edit(&SessionId(session_id)))
}

pub(crate) async fn export_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    respond(service.export(&SessionId(session_id)))
}

pub(crate) async fn close_handler(
    State(service): State<Arc<TriageService>>,
    Path(session_id): Path<String>,
) -> Response {
    match service.close(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn respond<T: serde::Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Traversal(TraversalError::UnknownPath(_)) => StatusCode::NOT_FOUND,
        ServiceError::Traversal(TraversalError::InvalidAnswer { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::Traversal(
            TraversalError::AlreadyFinished
            | TraversalError::NotFinished
            | TraversalError::AtFirstQuestion,
        ) => StatusCode::CONFLICT,
        ServiceError::Traversal(TraversalError::NoPaths) | ServiceError::Unavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
