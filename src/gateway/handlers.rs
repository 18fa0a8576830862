use axum::{
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{Response, StatusCode},
    response::{IntoResponse, Json},
};

use super::streaming::build_sse_response;
use super::{AppState, SERVICE_NAME};
use crate::core::evolution::StreamRequest;
use crate::jobs::CreateJobRequest;

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// GET /healthz
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "service": SERVICE_NAME }))
}

/// GET /llm/config: provider, model, and where the key comes from. Never the key.
pub(super) async fn handle_llm_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.provider_info().clone())
}

/// POST /evolution/jobs
pub(super) async fn handle_create_job(
    State(state): State<AppState>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Response<Body> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("rejected job request: {rejection}");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text()).into_response();
        }
    };

    let job = state.jobs.create_job(request).await;
    Json(serde_json::json!({ "jobId": job.job.job_id, "status": job.status })).into_response()
}

/// GET /evolution/jobs/{job_id}
pub(super) async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response<Body> {
    match state.jobs.get_job(&job_id).await {
        Ok(job) => Json(job.status_view()).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "Job not found").into_response(),
    }
}

/// GET /evolution/jobs/{job_id}/candidates/{candidate_id}
pub(super) async fn handle_get_candidate(
    State(state): State<AppState>,
    Path((job_id, candidate_id)): Path<(String, String)>,
) -> Response<Body> {
    match state.jobs.get_candidate(&job_id, &candidate_id).await {
        Ok(candidate) => Json(candidate).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, "Candidate not found").into_response(),
    }
}

/// POST /evolution/stream: progress as `text/event-stream`.
pub(super) async fn handle_stream(
    State(state): State<AppState>,
    body: Result<Json<StreamRequest>, JsonRejection>,
) -> Response<Body> {
    match body {
        Ok(Json(request)) => build_sse_response(state.engine, request),
        Err(rejection) => {
            tracing::debug!("rejected stream request: {rejection}");
            error_response(StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
        }
    }
}
