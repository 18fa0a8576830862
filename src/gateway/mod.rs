//! Axum HTTP gateway: job submission, polling, candidate lookup, and the
//! preference stream over server-sent events.
//!
//! - Request body limit (2 MiB)
//! - Request timeout (30s)
//! - Permissive CORS for browser clients

mod handlers;
pub mod streaming;

use handlers::{
    handle_create_job, handle_get_candidate, handle_get_job, handle_health, handle_llm_config,
    handle_stream,
};

use crate::config::Config;
use crate::core::evolution::EvolutionEngine;
use crate::jobs::JobStore;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (2 MiB)
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const SERVICE_NAME: &str = "frontswatch-evolution";

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EvolutionEngine>,
    pub jobs: JobStore,
}

impl AppState {
    pub fn new(engine: Arc<EvolutionEngine>) -> Self {
        let jobs = JobStore::new(Arc::clone(&engine));
        Self { engine, jobs }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handle_health))
        .route("/llm/config", get(handle_llm_config))
        .route("/evolution/jobs", post(handle_create_job))
        .route("/evolution/jobs/{job_id}", get(handle_get_job))
        .route(
            "/evolution/jobs/{job_id}/candidates/{candidate_id}",
            get(handle_get_candidate),
        )
        .route("/evolution/stream", post(handle_stream))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Validate the configuration, build the engine, and serve until shutdown.
pub async fn run_gateway(host: &str, port: u16, config: &Config) -> Result<()> {
    let engine = EvolutionEngine::from_config(config).context("invalid configuration")?;

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    run_gateway_with_listener(listener, AppState::new(Arc::new(engine))).await
}

/// Serve from a pre-bound listener (port 0 in tests).
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let provider = state.engine.provider_info().provider.clone();

    tracing::info!(%addr, %provider, "gateway listening");
    println!("◆ FrontSwatch evolution API listening on {addr} (provider: {provider})");
    println!("  GET  /healthz");
    println!("  GET  /llm/config");
    println!("  POST /evolution/jobs");
    println!("  GET  /evolution/jobs/{{jobId}}");
    println!("  GET  /evolution/jobs/{{jobId}}/candidates/{{candidateId}}");
    println!("  POST /evolution/stream → text/event-stream");
    println!("  Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("gateway shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvolutionConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Arc::new(EvolutionEngine::mock(
            EvolutionConfig::default(),
        ))))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), MAX_BODY_SIZE).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn body_limit_is_two_mebibytes() {
        assert_eq!(MAX_BODY_SIZE, 2_097_152);
    }

    #[test]
    fn timeout_is_30_seconds() {
        assert_eq!(REQUEST_TIMEOUT_SECS, 30);
    }

    #[tokio::test]
    async fn healthz_reports_service() {
        let (status, body) = get_json(app(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"ok": true, "service": SERVICE_NAME}));
    }

    #[tokio::test]
    async fn llm_config_never_leaks_secrets() {
        let (status, body) = get_json(app(), "/llm/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "mock");
        assert!(body.get("apiKey").is_none());
    }

    #[tokio::test]
    async fn unknown_job_is_404() {
        let (status, body) = get_json(app(), "/evolution/jobs/evo_nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Job not found");

        let (status, body) = get_json(app(), "/evolution/jobs/evo_nope/candidates/cand_0001_abcdef").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Candidate not found");
    }
}
