//! Gateway served on an ephemeral port and driven over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use frontswatch::config::EvolutionConfig;
use frontswatch::core::evolution::EvolutionEngine;
use frontswatch::gateway::{AppState, run_gateway_with_listener};

async fn spawn_gateway() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(Arc::new(EvolutionEngine::mock(EvolutionConfig::default())));
    tokio::spawn(async move {
        run_gateway_with_listener(listener, state).await.unwrap();
    });
    format!("http://{addr}")
}

async fn poll_until_done(client: &reqwest::Client, base: &str, job_id: &str) -> Value {
    for _ in 0..300 {
        let view: Value = client
            .get(format!("{base}/evolution/jobs/{job_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if view["status"] == "COMPLETED" || view["status"] == "FAILED" {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

#[tokio::test]
async fn health_and_provider_endpoints() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{base}/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"ok": true, "service": "frontswatch-evolution"}));

    let info: Value = client
        .get(format!("{base}/llm/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["provider"], "mock");
    assert_eq!(info["hasApiKey"], false);
}

#[tokio::test]
async fn job_lifecycle_over_http() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{base}/evolution/jobs"))
        .json(&json!({
            "targetUiId": "settings",
            "generationConfig": {"familyCount": 3, "variantsPerFamily": 3}
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let job_id = created["jobId"].as_str().unwrap().to_string();
    assert!(job_id.starts_with("evo_"));
    assert_eq!(created["status"], "QUEUED");

    let view = poll_until_done(&client, &base, &job_id).await;
    assert_eq!(view["status"], "COMPLETED");
    assert_eq!(view["progress"], 100);
    assert_eq!(view["totalCandidates"], 9);
    assert!(view["errorSummary"].is_null());
    assert_eq!(view["paramGeneration"]["count"], 9);

    let top_id = view["topCandidates"][0]["candidateId"].as_str().unwrap();
    let response = client
        .get(format!("{base}/evolution/jobs/{job_id}/candidates/{top_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let candidate: Value = response.json().await.unwrap();
    assert_eq!(candidate["candidateId"], top_id);
    assert!(candidate["designDNA"]["palette"].is_object());

    let missing = client
        .get(format!("{base}/evolution/jobs/{job_id}/candidates/cand_9999_ffffff"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stream_endpoint_emits_ordered_sse_frames() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/evolution/stream"))
        .json(&json!({
            "preferenceStream": [
                {"type": "like", "value": "editorial swiss layouts"},
                {"type": "pin", "familyId": "editorial/swiss"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "text/event-stream"
    );

    let body = response.text().await.unwrap();
    let frames: Vec<(&str, Value)> = body
        .split("\n\n")
        .filter(|frame| !frame.is_empty())
        .map(|frame| {
            let mut lines = frame.lines();
            let name = lines.next().unwrap().strip_prefix("event: ").unwrap();
            let data = lines.next().unwrap().strip_prefix("data: ").unwrap();
            (name, serde_json::from_str(data).unwrap())
        })
        .collect();

    assert_eq!(frames[0].0, "stream.started");
    assert_eq!(frames[0].1["receivedPreferenceEvents"], 2);
    assert_eq!(frames[1].0, "preference.processed");
    assert_eq!(frames[2].1["type"], "pin");
    assert_eq!(frames[3].0, "preferences.expanded");
    assert_eq!(frames[3].1["mode"], "exploitation");

    let last = frames.last().unwrap();
    assert_eq!(last.0, "generation.completed");
    let terminal = frames
        .iter()
        .filter(|(name, _)| *name == "generation.completed" || *name == "generation.failed")
        .count();
    assert_eq!(terminal, 1);
}

#[tokio::test]
async fn malformed_job_body_is_rejected() {
    let base = spawn_gateway().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/evolution/jobs"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
