//! Preference stream → generation run, reported as ordered progress events.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use super::board::family_label;
use super::engine::EvolutionEngine;
use super::preferences::{PreferenceEvent, derive_generation_config};
use super::types::{DiversityRules, EvolutionJob, EvolutionMode, EvolutionResult, GenerationConfig};

pub const DEFAULT_BASE_THEME_ID: &str = "default";
pub const DEFAULT_TARGET_UI_ID: &str = "default-ui";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ui_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_theme_id: Option<String>,
    #[serde(default)]
    pub generation_config: GenerationConfig,
    #[serde(default)]
    pub preference_stream: Vec<PreferenceEvent>,
}

/// One progress notification. Serializes to its payload only; the name is
/// carried by [`EvolutionEvent::name`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvolutionEvent {
    #[serde(rename_all = "camelCase")]
    StreamStarted {
        stream_id: String,
        received_preference_events: usize,
        target_ui_id: String,
    },
    #[serde(rename_all = "camelCase")]
    PreferenceProcessed {
        index: usize,
        #[serde(rename = "type")]
        kind: String,
        value: Option<String>,
        family_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PreferencesExpanded {
        mode: EvolutionMode,
        focus_families: Vec<String>,
        param_set_count: u32,
        diversity_rules: DiversityRules,
    },
    #[serde(rename_all = "camelCase")]
    FamilyDerived {
        family_id: String,
        label: String,
        /// Named directly by the events rather than found by broadening.
        seed: bool,
    },
    #[serde(rename_all = "camelCase")]
    GenerationStarted {
        job_id: String,
        mode: EvolutionMode,
        requested_candidates: u32,
    },
    #[serde(rename_all = "camelCase")]
    FamilyGenerated {
        family_id: String,
        label: String,
        count: usize,
    },
    #[serde(rename_all = "camelCase")]
    CandidateSelected {
        candidate_id: String,
        family_id: String,
        rank: Option<u32>,
        score: f64,
    },
    #[serde(rename_all = "camelCase")]
    GenerationCompleted {
        job_id: String,
        total_candidates: usize,
        top_candidates: usize,
        board_families: usize,
    },
    GenerationFailed {
        message: String,
    },
}

impl EvolutionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamStarted { .. } => "stream.started",
            Self::PreferenceProcessed { .. } => "preference.processed",
            Self::PreferencesExpanded { .. } => "preferences.expanded",
            Self::FamilyDerived { .. } => "family.derived",
            Self::GenerationStarted { .. } => "generation.started",
            Self::FamilyGenerated { .. } => "family.generated",
            Self::CandidateSelected { .. } => "candidate.selected",
            Self::GenerationCompleted { .. } => "generation.completed",
            Self::GenerationFailed { .. } => "generation.failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GenerationCompleted { .. } | Self::GenerationFailed { .. }
        )
    }

    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: &EvolutionEvent);
}

/// Forwards events into a tokio channel; a dropped receiver is ignored.
pub struct ChannelEventSink {
    sender: mpsc::Sender<EvolutionEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: mpsc::Sender<EvolutionEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: &EvolutionEvent) {
        if self.sender.send(event.clone()).await.is_err() {
            tracing::debug!(event = event.name(), "event receiver dropped");
        }
    }
}

#[derive(Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<EvolutionEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<EvolutionEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &EvolutionEvent) {
        self.events.lock().await.push(event.clone());
    }
}

/// One `{"event": name, "data": payload}` JSON object per line.
pub struct JsonLinesSink {
    writer: Arc<dyn Fn(&str) + Send + Sync>,
}

impl JsonLinesSink {
    pub fn stdout() -> Self {
        Self {
            writer: Arc::new(|line| println!("{line}")),
        }
    }

    pub fn with_writer(writer: Arc<dyn Fn(&str) + Send + Sync>) -> Self {
        Self { writer }
    }

    pub fn render(event: &EvolutionEvent) -> String {
        serde_json::json!({ "event": event.name(), "data": event.payload() }).to_string()
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn emit(&self, event: &EvolutionEvent) {
        (self.writer)(&Self::render(event));
    }
}

fn short_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

/// Translate preferences, run one generation, and report progress to `sink`.
///
/// Exactly one terminal event is emitted: `generation.completed` with the
/// returned result, or `generation.failed` with the returned error.
pub async fn run_evolution_stream(
    engine: &EvolutionEngine,
    request: &StreamRequest,
    sink: &dyn EventSink,
) -> Result<EvolutionResult> {
    let stream_id = format!("stream_{}", short_hex(10));
    let target_ui_id = request
        .target_ui_id
        .clone()
        .unwrap_or_else(|| DEFAULT_TARGET_UI_ID.to_string());
    let events = &request.preference_stream;

    tracing::info!(%stream_id, events = events.len(), "preference stream started");
    sink.emit(&EvolutionEvent::StreamStarted {
        stream_id,
        received_preference_events: events.len(),
        target_ui_id: target_ui_id.clone(),
    })
    .await;

    match stream_generation(engine, request, target_ui_id, sink).await {
        Ok(result) => Ok(result),
        Err(e) => {
            tracing::warn!("preference stream failed: {e:#}");
            sink.emit(&EvolutionEvent::GenerationFailed {
                message: format!("{e:#}"),
            })
            .await;
            Err(e)
        }
    }
}

async fn stream_generation(
    engine: &EvolutionEngine,
    request: &StreamRequest,
    target_ui_id: String,
    sink: &dyn EventSink,
) -> Result<EvolutionResult> {
    let events = &request.preference_stream;
    for (index, event) in events.iter().enumerate() {
        sink.emit(&EvolutionEvent::PreferenceProcessed {
            index,
            kind: event.kind_or_default().to_string(),
            value: event.value.clone(),
            family_id: event.family_id.clone(),
        })
        .await;
    }

    let derived = derive_generation_config(&request.generation_config, events);
    sink.emit(&EvolutionEvent::PreferencesExpanded {
        mode: derived.mode(),
        focus_families: derived.focus_families().to_vec(),
        param_set_count: derived.param_set_count(),
        diversity_rules: derived.diversity_rules,
    })
    .await;

    for family in derived.focus_families() {
        sink.emit(&EvolutionEvent::FamilyDerived {
            family_id: family.clone(),
            label: family_label(family),
            seed: derived.seed_families.contains(family),
        })
        .await;
    }

    let job = EvolutionJob {
        job_id: format!("evo_stream_{}", short_hex(18)),
        base_theme_id: request
            .base_theme_id
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_THEME_ID.to_string()),
        target_ui_id,
        config: derived.config.clone(),
    };

    sink.emit(&EvolutionEvent::GenerationStarted {
        job_id: job.job_id.clone(),
        mode: derived.mode(),
        requested_candidates: derived.param_set_count(),
    })
    .await;

    let result = engine.run(&job).await?;

    for family in &result.genre_board {
        sink.emit(&EvolutionEvent::FamilyGenerated {
            family_id: family.family_id.clone(),
            label: family.label.clone(),
            count: family.candidates.len(),
        })
        .await;
    }

    for candidate in &result.top_candidates {
        sink.emit(&EvolutionEvent::CandidateSelected {
            candidate_id: candidate.candidate_id.clone(),
            family_id: candidate.visual_family_id.clone(),
            rank: candidate.rank,
            score: candidate.scores.score,
        })
        .await;
    }

    sink.emit(&EvolutionEvent::GenerationCompleted {
        job_id: job.job_id,
        total_candidates: result.total_candidates,
        top_candidates: result.top_candidates.len(),
        board_families: result.genre_board.len(),
    })
    .await;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvolutionConfig;

    fn names(events: &[EvolutionEvent]) -> Vec<&'static str> {
        events.iter().map(EvolutionEvent::name).collect()
    }

    #[test]
    fn events_serialize_to_bare_payloads() {
        let event = EvolutionEvent::PreferenceProcessed {
            index: 0,
            kind: "pin".to_string(),
            value: None,
            family_id: Some("calm/y2k".to_string()),
        };
        assert_eq!(
            event.payload(),
            serde_json::json!({"index": 0, "type": "pin", "value": null, "familyId": "calm/y2k"})
        );
        assert_eq!(
            JsonLinesSink::render(&EvolutionEvent::GenerationFailed { message: "x".into() }),
            r#"{"data":{"message":"x"},"event":"generation.failed"}"#
        );
    }

    #[tokio::test]
    async fn stream_emits_events_in_stage_order() {
        let engine = EvolutionEngine::mock(EvolutionConfig::default());
        let sink = CollectingEventSink::new();
        let request = StreamRequest {
            target_ui_id: Some("landing".to_string()),
            preference_stream: vec![
                PreferenceEvent {
                    kind: Some("pin".to_string()),
                    family_id: Some("premium/swiss".to_string()),
                    ..PreferenceEvent::default()
                },
                PreferenceEvent {
                    value: Some("something bold and retro".to_string()),
                    ..PreferenceEvent::default()
                },
            ],
            ..StreamRequest::default()
        };

        let result = run_evolution_stream(&engine, &request, &sink).await.unwrap();
        let events = sink.events().await;
        let order = names(&events);

        assert_eq!(order[0], "stream.started");
        assert_eq!(&order[1..3], ["preference.processed", "preference.processed"]);
        assert_eq!(order[3], "preferences.expanded");
        let derived = order.iter().filter(|n| **n == "family.derived").count();
        assert_eq!(derived, 6);
        assert_eq!(order[4 + derived], "generation.started");
        assert_eq!(*order.last().unwrap(), "generation.completed");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        let selected = order.iter().filter(|n| **n == "candidate.selected").count();
        assert_eq!(selected, result.top_candidates.len());
        let generated = order.iter().filter(|n| **n == "family.generated").count();
        assert_eq!(generated, result.genre_board.len());

        match &events[0] {
            EvolutionEvent::StreamStarted {
                stream_id,
                received_preference_events,
                target_ui_id,
            } => {
                assert!(stream_id.starts_with("stream_"));
                assert_eq!(stream_id.len(), "stream_".len() + 10);
                assert_eq!(*received_preference_events, 2);
                assert_eq!(target_ui_id, "landing");
            }
            other => panic!("unexpected first event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_lines_sink_writes_one_line_per_event() {
        let lines = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let captured = Arc::clone(&lines);
        let sink = JsonLinesSink::with_writer(Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_string());
        }));

        let engine = EvolutionEngine::mock(EvolutionConfig::default());
        run_evolution_stream(&engine, &StreamRequest::default(), &sink)
            .await
            .unwrap();

        let lines = lines.lock().unwrap();
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["event"], "stream.started");
        assert_eq!(first["data"]["targetUiId"], DEFAULT_TARGET_UI_ID);
        let last: serde_json::Value = serde_json::from_str(lines.last().unwrap()).unwrap();
        assert_eq!(last["event"], "generation.completed");
    }

    #[tokio::test]
    async fn failed_run_ends_with_single_failure_event() {
        let engine = EvolutionEngine::mock(EvolutionConfig::default());
        let sink = CollectingEventSink::new();
        let request = StreamRequest {
            generation_config: GenerationConfig {
                llm_provider: Some("nova".to_string()),
                ..GenerationConfig::default()
            },
            ..StreamRequest::default()
        };

        let err = run_evolution_stream(&engine, &request, &sink).await.unwrap_err();
        assert!(err.to_string().contains("\"nova\" is not configured"));

        let events = sink.events().await;
        let order = names(&events);
        assert_eq!(order[0], "stream.started");
        assert!(order.contains(&"generation.started"));
        assert_eq!(order.iter().filter(|n| **n == "generation.failed").count(), 1);
        assert!(!order.contains(&"generation.completed"));
        assert!(!order.contains(&"candidate.selected"));
        match events.last() {
            Some(EvolutionEvent::GenerationFailed { message }) => {
                assert_eq!(*message, format!("{err:#}"));
            }
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelEventSink::new(tx);
        sink.emit(&EvolutionEvent::GenerationFailed {
            message: "boom".to_string(),
        })
        .await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.name(), "generation.failed");
    }
}
