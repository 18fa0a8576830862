//! In-memory evolution job store.
//!
//! Jobs run on background tokio tasks; callers poll [`JobStore::get_job`].
//! Nothing is persisted: restarting the process drops every job. Finished
//! jobs are kept until the retention limit evicts the oldest of them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::evolution::stream::{DEFAULT_BASE_THEME_ID, DEFAULT_TARGET_UI_ID};
use crate::core::evolution::{
    Candidate, EvolutionEngine, EvolutionJob, EvolutionResult, FamilyBoardEntry, GenerationConfig,
    ParamGeneration,
};
use crate::error::JobError;

const RUNNING_PROGRESS: u8 = 35;
const COMPLETED_PROGRESS: u8 = 100;
/// Finished jobs kept in memory. Queued and running jobs are never evicted.
pub const MAX_RETAINED_JOBS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Body of `POST /evolution/jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_theme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ui_id: Option<String>,
    #[serde(default)]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(flatten)]
    pub job: EvolutionJob,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub result: Option<EvolutionResult>,
    pub error_summary: Option<String>,
}

impl JobRecord {
    fn touch(&mut self, status: JobStatus, progress: u8) {
        self.status = status;
        self.progress = progress;
        self.updated_at = Utc::now();
    }

    pub fn status_view(&self) -> JobStatusView {
        let result = self.result.as_ref();
        JobStatusView {
            job_id: self.job.job_id.clone(),
            status: self.status,
            progress: self.progress,
            error_summary: self.error_summary.clone(),
            top_candidates: result.map(|r| r.top_candidates.clone()).unwrap_or_default(),
            total_candidates: result.map_or(0, |r| r.total_candidates),
            genre_board: result.map(|r| r.genre_board.clone()).unwrap_or_default(),
            param_generation: result.map(|r| r.param_generation.clone()),
            updated_at: self.updated_at,
        }
    }
}

/// Polling view of a job, without the full candidate population.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub error_summary: Option<String>,
    pub top_candidates: Vec<Candidate>,
    pub total_candidates: usize,
    pub genre_board: Vec<FamilyBoardEntry>,
    pub param_generation: Option<ParamGeneration>,
    pub updated_at: DateTime<Utc>,
}

/// `evo_` followed by 20 hex characters.
pub fn new_job_id() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(20);
    format!("evo_{hex}")
}

#[derive(Clone)]
pub struct JobStore {
    engine: Arc<EvolutionEngine>,
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
    max_finished: usize,
}

impl JobStore {
    pub fn new(engine: Arc<EvolutionEngine>) -> Self {
        Self::with_retention(engine, MAX_RETAINED_JOBS)
    }

    /// Keep at most `max_finished` completed or failed jobs. The check runs
    /// when a new job is created.
    pub fn with_retention(engine: Arc<EvolutionEngine>, max_finished: usize) -> Self {
        Self {
            engine,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            max_finished,
        }
    }

    /// Register a job and start it in the background. Returns the QUEUED record.
    pub async fn create_job(&self, request: CreateJobRequest) -> JobRecord {
        let now = Utc::now();
        let record = JobRecord {
            job: EvolutionJob {
                job_id: new_job_id(),
                base_theme_id: request
                    .base_theme_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| DEFAULT_BASE_THEME_ID.to_string()),
                target_ui_id: request
                    .target_ui_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| DEFAULT_TARGET_UI_ID.to_string()),
                config: request.generation_config,
            },
            status: JobStatus::Queued,
            progress: 0,
            created_at: now,
            updated_at: now,
            result: None,
            error_summary: None,
        };

        let job_id = record.job.job_id.clone();
        {
            let mut jobs = self.jobs.write().await;
            evict_finished(&mut jobs, self.max_finished);
            jobs.insert(job_id.clone(), record.clone());
        }
        tracing::info!(%job_id, "evolution job queued");

        let store = self.clone();
        let job = record.job.clone();
        tokio::spawn(async move { store.execute(job).await });

        record
    }

    async fn execute(&self, job: EvolutionJob) {
        self.update(&job.job_id, |record| {
            record.touch(JobStatus::Running, RUNNING_PROGRESS);
        })
        .await;

        match self.engine.run(&job).await {
            Ok(result) => {
                tracing::info!(job_id = %job.job_id, total = result.total_candidates, "evolution job completed");
                self.update(&job.job_id, move |record| {
                    record.result = Some(result);
                    record.touch(JobStatus::Completed, COMPLETED_PROGRESS);
                })
                .await;
            }
            Err(e) => {
                tracing::warn!(job_id = %job.job_id, "evolution job failed: {e:#}");
                let summary = format!("{e:#}");
                self.update(&job.job_id, move |record| {
                    record.error_summary = Some(summary);
                    let progress = record.progress;
                    record.touch(JobStatus::Failed, progress);
                })
                .await;
            }
        }
    }

    async fn update(&self, job_id: &str, apply: impl FnOnce(&mut JobRecord)) {
        if let Some(record) = self.jobs.write().await.get_mut(job_id) {
            apply(record);
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobRecord, JobError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// A candidate from a completed job's full population.
    pub async fn get_candidate(&self, job_id: &str, candidate_id: &str) -> Result<Candidate, JobError> {
        let jobs = self.jobs.read().await;
        let not_found = || JobError::CandidateNotFound {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
        };
        let record = jobs.get(job_id).ok_or_else(not_found)?;
        record
            .result
            .as_ref()
            .and_then(|result| {
                result
                    .all_candidates
                    .iter()
                    .find(|c| c.candidate_id == candidate_id)
            })
            .cloned()
            .ok_or_else(not_found)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

/// Drop the least recently finished jobs beyond `keep`.
fn evict_finished(jobs: &mut HashMap<String, JobRecord>, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, String)> = jobs
        .values()
        .filter(|record| record.status.is_finished())
        .map(|record| (record.updated_at, record.job.job_id.clone()))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort();
    let excess = finished.len() - keep;
    for (_, job_id) in finished.into_iter().take(excess) {
        jobs.remove(&job_id);
        tracing::debug!(%job_id, "evicted finished evolution job");
    }
}
