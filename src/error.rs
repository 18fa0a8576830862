use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `frontswatch`.
///
/// Library callers match on these to decide recovery strategy; pipeline
/// internals keep using `anyhow::Result` for context chains. Schema
/// violations in proposer output are not errors at all: they are recorded in
/// [`ParamValidation`](crate::core::evolution::ParamValidation).
#[derive(Debug, Error)]
pub enum FrontswatchError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Job store ───────────────────────────────────────────────────────
    #[error("job: {0}")]
    Job(#[from] JobError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("missing required secret for {label}: environment variable {env} is not set")]
    MissingSecret { label: String, env: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} returned an empty response")]
    EmptyResponse { provider: String },

    #[error("unparseable model output: {0}")]
    Parse(String),
}

// ─── Job store errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("candidate {candidate_id} not found in job {job_id}")]
    CandidateNotFound {
        job_id: String,
        candidate_id: String,
    },
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, FrontswatchError>;
