use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::core::evolution::{
    EvolutionEngine, EvolutionJob, EvolutionMode, GenerationConfig, JsonLinesSink,
    PreferenceEvent, StreamRequest, run_evolution_stream,
};
use crate::gateway;
use crate::jobs::new_job_id;

/// Options for a single `generate` run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub count: Option<u32>,
    pub mode: Option<EvolutionMode>,
    pub focus_families: Vec<String>,
    pub family_count: Option<u32>,
    pub variants_per_family: Option<u32>,
    pub use_llm_aesthetic: bool,
    pub seed: Option<u64>,
    pub target_ui_id: Option<String>,
}

impl GenerateOptions {
    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            param_set_count: self.count,
            family_count: self.family_count,
            variants_per_family: self.variants_per_family,
            mode: self.mode,
            focus_families: self.focus_families.clone(),
            use_llm_aesthetic: self.use_llm_aesthetic,
            ..GenerationConfig::default()
        }
    }
}

/// Run one generation and return the result rendered as pretty JSON.
///
/// A seeded run uses a job id derived from the seed, so the same seed and
/// options render the same output.
pub async fn run_generate(config: &Config, options: &GenerateOptions) -> Result<String> {
    let mut config = config.clone();
    if options.seed.is_some() {
        config.evolution.seed = options.seed;
    }
    let engine = EvolutionEngine::from_config(&config).context("invalid configuration")?;

    let job = EvolutionJob {
        job_id: config
            .evolution
            .seed
            .map_or_else(new_job_id, |seed| format!("evo_seed_{seed}")),
        base_theme_id: "default".to_string(),
        target_ui_id: options
            .target_ui_id
            .clone()
            .unwrap_or_else(|| "default-ui".to_string()),
        config: options.generation_config(),
    };

    let result = engine.run(&job).await?;
    info!(
        job_id = %job.job_id,
        total = result.total_candidates,
        top = result.top_candidates.len(),
        "generation complete"
    );
    Ok(serde_json::to_string_pretty(&result)?)
}

async fn read_preference_events(path: Option<&Path>) -> Result<Vec<PreferenceEvent>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of preference events", path.display()))
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, &config).await
        }

        Commands::Generate {
            count,
            mode,
            focus,
            families,
            variants,
            llm_aesthetic,
            seed,
            target_ui,
        } => {
            let options = GenerateOptions {
                count,
                mode: mode.map(EvolutionMode::from),
                focus_families: focus,
                family_count: families,
                variants_per_family: variants,
                use_llm_aesthetic: llm_aesthetic,
                seed,
                target_ui_id: target_ui,
            };
            println!("{}", run_generate(&config, &options).await?);
            Ok(())
        }

        Commands::Stream { events, target_ui } => {
            let engine = Arc::new(
                EvolutionEngine::from_config(&config).context("invalid configuration")?,
            );
            let request = StreamRequest {
                target_ui_id: target_ui,
                preference_stream: read_preference_events(events.as_deref()).await?,
                ..StreamRequest::default()
            };
            run_evolution_stream(&engine, &request, &JsonLinesSink::stdout()).await?;
            Ok(())
        }

        Commands::Config => {
            config.validate()?;
            if let Some(path) = &config.config_path {
                info!(path = %path.display(), "loaded config");
            }
            println!("{}", serde_json::to_string_pretty(&config.provider_info())?);
            Ok(())
        }
    }
}
