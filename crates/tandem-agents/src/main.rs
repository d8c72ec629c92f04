use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use tandem_agents::config::{check_endpoint, PairConfig};
use tandem_agents::providers::{HttpReviewer, HttpWriter};
use tandem_core::{
    AgentRegistry, PairOrchestrator, ThresholdConfig, WorkflowRecord, DEFAULT_PIPELINE_ITERATIONS,
};

#[derive(Parser)]
#[command(name = "tandem", about = "Writer/reviewer pair workflow driver")]
struct Cli {
    /// TOML config file; env vars and defaults apply otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bounded generate-review-refine pipeline once.
    Run {
        /// Task for the writer.
        prompt: String,
        /// File whose contents are passed as generation context.
        #[arg(long)]
        context: Option<PathBuf>,
        /// Refinement-cycle budget.
        #[arg(long, default_value_t = DEFAULT_PIPELINE_ITERATIONS)]
        max_iterations: u32,
    },
    /// Iterate until the review score converges above a floor.
    Converge {
        /// Task for the writer.
        prompt: String,
        /// File whose contents are passed as generation context.
        #[arg(long)]
        context: Option<PathBuf>,
        /// Review budget.
        #[arg(long, default_value_t = 5)]
        max_iterations: u32,
        /// Minimum acceptable review score, 0-100.
        #[arg(long, default_value_t = 80)]
        min_score: u8,
    },
    /// Probe both collaborator endpoints.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PairConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PairConfig::default(),
    };

    match cli.command {
        Command::Run {
            prompt,
            context,
            max_iterations,
        } => {
            let context = read_context(context.as_deref())?;
            let (registry, orchestrator) = build_pair(&config)?;
            let record = orchestrator
                .run_pipeline(&prompt, &context, max_iterations)
                .await
                .context("pair pipeline failed")?;
            info!(phase = %registry.phase(), "pipeline finished");
            print_record(&record)
        }
        Command::Converge {
            prompt,
            context,
            max_iterations,
            min_score,
        } => {
            let context = read_context(context.as_deref())?;
            let thresholds = ThresholdConfig {
                max_iterations,
                min_score,
            };
            let (registry, orchestrator) = build_pair(&config)?;
            let record = orchestrator
                .run_until_converged(&prompt, &context, thresholds)
                .await
                .context("convergence loop failed")?;
            info!(phase = %registry.phase(), "convergence loop finished");
            print_record(&record)
        }
        Command::Check => {
            for (role, url) in [
                ("writer", &config.writer.endpoint.url),
                ("reviewer", &config.reviewer.endpoint.url),
            ] {
                if check_endpoint(url).await {
                    info!(role, url = %url, "endpoint reachable");
                } else {
                    tracing::warn!(role, url = %url, "endpoint unreachable");
                }
            }
            Ok(())
        }
    }
}

type HttpPair = PairOrchestrator<HttpWriter, HttpReviewer>;

fn build_pair(config: &PairConfig) -> Result<(Arc<AgentRegistry>, HttpPair)> {
    let timeout = config.request_timeout();
    let writer = Arc::new(
        HttpWriter::new(config.writer.clone(), timeout).context("building writer client")?,
    );
    let reviewer = Arc::new(
        HttpReviewer::new(config.reviewer.clone(), timeout).context("building reviewer client")?,
    );
    let registry = Arc::new(AgentRegistry::new());
    let orchestrator = PairOrchestrator::new(registry.clone(), writer, reviewer);
    Ok((registry, orchestrator))
}

fn read_context(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading context from {}", path.display())),
        None => Ok(String::new()),
    }
}

fn print_record(record: &WorkflowRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("serializing workflow record")?;
    println!("{json}");
    Ok(())
}
