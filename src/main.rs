//! trialscribe - transcript-driven clinical trial matching
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! trialscribe store import-patient patient.json
//! trialscribe analyze --patient-id <id> --file visit.txt
//! trialscribe recommend --patient-id <id> --transcript-id <id> --output trials.csv
//! trialscribe trial NCT12345678
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! trialscribe serve --port 3000
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};
use trialscribe::api::{self, AppState};
use trialscribe::config::{LlmConfig, PipelineConfig, RegistryConfig, DEFAULT_MODEL};
use trialscribe::ctgov::{ClinicalTrialsGovClient, CTGOV_API_BASE};
use trialscribe::domain::{CandidateTrial, PatientProfile};
use trialscribe::llm::OpenAiClient;
use trialscribe::recommendation::{lookup_trial, RecommendationService};
use trialscribe::storage::{JsonFileStore, Storage};
use trialscribe::transcript::TranscriptAnalyzer;

/// Default OpenAI-compatible endpoint for the default model
const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

// ============================================================================
// CLI Definition
// ============================================================================

/// Clinical trial matching from patient transcripts
#[derive(Parser)]
#[command(name = "trialscribe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Store file (default: ~/.trialscribe_store.json)
    #[arg(long, global = true, env = "TRIALSCRIBE_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct LlmArgs {
    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_key: String,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    llm_model: String,
}

#[derive(Args, Debug, Clone)]
struct RegistryArgs {
    /// ClinicalTrials.gov API base URL
    #[arg(long, env = "CTGOV_BASE_URL", default_value = CTGOV_API_BASE)]
    ctgov_base_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the recommendation pipeline for a stored transcript
    Recommend {
        #[arg(long)]
        patient_id: String,

        #[arg(long)]
        transcript_id: String,

        /// Write the ranked trials to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rank the two partitions one after the other
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Analyze a raw transcript file and store it for a patient
    Analyze {
        #[arg(long)]
        patient_id: String,

        /// Transcript text file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Show one clinical trial (stored copy or registry)
    Trial {
        /// NCT id, e.g. NCT12345678
        id: String,

        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Manage the local store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Show store file path
    Path,
    /// Delete the store file
    Clear,
    /// Import a patient (or an array of patients) from a JSON file
    ImportPatient {
        /// JSON file
        file: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let store = open_store(cli.store.as_deref())?;

    match cli.command {
        Commands::Recommend {
            patient_id,
            transcript_id,
            output,
            sequential,
            llm,
            registry,
        } => {
            let config = PipelineConfig {
                concurrent_ranking: !sequential,
                ..Default::default()
            };
            let service = build_service(Arc::new(store), &llm, &registry, config)?;
            run_recommend(&service, &patient_id, &transcript_id, output.as_deref()).await
        }
        Commands::Analyze { patient_id, file, llm } => run_analyze(store, &llm, &patient_id, &file).await,
        Commands::Trial { id, registry } => run_trial(store, &registry, &id).await,
        Commands::Serve {
            port,
            host,
            llm,
            registry,
        } => {
            if !registry_client(&registry)?.health_check().await {
                warn!("ClinicalTrials.gov is not reachable, recommendations will fail until it is");
            }
            let service = build_service(Arc::new(store), &llm, &registry, PipelineConfig::default())?;
            run_server(service, host, port).await
        }
        Commands::Store { action } => handle_store(store, action).await,
    }
}

fn open_store(path: Option<&Path>) -> Result<JsonFileStore> {
    let store = match path {
        Some(path) => JsonFileStore::open(path),
        None => JsonFileStore::open_default(),
    };
    store.context("Failed to open store")
}

fn llm_client(args: &LlmArgs) -> Result<OpenAiClient> {
    let config = LlmConfig::new(&args.llm_base_url, &args.llm_key, &args.llm_model);
    OpenAiClient::new(config).context("Invalid LLM configuration")
}

fn registry_client(args: &RegistryArgs) -> Result<ClinicalTrialsGovClient> {
    let config = RegistryConfig {
        base_url: args.ctgov_base_url.clone(),
        ..Default::default()
    };
    ClinicalTrialsGovClient::new(config).context("Invalid ClinicalTrials.gov configuration")
}

fn build_service(
    store: Arc<dyn Storage>,
    llm: &LlmArgs,
    registry: &RegistryArgs,
    config: PipelineConfig,
) -> Result<RecommendationService> {
    let client = llm_client(llm)?;
    info!(model = %client.model(), "Using LLM");
    Ok(RecommendationService::new(
        store,
        Arc::new(registry_client(registry)?),
        Arc::new(client),
        config,
    ))
}

// ============================================================================
// Recommendation Pipeline
// ============================================================================

/// One CSV/console row per recommended trial
#[derive(Debug, Serialize)]
struct RecommendationRow {
    partition: &'static str,
    rank: usize,
    nct_id: String,
    title: String,
    status: String,
    phases: String,
    conditions: String,
    age_range: String,
    locations: String,
    sponsor: String,
}

impl RecommendationRow {
    fn new(partition: &'static str, rank: usize, trial: &CandidateTrial) -> Self {
        Self {
            partition,
            rank,
            nct_id: trial.external_id.clone(),
            title: trial.brief_title.clone(),
            status: trial.status.clone(),
            phases: trial.phases.join(", "),
            conditions: trial.conditions.join(", "),
            age_range: trial.age_range().unwrap_or_default(),
            locations: trial.locations_preview(),
            sponsor: trial.sponsor_name.clone().unwrap_or_default(),
        }
    }
}

async fn run_recommend(
    service: &RecommendationService,
    patient_id: &str,
    transcript_id: &str,
    output: Option<&Path>,
) -> Result<()> {
    service
        .create_recommended_trials(patient_id, transcript_id)
        .await
        .context("Recommendation pipeline failed")?;

    let trials = service.get_recommended_trials(transcript_id).await?;
    let rows: Vec<RecommendationRow> = trials
        .eligible
        .iter()
        .enumerate()
        .map(|(i, t)| RecommendationRow::new("eligible", i + 1, t))
        .chain(
            trials
                .uncertain
                .iter()
                .enumerate()
                .map(|(i, t)| RecommendationRow::new("uncertain", i + 1, t)),
        )
        .collect();

    println!(
        "Eligible: {}, uncertain: {}",
        trials.eligible.len(),
        trials.uncertain.len()
    );
    for row in &rows {
        println!("  [{} #{}] {} - {} ({})", row.partition, row.rank, row.nct_id, row.title, row.locations);
    }

    let usage = service.token_usage();
    println!(
        "LLM tokens: {} prompt + {} completion = {} total",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    );

    if let Some(path) = output {
        save_csv(path, &rows)?;
    }
    Ok(())
}

/// Save data to CSV file
fn save_csv<T: Serialize>(path: &Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        println!("No data to save to {:?}", path);
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for item in data {
        wtr.serialize(item).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}

// ============================================================================
// Transcripts & Trials
// ============================================================================

async fn run_analyze(store: JsonFileStore, llm: &LlmArgs, patient_id: &str, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let caller = trialscribe::llm::JudgmentCaller::new(
        Arc::new(llm_client(llm)?),
        PipelineConfig::default().max_tokens,
        PipelineConfig::default().judgment_timeout,
    );
    let analyzer = TranscriptAnalyzer::new(caller);

    let transcript_id = analyzer.ingest(&store, patient_id, &raw).await?;
    let transcript = store.get_transcript(&transcript_id).await?;

    println!("Transcript id: {}", transcript_id);
    println!("{}", serde_json::to_string_pretty(&transcript)?);
    Ok(())
}

async fn run_trial(store: JsonFileStore, registry: &RegistryArgs, id: &str) -> Result<()> {
    let client = registry_client(registry)?;
    let trial = lookup_trial(&store, &client, id).await?;
    println!("{}", serde_json::to_string_pretty(&trial)?);
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(service: RecommendationService, host: String, port: u16) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let analyzer = TranscriptAnalyzer::new(service.caller().clone());
    let app = api::router(Arc::new(AppState { service, analyzer }));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

// ============================================================================
// Store Management
// ============================================================================

async fn handle_store(store: JsonFileStore, action: StoreAction) -> Result<()> {
    match action {
        StoreAction::Path => {
            println!("Store file: {:?}", store.path());
        }
        StoreAction::Clear => {
            store.clear().await?;
            println!("Store cleared.");
        }
        StoreAction::ImportPatient { file } => {
            let content = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let value: serde_json::Value = serde_json::from_str(&content).context("Invalid patient JSON")?;
            let patients: Vec<PatientProfile> = if value.is_array() {
                serde_json::from_value(value)?
            } else {
                vec![serde_json::from_value(value)?]
            };

            for patient in patients {
                let name = patient.full_name();
                let id = store.put_patient(patient).await?;
                println!("Imported patient {} ({})", id, name);
            }
        }
    }
    Ok(())
}
