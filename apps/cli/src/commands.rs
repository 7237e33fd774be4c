//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::info;

use clauseforge_analysis::HttpCompletionProvider;
use clauseforge_core::{
    DocumentOutcome, ProcessConfig, ProgressReporter, ingest_documents, process_documents,
};
use clauseforge_risk::{ProfileRegistry, RiskEngine};
use clauseforge_shared::{
    AppConfig, CandidateStatus, DocumentStatus, ScoredClause, init_config, load_config,
    validate_api_key,
};
use clauseforge_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ClauseForge — extract, review, and risk-score contract clauses.
#[derive(Parser)]
#[command(
    name = "clauseforge",
    version,
    about = "Turn raw contract documents into a reviewed, reusable clause library.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Initialize the config file with defaults.
    Init,

    /// Ingest contract text files as source documents.
    Ingest {
        /// Files to ingest.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run the clause extraction pipeline over uploaded documents.
    Process {
        /// Process every document still in the uploaded state.
        #[arg(long, conflicts_with = "ids")]
        all: bool,

        /// Specific document IDs to process.
        ids: Vec<String>,

        /// Jurisdiction whose taxonomy to classify against.
        #[arg(long)]
        country: Option<String>,
    },

    /// Review clause candidates.
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// List standard clause templates.
    Templates {
        /// Only show templates for this country code.
        #[arg(long)]
        country: Option<String>,
    },

    /// Risk-score a set of classified clauses for a jurisdiction.
    Assess {
        /// JSON file with clauses[] and an optional countryCode.
        #[arg(long)]
        file: PathBuf,

        /// Target jurisdiction (overrides the file's countryCode).
        #[arg(long)]
        country: Option<String>,
    },
}

/// Candidate review subcommands.
#[derive(Subcommand)]
pub(crate) enum ReviewAction {
    /// List pending candidates.
    List,
    /// Promote a candidate into a standard clause.
    Approve {
        /// Candidate ID.
        id: String,

        /// Country code to file the standard clause under.
        #[arg(long)]
        country: Option<String>,
    },
    /// Reject a candidate (terminal).
    Reject {
        /// Candidate ID.
        id: String,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "clauseforge=info",
        1 => "clauseforge=debug",
        _ => "clauseforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => cmd_init().await,
        Command::Ingest { files } => cmd_ingest(&files).await,
        Command::Process { all, ids, country } => cmd_process(all, ids, country).await,
        Command::Review { action } => match action {
            ReviewAction::List => cmd_review_list().await,
            ReviewAction::Approve { id, country } => cmd_review_approve(&id, country).await,
            ReviewAction::Reject { id } => cmd_review_reject(&id).await,
        },
        Command::Templates { country } => cmd_templates(country.as_deref()).await,
        Command::Assess { file, country } => cmd_assess(&file, country).await,
    }
}

/// Expand a leading `~/` and open the configured database read-write.
async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let raw = &config.defaults.db_path;
    let path = match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .ok_or_else(|| eyre!("could not determine home directory"))?
            .join(rest),
        None => PathBuf::from(raw),
    };
    Ok(Storage::open(&path).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_ingest(files: &[PathBuf]) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let mut texts = Vec::with_capacity(files.len());
    for file in files {
        let text = std::fs::read_to_string(file)
            .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
        texts.push(text);
    }

    info!(count = files.len(), "ingesting documents");
    let outcomes =
        ingest_documents(&storage, &texts, config.pipeline.max_fallback_paragraphs).await;

    println!();
    for (file, outcome) in files.iter().zip(&outcomes) {
        println!(
            "  {:<10} {} ({} clauses){}",
            outcome.status.as_str(),
            file.display(),
            outcome.clause_count,
            outcome
                .document_id
                .as_deref()
                .map(|id| format!("  id={id}"))
                .unwrap_or_default(),
        );
        for issue in &outcome.issues {
            println!("             ! {issue}");
        }
    }
    println!();

    Ok(())
}

async fn cmd_process(all: bool, ids: Vec<String>, country: Option<String>) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;
    let storage = open_storage(&config).await?;

    let ids = if all {
        storage
            .list_documents()
            .await?
            .into_iter()
            .filter(|d| d.status == DocumentStatus::Uploaded)
            .map(|d| d.id)
            .collect()
    } else {
        ids
    };

    if ids.is_empty() {
        return Err(eyre!("nothing to process: pass document IDs or --all"));
    }

    let provider = HttpCompletionProvider::new(&config.provider)?;
    let process_config = ProcessConfig::from_app_config(&config, country);

    info!(count = ids.len(), country = %process_config.country_code, "processing documents");

    let reporter = CliProgress::new();
    let report =
        process_documents(&storage, &provider, &process_config, &ids, &reporter).await?;
    reporter.finish();

    println!();
    for doc in &report.documents {
        println!(
            "  {}  clauses={} saved={} duplicates={}  {:?}",
            doc.document_id, doc.total_clauses, doc.saved_clauses, doc.duplicates, doc.status,
        );
    }
    println!();
    println!(
        "  {} documents: {} processed, {} failed",
        report.summary.total, report.summary.successful, report.summary.failed
    );
    if !report.summary.categories.is_empty() {
        let breakdown = report
            .summary
            .categories
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Categories: {breakdown}");
    }
    println!();

    Ok(())
}

async fn cmd_review_list() -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let candidates = storage.list_candidates(Some(CandidateStatus::Pending)).await?;
    if candidates.is_empty() {
        println!("No pending candidates.");
        return Ok(());
    }

    println!();
    for candidate in &candidates {
        println!(
            "  {}  [{}] {} (confidence {:.2}){}",
            candidate.id,
            candidate.category,
            candidate.title,
            candidate.confidence,
            if candidate.needs_review {
                "  needs review"
            } else {
                ""
            },
        );
    }
    println!();
    println!("  {} pending candidate(s)", candidates.len());

    Ok(())
}

async fn cmd_review_approve(id: &str, country: Option<String>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let country = country.unwrap_or_else(|| config.defaults.country_code.clone());

    let standard = storage.promote_candidate(id, &country).await?;
    println!(
        "Promoted to standard clause {} [{}] {}",
        standard.id, standard.category, standard.title
    );
    Ok(())
}

async fn cmd_review_reject(id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    storage.reject_candidate(id).await?;
    println!("Rejected candidate {id}");
    Ok(())
}

async fn cmd_templates(country: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let clauses = storage.list_standard_clauses(country).await?;
    if clauses.is_empty() {
        println!("No standard clauses yet.");
        return Ok(());
    }

    println!();
    for clause in &clauses {
        println!(
            "  {}  [{}/{}] {} (used {}x)",
            clause.id, clause.country_code, clause.category, clause.title, clause.usage_count,
        );
    }
    println!();

    Ok(())
}

/// Input shape for `assess`: classified clauses plus a target jurisdiction.
#[derive(Debug, Deserialize)]
struct AssessInput {
    clauses: Vec<AssessClause>,
    #[serde(default, alias = "countryCode")]
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssessClause {
    category: String,
    #[serde(alias = "riskScore")]
    risk_score: f64,
    #[serde(default)]
    content: String,
}

async fn cmd_assess(file: &Path, country: Option<String>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let raw = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let input: AssessInput =
        serde_json::from_str(&raw).map_err(|e| eyre!("invalid assess input: {e}"))?;

    let country = country
        .or(input.country_code)
        .unwrap_or_else(|| config.defaults.country_code.clone());

    // A profile stored for this jurisdiction overrides the built-in one.
    let mut registry = ProfileRegistry::new();
    if let Some(profile) = storage.get_profile(&country).await? {
        registry.upsert(profile);
    }

    let clauses: Vec<ScoredClause> = input
        .clauses
        .into_iter()
        .map(|c| ScoredClause {
            category: c.category,
            risk_score: c.risk_score,
            content: c.content,
        })
        .collect();

    let assessment = RiskEngine::new(registry).assess(&clauses, &country);
    println!("{}", serde_json::to_string_pretty(&assessment)?);

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Pipeline progress rendered as an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn clause_processed(&self, document_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Analyzing [{current}/{total}] {document_id}"));
    }

    fn document_done(&self, outcome: &DocumentOutcome) {
        self.spinner.set_message(format!(
            "Finished {} ({} saved, {} duplicates)",
            outcome.document_id, outcome.saved_clauses, outcome.duplicates
        ));
    }
}
