use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use morebetter_core::candidate::read_reference_file;
use morebetter_core::{
    load_config, validate_config, CandidateSource, Config, Credentials, FfprobeTagChecker,
    GazelleClient, Ledger, MktorrentPackager, OrchestratorConfig, PipelineEncoder,
    SanitizedConfig, Selection, SelectionMode, StdinConfirmer, TrackerApi, TranscodeOrchestrator,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "morebetter", version)]
#[command(about = "Transcode lossless releases into the formats their edition is missing", long_about = None)]
struct Args {
    /// Release permalinks to process instead of discovering candidates
    references: Vec<String>,

    /// File with one release permalink per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "MOREBETTER_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Produce at most one format per release
    #[arg(long)]
    single: bool,

    /// Parallel track encodes
    #[arg(short, long)]
    threads: Option<usize>,

    /// Package and deliver without uploading
    #[arg(long)]
    no_upload: bool,

    /// Do not check FLAC sources for an unlabelled 24-bit encoding
    #[arg(long = "no-24bit-edit")]
    no_24bit_edit: bool,

    /// Candidate discovery mode (snatched, uploaded, both, seeding, all, none)
    #[arg(short, long)]
    mode: Option<SelectionMode>,

    /// Mark the given releases as processed and exit
    #[arg(long)]
    skip: bool,

    /// One-time password for two-factor login
    #[arg(long)]
    totp: Option<String>,

    /// Ledger file, overriding the configured path
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Config summary with secrets redacted.
fn describe_config(config: &Config) -> String {
    format!("{:?}", SanitizedConfig::from(config))
}

async fn run(args: Args) -> Result<()> {
    info!("morebetter {}", VERSION);

    info!("Loading configuration from {:?}", args.config);
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Effective configuration: {}", describe_config(&config));

    let ledger_path = args
        .ledger
        .clone()
        .unwrap_or_else(|| config.paths.ledger.clone());
    let mut ledger = Ledger::load(ledger_path).await;

    if args.skip {
        return skip_references(&args, &mut ledger).await;
    }

    let tracker = Arc::new(
        GazelleClient::new(&config.tracker).context("Failed to create tracker client")?,
    );
    let session = tracker
        .authenticate(
            &Credentials {
                username: config.tracker.username.clone(),
                password: config.tracker.password.clone(),
            },
            args.totp.as_deref(),
        )
        .await
        .with_context(|| format!("Failed to log in to {}", config.tracker.endpoint))?;
    info!("Logged in as user {}", session.user_id);

    let selection = selection(&args, &config)?;
    let batch = CandidateSource::new(
        tracker.as_ref(),
        config.media_filter().context("Invalid media filter")?,
    )
    .resolve(&selection, ledger.ids())
    .await
    .context("Failed to resolve candidates")?;

    if batch.is_empty() {
        info!("No candidates to process");
        return Ok(());
    }

    let orchestrator = TranscodeOrchestrator::new(
        orchestrator_config(&args, &config)?,
        tracker,
        Arc::new(PipelineEncoder::new(config.tools.clone())),
        Arc::new(MktorrentPackager::new(config.tools.mktorrent.clone())),
        Arc::new(FfprobeTagChecker::new(config.tools.ffprobe.clone())),
        Arc::new(StdinConfirmer),
    );

    let report = orchestrator.run(&batch, &mut ledger).await;
    if report.formats_failed() > 0 {
        warn!("{} formats failed, see the log above", report.formats_failed());
    }
    Ok(())
}

/// Explicit references win over a reference file, which wins over discovery.
fn selection(args: &Args, config: &Config) -> Result<Selection> {
    if !args.references.is_empty() {
        return Ok(Selection::Explicit(args.references.clone()));
    }
    if let Some(file) = &args.file {
        return Ok(Selection::File(file.clone()));
    }
    let mode = match args.mode {
        Some(mode) => mode,
        None => config.selection_mode().context("Invalid candidate mode")?,
    };
    Ok(Selection::Mode(mode))
}

fn orchestrator_config(args: &Args, config: &Config) -> Result<OrchestratorConfig> {
    let mut resolved =
        OrchestratorConfig::from_config(config).context("Failed to resolve format directories")?;

    resolved.single_format = args.single;
    if let Some(threads) = args.threads {
        resolved.max_workers = threads.max(1);
    }
    if args.no_upload {
        resolved.upload = false;
    }
    if args.no_24bit_edit {
        resolved.check_twenty_four_bit = false;
    }
    Ok(resolved)
}

async fn skip_references(args: &Args, ledger: &mut Ledger) -> Result<()> {
    let mut references = args.references.clone();
    if let Some(file) = &args.file {
        references.extend(read_reference_file(file).await?);
    }
    if references.is_empty() {
        warn!("--skip given without any release references");
        return Ok(());
    }

    let marked = ledger
        .mark_processed(&references)
        .await
        .with_context(|| format!("Failed to write ledger {:?}", ledger.path()))?;
    info!(
        "Marked {} releases as processed ({} total in ledger)",
        marked.len(),
        ledger.len()
    );
    Ok(())
}
