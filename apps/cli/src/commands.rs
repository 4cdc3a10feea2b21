//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use eventloom_extract::{CompletionOptions, OpenAiCompletion, StructuredExtractor};
use eventloom_fetch::{BrowserBackend, ContentFetcher, ReaderBackend, RenderBackend};
use eventloom_pipeline::Pipeline;
use eventloom_shared::{
    AppConfig, Record, RecordKind, init_config, load_config, load_config_from, validate_api_key,
};
use eventloom_store::{AirtableBackend, RecordStore, TableNames};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Eventloom: turn community pages into structured records.
#[derive(Parser)]
#[command(
    name = "eventloom",
    version,
    about = "Fetch a page, extract an event or update record, and store it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path (defaults to ~/.eventloom/eventloom.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Record kind accepted on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum KindArg {
    Event,
    Update,
}

impl From<KindArg> for RecordKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Event => RecordKind::Event,
            KindArg::Update => RecordKind::Update,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Submit a page URL and run the full pipeline against it.
    Submit {
        /// Kind of record to extract.
        #[arg(value_enum)]
        kind: KindArg,

        /// Page URL to process.
        url: String,

        /// Identifier recorded as the submitter.
        #[arg(long, default_value = "cli")]
        requester: String,
    },

    /// List records stored within a recent window.
    Recent {
        /// Kind of record to list.
        #[arg(value_enum)]
        kind: KindArg,

        /// Window size in days (defaults per kind from config).
        #[arg(long)]
        days: Option<i64>,
    },

    /// Check that the record store is reachable.
    Health,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// stays clean for command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "eventloom=info",
        1 => "eventloom=debug",
        _ => "eventloom=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config, command, ..
    } = cli;
    let config_path = config.as_deref();

    match command {
        Command::Submit {
            kind,
            url,
            requester,
        } => cmd_submit(config_path, kind.into(), &url, &requester).await,
        Command::Recent { kind, days } => cmd_recent(config_path, kind.into(), days).await,
        Command::Health => cmd_health(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => Ok(load_config_from(p)?),
        None => Ok(load_config()?),
    }
}

// ---------------------------------------------------------------------------
// Component wiring
// ---------------------------------------------------------------------------

fn build_fetcher(config: &AppConfig) -> Result<ContentFetcher> {
    let backend: Arc<dyn RenderBackend> = match config.fetch.strategy.as_str() {
        "reader" => Arc::new(ReaderBackend::new(
            &config.fetch.reader_endpoint,
            config.fetch.timeout_secs,
        )?),
        "browser" => Arc::new(BrowserBackend::new(
            &config.fetch.browser_endpoint,
            config.fetch.timeout_secs,
        )?),
        other => {
            return Err(eyre!(
                "unknown fetch strategy '{other}': expected 'reader' or 'browser'"
            ));
        }
    };
    Ok(ContentFetcher::new(backend))
}

fn build_extractor(config: &AppConfig) -> Result<StructuredExtractor> {
    let api_key = validate_api_key(&config.model.api_key_env)?;
    let completion = OpenAiCompletion::new(
        &api_key,
        CompletionOptions {
            model: config.model.model.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
        },
    );
    Ok(StructuredExtractor::new(Arc::new(completion)))
}

fn build_store(config: &AppConfig) -> Result<RecordStore> {
    if config.store.base_id.is_empty() {
        return Err(eyre!(
            "store.base_id is not set. Run 'eventloom config init' and fill it in."
        ));
    }
    let api_key = validate_api_key(&config.store.api_key_env)?;
    let backend = AirtableBackend::new(&config.store.endpoint, &config.store.base_id, &api_key)?;
    let tables = TableNames {
        events: config.store.events_table.clone(),
        updates: config.store.updates_table.clone(),
    };
    Ok(RecordStore::new(Arc::new(backend), tables))
}

fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    Ok(Pipeline::new(
        Arc::new(build_fetcher(config)?),
        Arc::new(build_extractor(config)?),
        Arc::new(build_store(config)?),
    ))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_submit(
    config_path: Option<&Path>,
    kind: RecordKind,
    url: &str,
    requester: &str,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let pipeline = build_pipeline(&config)?;

    info!(kind = %kind, url, requester, "submitting page");

    let spinner = start_spinner(&format!("Processing {url}"));
    let outcome = pipeline.run(kind, url, requester).await;
    spinner.finish_and_clear();

    let outcome = outcome?;

    println!();
    println!("  Record stored successfully!");
    println!("  Submission: {}", outcome.submission_id);
    println!("  Record:     {}", outcome.record_id);
    match &outcome.record {
        Record::Event(event) => {
            println!("  Kind:       event");
            println!("  Title:      {}", event.title);
            println!("  Start:      {}", event.start_time);
            if let Some(end) = event.end_time {
                println!("  End:        {end}");
            }
            println!("  Location:   {}", event.location);
        }
        Record::Update(update) => {
            println!("  Kind:       update");
            println!("  Content:    {}", preview(&update.content));
        }
    }
    println!("  Time:       {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_recent(
    config_path: Option<&Path>,
    kind: RecordKind,
    days: Option<i64>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let store = build_store(&config)?;

    let days = days.unwrap_or(match kind {
        RecordKind::Event => config.defaults.event_days,
        RecordKind::Update => config.defaults.update_days,
    });

    info!(kind = %kind, days, "listing recent records");

    let records = store.recent(kind, days).await?;

    if records.is_empty() {
        println!("No {kind} records in the last {days} days.");
        return Ok(());
    }

    println!();
    for stored in &records {
        match &stored.record {
            Record::Event(event) => {
                println!(
                    "  {}  {}",
                    event.start_time.format("%Y-%m-%d %H:%M"),
                    event.title
                );
                println!("      {} | {}", event.location, stored.id);
            }
            Record::Update(update) => {
                println!(
                    "  {}  {}",
                    update.created_at.format("%Y-%m-%d %H:%M"),
                    preview(&update.content)
                );
                println!("      {}", stored.id);
            }
        }
    }
    println!();
    println!("  {} record(s) in the last {days} days.", records.len());
    println!();

    Ok(())
}

async fn cmd_health(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let store = build_store(&config)?;

    if store.health_check().await {
        println!("Record store reachable.");
        Ok(())
    } else {
        Err(eyre!("record store health check failed"))
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn start_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}

/// First line of `text`, truncated for terminal display.
fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 96;
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= MAX_CHARS {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(MAX_CHARS).collect();
        format!("{cut}...")
    }
}
