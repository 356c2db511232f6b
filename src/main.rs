//! PII Shield - masking client
//!
//! Enter or upload text, choose which kinds of personal data to redact, and
//! review the masked result from the masking service.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pii_shield::{
    ClipboardManager,
    Config,
    FileUpload,
    HttpPiiClient,
    MaskingSession,
    PiiService,
    RequestStatus,
    dashboard::Dashboard,
    segment::masked_span_count,
};

#[derive(Parser)]
#[command(name = "pii-shield")]
#[command(author = "PII Shield Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mask personally identifiable information in text and documents")]
struct Cli {
    /// Masking service base URL (overrides config and PII_SHIELD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the dashboard GUI
    Dashboard,

    /// Mask text given as argument, file, clipboard, or stdin
    Mask {
        /// Text to mask; read from stdin when no other source is given
        text: Option<String>,

        /// Extract text from this document first
        #[arg(long, short, conflicts_with_all = ["text", "clipboard"])]
        file: Option<PathBuf>,

        /// Read the text from the clipboard
        #[arg(long, conflicts_with = "text")]
        clipboard: bool,

        /// Only use these category ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Turn off these category ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Add a custom category (repeatable)
        #[arg(long = "add-category")]
        add_category: Vec<String>,

        /// Copy the masked text to the clipboard
        #[arg(long)]
        copy: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the text the service extracts from a document
    Extract {
        /// Document to upload
        path: PathBuf,
    },

    /// Check whether the masking service is reachable
    Health,

    /// List the default PII categories
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    match cli.command {
        Some(Commands::Dashboard) | None => run_dashboard(config)?,
        Some(Commands::Mask {
            text,
            file,
            clipboard,
            only,
            exclude,
            add_category,
            copy,
            json,
        }) => {
            let source = match (text, file, clipboard) {
                (Some(text), _, _) => TextSource::Literal(text),
                (None, Some(path), _) => TextSource::File(path),
                (None, None, true) => TextSource::Clipboard,
                (None, None, false) => TextSource::Stdin,
            };
            let options = MaskOptions { only, exclude, add_category, copy, json };
            mask(&config, source, options).await?
        }
        Some(Commands::Extract { path }) => extract(&config, &path).await?,
        Some(Commands::Health) => health(&config).await?,
        Some(Commands::Categories) => list_categories(),
    }

    Ok(())
}

/// Run the dashboard GUI
fn run_dashboard(config: Config) -> Result<()> {
    info!("Starting PII Shield dashboard...");

    let client = HttpPiiClient::from_config(&config)?;
    Dashboard::run(client, config, tokio::runtime::Handle::current())
        .map_err(|e| anyhow::anyhow!("Dashboard error: {}", e))?;

    Ok(())
}

enum TextSource {
    Literal(String),
    File(PathBuf),
    Clipboard,
    Stdin,
}

struct MaskOptions {
    only: Vec<String>,
    exclude: Vec<String>,
    add_category: Vec<String>,
    copy: bool,
    json: bool,
}

/// Drive one session from text acquisition to printed result
async fn mask(config: &Config, source: TextSource, options: MaskOptions) -> Result<()> {
    let client = HttpPiiClient::from_config(config)?;
    let mut session = MaskingSession::new();

    match source {
        TextSource::Literal(text) => session.set_source_text(text),
        TextSource::Clipboard => session.set_source_text(ClipboardManager::get_text()?),
        TextSource::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            session.set_source_text(text);
        }
        TextSource::File(path) => {
            let upload = FileUpload::from_path(&path)?;
            session.acquire_from_file(&client, upload).await;
            if let Some(message) = session.error_message() {
                bail!("{}", message);
            }
        }
    }

    for label in &options.add_category {
        if let Err(e) = session.add_category(label) {
            eprintln!("Skipping category {:?}: {}", label, e);
        }
    }
    select_categories(&mut session, &options.only, &options.exclude)?;

    // Validation failures surface as errors here
    session.request_mask(&client).await?;

    match session.status() {
        RequestStatus::Succeeded(outcome) => {
            if options.json {
                let response = serde_json::json!({
                    "masked_text": outcome.masked_text,
                    "detections": outcome.detections,
                    "summary": session.detection_tally(),
                    "redactions": masked_span_count(&outcome.masked_text),
                });
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", outcome.masked_text);
                print_tally(&session);
            }

            if options.copy {
                ClipboardManager::set_text(&outcome.masked_text)?;
                eprintln!("Copied masked text to clipboard");
            }
            Ok(())
        }
        _ => {
            let message = session
                .error_message()
                .unwrap_or_else(|| "Masking did not complete".to_string());
            bail!("{}", message)
        }
    }
}

/// Apply `--only` / `--exclude` to the session's categories
fn select_categories(session: &mut MaskingSession, only: &[String], exclude: &[String]) -> Result<()> {
    let known: HashSet<String> = session.categories().iter().map(|c| c.id.clone()).collect();
    for id in only.iter().chain(exclude) {
        if !known.contains(id) {
            bail!("Unknown category: {} (see `pii-shield categories`)", id);
        }
    }

    let selection: Vec<(String, bool)> = session
        .categories()
        .iter()
        .map(|c| {
            let on = (only.is_empty() || only.contains(&c.id)) && !exclude.contains(&c.id);
            (c.id.clone(), on)
        })
        .collect();
    for (id, on) in selection {
        session.set_category_active(&id, on);
    }
    Ok(())
}

fn print_tally(session: &MaskingSession) {
    let tally = session.detection_tally();
    if tally.is_empty() {
        eprintln!("\nNo PII detected.");
        return;
    }
    eprintln!("\nDetections:");
    for (category, count) in tally {
        eprintln!("  {:<16} {}", category, count);
    }
}

/// Print extracted document text
async fn extract(config: &Config, path: &Path) -> Result<()> {
    let client = HttpPiiClient::from_config(config)?;
    let mut session = MaskingSession::new();

    session.acquire_from_file(&client, FileUpload::from_path(path)?).await;
    if let Some(message) = session.error_message() {
        bail!("{}", message);
    }

    println!("{}", session.source_text());
    Ok(())
}

/// Report service availability
async fn health(config: &Config) -> Result<()> {
    let client = HttpPiiClient::from_config(config)?;

    if client.is_available().await {
        println!("Online: {}", client.base_url());
        Ok(())
    } else {
        println!("Offline: {}", client.base_url());
        std::process::exit(1);
    }
}

/// List the default categories
fn list_categories() {
    let session = MaskingSession::new();

    println!("PII categories:\n");
    for category in session.categories().iter() {
        println!("  {:<14} {}", category.id, category.label);
    }
    println!("\nAdd your own with --add-category \"Passport Number\"");
}
