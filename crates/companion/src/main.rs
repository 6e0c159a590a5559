//! tabfloat Companion
//!
//! Native messaging host started by the browser. It keeps floated popup
//! windows above all other windows.
//!
//! Run with `install --extension-id <id>` once to register it with the browser.

mod config;
mod host;
mod install;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use host::RetryPolicy;
use install::Browser;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tabfloat_platform_win32::make_window_topmost;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tabfloat-companion")]
#[command(author, version, about = "Keep floated browser tabs above other windows")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Origin of the calling extension, passed by the browser
    origin: Option<String>,

    /// Handle of the calling browser window, passed by Chrome on Windows
    #[arg(long = "parent-window")]
    parent_window: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the companion as a native messaging host
    Install {
        /// Id of the extension allowed to launch the companion
        #[arg(long)]
        extension_id: String,
        /// Browser to register with
        #[arg(long, value_enum, default_value = "chrome")]
        browser: Browser,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Open the log file for appending, creating its directory if needed.
fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.logging.path();
    let writer = match open_log_file(&path) {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(e) => {
            // Stdout belongs to the browser.
            eprintln!("Failed to open log file {}: {}. Logging to stderr.", path.display(), e);
            BoxMakeWriter::new(std::io::stderr)
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&config.behavior.log_level))
        .with_ansi(false)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Install {
        extension_id,
        browser,
    }) = cli.command
    {
        let path = install::install(&extension_id, browser)?;
        println!("Installed native messaging host manifest at {}", path.display());
        return Ok(());
    }

    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });
    let config_warnings = config.validate();

    init_logging(&config)?;
    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!(
        "tabfloat companion starting (origin: {}, parent window: {})",
        cli.origin.as_deref().unwrap_or("none"),
        cli.parent_window.as_deref().unwrap_or("none")
    );

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    host::run(
        &mut stdin,
        &mut stdout,
        RetryPolicy::from(&config.topmost),
        make_window_topmost,
    )
    .await
    .context("Native messaging connection failed")?;

    info!("tabfloat companion stopped");
    Ok(())
}
