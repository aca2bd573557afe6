//! AutoTag - automated tag filling for draft uploads.
//!
//! Main entry point for the autotag CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use autotag_cdp::{Browser, BrowserConfig};
use autotag_engine::{CdpDraftPage, Config, DraftPage, EngineError, Orchestrator};

/// AutoTag CLI.
#[derive(Parser)]
#[command(name = "autotag")]
#[command(about = "Fills in suggested tags for draft uploads through Chrome")]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ~/.autotag/config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process the draft page and keep watching navigation (default)
    Run {
        /// DevTools port to connect to
        #[arg(long)]
        port: Option<u16>,

        /// Launch Chrome headless if a launch is needed
        #[arg(long)]
        headless: bool,

        /// Chrome binary, overriding platform detection
        #[arg(long)]
        chrome: Option<PathBuf>,

        /// URL to open when no draft tab exists
        #[arg(long)]
        url: Option<String>,

        /// Process the page once and exit instead of watching navigation
        #[arg(long)]
        once: bool,
    },

    /// Attach to the draft tab and report its items without changing anything
    Check,
}

/// Get the .autotag directory path.
fn autotag_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".autotag"))
        .unwrap_or_else(|| PathBuf::from(".autotag"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.autotag/debug/ with daily rotation.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = autotag_dir().join("debug");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("autotag")
        .filename_suffix("log")
        .max_log_files(30) // Keep 30 days of logs
        .build(&log_dir)?;

    // Create a non-blocking writer for file output
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard in a static to keep it alive for the program duration
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(_guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer (human-readable text format with colors)
        .with(fmt::layer().with_target(true).with_ansi(true))
        // File layer (text format without colors)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => {
            let default_path = autotag_dir().join("config.toml");
            if default_path.exists() {
                info!("Using config from {}", default_path.display());
                Ok(Config::load(&default_path)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn browser_config_from(config: &Config) -> BrowserConfig {
    BrowserConfig {
        debug_port: config.browser.debug_port,
        profile_dir: config.browser.profile_dir.as_ref().map(PathBuf::from),
        headless: config.browser.headless,
        chrome_binary: config.browser.chrome_binary.as_ref().map(PathBuf::from),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        None => run(config, false).await,
        Some(Commands::Run {
            port,
            headless,
            chrome,
            url,
            once,
        }) => {
            if let Some(port) = port {
                config.browser.debug_port = port;
            }
            if headless {
                config.browser.headless = true;
            }
            if let Some(chrome) = chrome {
                config.browser.chrome_binary = Some(chrome.to_string_lossy().into_owned());
            }
            if let Some(url) = url {
                config.page.open_url = Some(url);
            }
            run(config, once).await
        }
        Some(Commands::Check) => check(config).await,
    }
}

/// Run the tagging pipeline against the draft tab.
async fn run(config: Config, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting autotag v{}", env!("CARGO_PKG_VERSION"));

    let browser = Browser::new(browser_config_from(&config));
    browser.connect().await?;

    let session = browser
        .attach_or_open(
            &config.page.draft_url_fragment,
            config.page.open_url.as_deref(),
        )
        .await?;
    info!(target_id = session.target_id(), "Attached to draft tab");

    let page = Arc::new(CdpDraftPage::new(session, &config));
    let orchestrator = Arc::new(Orchestrator::new(page, config));

    // Mirror status transitions to the log.
    let mut status_rx = orchestrator.subscribe();
    let status_task = tokio::spawn(async move {
        let mut last = String::new();
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            let line = format!(
                "{} ({}/{} done, {} failed)",
                status.last_message, status.done, status.total, status.failed
            );
            if line != last {
                info!("{}", line);
                last = line;
            }
        }
    });

    let work = {
        let orchestrator = orchestrator.clone();
        async move {
            orchestrator.start().await?;
            if !once {
                info!("Watching navigation, press Ctrl-C to stop");
                orchestrator.watch_navigation().await;
            }
            Ok::<(), EngineError>(())
        }
    };

    tokio::select! {
        result = work => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, stopping after the current group");
            orchestrator.stop();
            // Let in-flight items wind down before tearing the session apart.
            let grace = Duration::from_secs(30);
            let interrupted = Instant::now();
            while orchestrator.is_running() && interrupted.elapsed() < grace {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }

    status_task.abort();
    let status = orchestrator.snapshot();
    info!(done = status.done, failed = status.failed, "Shutting down");
    browser.close().await;
    Ok(())
}

/// Attach to the draft tab and print its items without touching them.
async fn check(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let browser = Browser::new(browser_config_from(&config));
    browser.connect().await?;

    let session = browser
        .attach_or_open(
            &config.page.draft_url_fragment,
            config.page.open_url.as_deref(),
        )
        .await?;

    println!("Page:  {}", session.title().await?);
    println!("URL:   {}", session.current_url().await?);

    let page = CdpDraftPage::new(session, &config);
    let items = page.find_items().await?;
    println!("Items: {}", items.len());

    for item in items {
        let title = page.item_title(item).await?;
        let count = page.tag_count(item).await?;
        let state = if page.is_processed(item).await? {
            "done"
        } else {
            "pending"
        };
        println!(
            "  #{:<3} {:<44} {:>2}/{} tags [{}]",
            item.index + 1,
            if title.is_empty() {
                "(untitled)".to_string()
            } else {
                title
            },
            count,
            config.run.max_tags,
            state
        );
    }

    browser.close().await;
    Ok(())
}
