//! zkcheck CLI - end-to-end verification of the bridge deposit flow
//!
//! Usage:
//!   zkcheck run                 Probe circuit files and drive the deposit form
//!   zkcheck probe               Probe circuit files only
//!   zkcheck init [path]         Write the default zkcheck.toml
//!
//! Exit status: 0 when the verdict passes, 1 when it fails, 2 when the
//! harness itself could not run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zkcheck_core::config::CONFIG_FILE_NAME;
use zkcheck_core::HarnessConfig;
use zkcheck_harness::{Harness, Report};

#[derive(Parser)]
#[command(name = "zkcheck")]
#[command(author, version, about = "End-to-end verification of the ZK deposit flow")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe circuit files, then run the deposit workflow in a browser
    Run {
        /// Config file (defaults apply when missing)
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,

        /// Override the application base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Attach to a browser with remote debugging on this port
        #[arg(long, value_name = "PORT")]
        connect: Option<u16>,

        /// Also write the report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },

    /// Check that the circuit files are served, without a browser
    Probe {
        /// Config file (defaults apply when missing)
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: PathBuf,

        /// Override the application base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Write the default configuration
    Init {
        /// Destination file
        #[arg(default_value = CONFIG_FILE_NAME)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to install logger: {}", e);
        return ExitCode::from(2);
    }

    let outcome = match cli.command {
        Commands::Run {
            config,
            base_url,
            headed,
            connect,
            json,
        } => cmd_run(config, base_url, headed, connect, json).await,
        Commands::Probe { config, base_url } => cmd_probe(config, base_url).await,
        Commands::Init { path, force } => cmd_init(path, force).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(path: &Path, base_url: Option<String>) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(url) = base_url {
        config.base_url = url;
        config.validate().context("Invalid --base-url")?;
    }
    Ok(config)
}

async fn cmd_run(
    config_path: PathBuf,
    base_url: Option<String>,
    headed: bool,
    connect: Option<u16>,
    json: Option<PathBuf>,
) -> Result<bool> {
    let mut config = load_config(&config_path, base_url)?;
    if headed {
        config.browser.headless = false;
    }

    info!("Testing ZK deposit flow at {}", config.target_url());

    let mut harness = Harness::new(config);
    if let Some(port) = connect {
        harness = harness.connect_to(port);
    }

    let report = harness.run().await.context("Harness could not run")?;
    println!("{}", report.render());

    Ok(publish_report(&report, json.as_deref()).await)
}

/// Write the optional JSON copy of `report`; returns the verdict
///
/// The verdict is already decided here, so a failed write is only logged.
async fn publish_report(report: &Report, json: Option<&Path>) -> bool {
    if let Some(path) = json {
        let written = match serde_json::to_string_pretty(report) {
            Ok(body) => tokio::fs::write(path, body)
                .await
                .with_context(|| format!("Failed to write {}", path.display())),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to serialize report")),
        };
        match written {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => warn!("JSON report not saved: {:#}", e),
        }
    }

    report.passed()
}

async fn cmd_probe(config_path: PathBuf, base_url: Option<String>) -> Result<bool> {
    let config = load_config(&config_path, base_url)?;
    let harness = Harness::new(config);

    let results = harness.probe_only().await.context("Probe setup failed")?;

    println!("Circuit files at {}:", harness.config().base_url);
    for result in &results {
        let size = result
            .content_length
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {}: {} ({} bytes)", result.name, result.status, size);
        if let Some(error) = &result.error {
            println!("    {}", error);
        }
    }

    let ok = results.iter().all(|r| r.ok);
    println!(
        "\n  Circuit files accessible: {}",
        if ok { "YES" } else { "NO" }
    );
    Ok(ok)
}

async fn cmd_init(path: PathBuf, force: bool) -> Result<bool> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    HarnessConfig::write_default(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    println!("Edit base_url, resources and steps to match your deployment.");
    Ok(true)
}
