// src/main.rs
// Doggy Detective CLI - classify a dog photo against a remote breed classifier

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use doggy_detective::{
    ClientConfig, Controller, HttpTransport, ImageAsset, Snapshot, Workflow, WorkflowPhase, report,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "doggy-detective")]
#[command(about = "Upload a dog photo and get ranked breed predictions")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.doggy-detective/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level written to stderr
    #[arg(long, global = true, env = "DOGGY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an image file
    Classify {
        /// Image to upload
        file: PathBuf,

        /// Print the full text report
        #[arg(long)]
        report: bool,

        /// Print a one-line share message
        #[arg(long)]
        share: bool,

        /// Print the final state as JSON
        #[arg(long)]
        json: bool,

        /// Retries to issue when a failure is retryable
        #[arg(long, default_value = "0")]
        retries: u32,
    },

    /// Check that the classifier service is up
    Health,

    /// Show the effective configuration
    Config,
}

fn init_tracing(level: &str) -> Result<()> {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run_classify(
    config: &ClientConfig,
    file: &Path,
    retries: u32,
    show_report: bool,
    show_share: bool,
    as_json: bool,
) -> Result<()> {
    let asset = ImageAsset::from_path(file)?;
    let transport = HttpTransport::new(config)?;
    info!(endpoint = transport.endpoint(), "Classifying {}", file.display());

    let mut workflow = Workflow::new(transport, Controller::from_config(config));
    let mut snapshot = workflow.classify(asset).await;

    let mut remaining = retries;
    while snapshot.retry_offered && remaining > 0 {
        remaining -= 1;
        info!(attempts_left = remaining, "Retrying classification");
        workflow.retry();
        snapshot = workflow.settled().await;
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot, show_report, show_share);
    }

    match (&snapshot.phase, &snapshot.failure) {
        (WorkflowPhase::Succeeded, _) => Ok(()),
        (_, Some(failure)) => Err(anyhow!("classification failed ({})", failure.kind)),
        (phase, None) => Err(anyhow!("classification ended in unexpected phase {:?}", phase)),
    }
}

fn print_snapshot(snapshot: &Snapshot, show_report: bool, show_share: bool) {
    if let Some(result) = &snapshot.result {
        if show_report {
            println!(
                "{}",
                report::render_report(result, chrono::Local::now().naive_local())
            );
        } else {
            for (i, prediction) in result.iter().enumerate() {
                println!("{:>2}. {:<32} {:>5.1}%", i + 1, prediction.breed, prediction.confidence);
            }
        }
        if show_share {
            println!();
            println!("{}", report::share_text(result));
        }
    } else if let Some(failure) = &snapshot.failure {
        eprintln!("Ruff! Something went wrong. {}", failure.message);
        if failure.retryable {
            eprintln!("This failure is retryable; pass --retries to try again.");
        }
    }
}

async fn run_health(config: &ClientConfig) -> Result<()> {
    let transport = HttpTransport::new(config)?;
    match transport.health().await {
        Ok(raw) => {
            println!("{}", serde_json::to_string_pretty(&raw.body)?);
            Ok(())
        }
        Err(failure) => Err(anyhow!("classifier unavailable: {}", failure)),
    }
}

fn run_config(config: &ClientConfig) {
    println!("endpoint:          {}", config.classify_url());
    println!("timeout:           {:?}", config.timeout);
    println!("connect timeout:   {:?}", config.connect_timeout);
    println!("max upload bytes:  {}", config.max_upload_bytes);
    println!("confidence scale:  {:?}", config.confidence_scale);
    println!();
    println!("{}", config.validate().report());
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = ClientConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify {
            file,
            report,
            share,
            json,
            retries,
        } => run_classify(&config, &file, retries, report, share, json).await,
        Commands::Health => run_health(&config).await,
        Commands::Config => {
            run_config(&config);
            Ok(())
        }
    }
}
