//! Modelport CLI — provision a model-import stack and stage a model into it.
//!
//! Single-shot subcommands over the core deploy orchestrator; exits 0 on
//! success and 1 with the error on stderr otherwise.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Modelport: provision a model-import stack and ship model weights into it
#[derive(Parser, Debug)]
#[command(name = "modelport", version, about, long_about = None)]
struct Cli {
    /// Stack name override
    #[arg(short, long)]
    stack_name: Option<String>,

    /// Template file override
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// AWS region override
    #[arg(short, long)]
    region: Option<String>,

    /// AWS credential profile to use
    #[arg(short, long)]
    profile: Option<String>,

    /// Model repository id override (e.g. org/model-name)
    #[arg(short, long)]
    model: Option<String>,

    /// Workspace directory holding .modelport/config.toml
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Provision the stack, stage the model, and trigger the import job
    Deploy,
    /// Download the model and upload it into the existing stack's bucket
    Stage,
    /// Trigger an import job for an already-staged artifact
    Import,
    /// Build the handler package, upload it, and converge the stack
    Package,
    /// Print the stack's output mapping as JSON
    Outputs,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "modelport", "modelport")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "modelport.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Load configuration
    let mut config = modelport_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(stack_name) = cli.stack_name {
        config.stack.name = stack_name;
    }
    if let Some(template) = cli.template {
        config.stack.template = template;
    }
    if let Some(region) = cli.region {
        config.aws.region = region;
    }
    if let Some(profile) = cli.profile {
        config.aws.profile = Some(profile);
    }
    if let Some(model) = cli.model {
        config.model.repo_id = model;
    }

    commands::handle_command(cli.command, &workspace, config).await
}
