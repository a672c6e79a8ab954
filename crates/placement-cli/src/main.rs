//! placement - copy scheduling tool

use anyhow::Result;
use clap::{Parser, Subcommand};
use placement_cli::commands;
use placement_common::logging::{init_logging, LogConfig, LogLevel};
use placement_copy::config::CopyConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "placement")]
#[command(author, version, about = "Schedule replica copies and follow their transfer")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Build and log requests without submitting them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit copy requests for the replicas of a plan file
    Schedule {
        /// JSON replica plan
        #[arg(short, long)]
        plan: PathBuf,

        /// Identifier of the placement operation the requests belong to
        #[arg(long, default_value_t = 0)]
        operation_id: u64,

        /// Free-text comments attached to every request
        #[arg(short, long, default_value = "")]
        comments: String,
    },

    /// Show per-site progress of a submitted request
    Status {
        /// Request id assigned by the transfer service
        request_id: u64,
    },

    /// Create the request history table if it does not exist
    InitHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("placement")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let mut config = CopyConfig::load()?;
    if cli.dry_run {
        config.dry_run = true;
    }

    match cli.command {
        Command::Schedule {
            plan,
            operation_id,
            comments,
        } => commands::schedule(&config, &plan, operation_id, &comments).await?,
        Command::Status { request_id } => commands::status(&config, request_id).await?,
        Command::InitHistory => commands::init_history(&config).await?,
    }

    Ok(())
}
