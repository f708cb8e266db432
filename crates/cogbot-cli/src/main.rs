//! Cogbot CLI — entry point.
//!
//! # Commands
//!
//! - `cogbot run [--logs]` — connect to Discord and run all cogs
//! - `cogbot status` — show configuration summary
//! - `cogbot jira <query>` — look up an issue report from the terminal

mod helpers;
mod run;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use cogbot_cogs::jira::{Jira, JiraReply};
use cogbot_core::config::load_config;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// 🤖 Cogbot — help-channel triage, feeds and issue lookup for Discord
#[derive(Parser)]
#[command(name = "cogbot", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.cogbot/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the bot until Ctrl+C
    Run {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration status
    Status,

    /// Look up a report number or search the issue tracker
    Jira {
        /// Report number (`4`, `MC-4`) or free-text search
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(helpers::expand_tilde);

    match cli.command {
        Commands::Run { logs } => {
            init_logging(logs);
            run::run(config_path).await
        }
        Commands::Status => status::run(config_path.as_deref()),
        Commands::Jira { query, logs } => {
            init_logging(logs);
            run_jira(config_path, &query.join(" ")).await
        }
    }
}

// ─────────────────────────────────────────────
// Jira command
// ─────────────────────────────────────────────

async fn run_jira(config_path: Option<PathBuf>, query: &str) -> Result<()> {
    let config = load_config(config_path.as_deref());
    let jira = Jira::new(&config.jira)?;

    match jira
        .lookup(query)
        .await
        .with_context(|| format!("jira lookup failed for '{query}'"))?
    {
        JiraReply::Report { content, embed } => helpers::print_embed(&content, &embed),
        JiraReply::Search { url } => println!("{url}"),
    }
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("cogbot=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
