//! CLI module for DocuBot
//!
//! - `serve`: HTTP API server
//! - `ask`: answer a single question and exit

pub mod ask;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// DocuBot - verified answers from your documents
#[derive(Parser)]
#[command(name = "docubot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Answer one question from the configured sources
    Ask(ask::AskArgs),
}

/// Load `.env`, the layered configuration and the log subscriber
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    Ok(config)
}
