use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cerebro LLM provider tool
#[derive(Debug, Parser)]
#[command(name = "cerebro", about = "Talk to the configured LLM backend")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cerebro.toml", env = "CEREBRO_CONFIG")]
    pub config: PathBuf,

    /// Log filter directive, overriding `[telemetry].filter`
    #[arg(long, env = "RUST_LOG")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the configured backend answers
    Ping,
    /// Send a single message and print the reply
    Chat {
        /// User message
        message: String,
        /// System prompt
        #[arg(short, long)]
        system: Option<String>,
    },
    /// List the accepted provider identifiers
    Providers,
}
