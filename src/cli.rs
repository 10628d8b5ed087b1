//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Local prompt gateway - expose curated prompts to tool-calling clients
#[derive(Parser, Debug)]
#[command(name = "prompt-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "PROMPT_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PROMPT_GATEWAY_PORT", global = true)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "PROMPT_GATEWAY_HOST", global = true)]
    pub host: Option<String>,

    /// Prompt catalog file (YAML or JSON), overrides `prompts_file`
    #[arg(long, env = "PROMPT_GATEWAY_PROMPTS", global = true)]
    pub prompts: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "PROMPT_GATEWAY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "PROMPT_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Print fresh secure hashes for exposing prompts
    MintHash {
        /// How many hashes to print
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
}
