//! Command-line interface for rps_server.

use clap::{Parser, Subcommand};
use rps_sessions::PolicyKind;
use std::path::PathBuf;

/// Rock-paper-scissors session server with MCP interface
#[derive(Parser, Debug)]
#[command(name = "rps_server")]
#[command(about = "Start and cancel rock-paper-scissors sessions, one per caller", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the cancellability policy (unjoined or unrestricted)
    #[arg(long, global = true)]
    pub cancel_policy: Option<PolicyKind>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP session server (stdio mode)
    Server,

    /// Run the MCP session server over streamable HTTP
    Http {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
}
