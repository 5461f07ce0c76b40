//! Command-line interface definition for idcontrol.
//!
//! This module defines the CLI structure using clap derive macros,
//! including all subcommands and their arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::api::ApplicationStatus;
use crate::client::RequestMethod;
use crate::config::{LogLevel, ENV_CONFIG_PATH};

/// idcontrol - Document verification back-office client
///
/// Talks to the verification API through a resilient request engine
/// (timeouts, retry with backoff, per-endpoint circuit breaker) and can
/// serve a health endpoint for container orchestration.
#[derive(Debug, Parser)]
#[command(name = "idcontrol")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level requested on the command line, if any.
    pub fn log_level(&self) -> Option<LogLevel> {
        if self.quiet {
            return Some(LogLevel::Error);
        }

        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the health endpoint
    Serve(ServeArgs),

    /// Send one request through the request engine
    Request(RequestArgs),

    /// List verification applications
    Applications(ApplicationsArgs),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments for the `serve` subcommand.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Arguments for the `request` subcommand.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_parser = parse_method)]
    pub method: RequestMethod,

    /// Path relative to the API base URL, or an absolute URL
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Extra header, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Bearer token
    #[arg(long, env = "IDCONTROL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl RequestArgs {
    /// Extra headers as a map; later duplicates win.
    pub fn header_map(&self) -> HashMap<String, String> {
        self.headers.iter().cloned().collect()
    }
}

/// Reviewer queue to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReviewerRole {
    /// Financier review queue
    Financier,
    /// MVD (police) review queue
    Mvd,
}

/// Arguments for the `applications` subcommand.
#[derive(Debug, Args)]
pub struct ApplicationsArgs {
    /// Review queue
    #[arg(value_enum)]
    pub role: ReviewerRole,

    /// Application status
    #[arg(short, long, default_value = "pending", value_parser = parse_status)]
    pub status: ApplicationStatus,

    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Bearer token
    #[arg(long, env = "IDCONTROL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show the current configuration
    Show,
}

fn parse_method(s: &str) -> Result<RequestMethod, String> {
    s.parse()
}

fn parse_status(s: &str) -> Result<ApplicationStatus, String> {
    s.parse()
}

/// Parses `Name: value`.
fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("Invalid header '{}'. Expected 'Name: value'", s))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid header '{}'. Header name is empty", s));
    }

    Ok((name.to_string(), value.trim().to_string()))
}
