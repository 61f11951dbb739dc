//! Command-line surface
//!
//! Every scaling option is optional; unset options fall back to the
//! configuration file.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use mqscaler_core::domain::PolicyOverrides;

use crate::config::{expand_path, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "mqscaler")]
#[command(about = "Launch queue consumers on demand based on queue depth", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Consumer name, as configured under [consumers.<name>]
    pub consumer: String,

    /// Configuration file (TOML)
    #[arg(short, long, env = "MQSCALER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum number of consumers
    #[arg(long = "min-consumers", alias = "min")]
    pub min_consumers: Option<u32>,

    /// Maximum number of consumers
    #[arg(long = "max-consumers", alias = "max")]
    pub max_consumers: Option<u32>,

    /// Backlog per consumer before scaling up (also passed to workers)
    #[arg(short, long)]
    pub messages: Option<u32>,

    /// Seconds between checks
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Maximum number of iterations (0 = run until stopped)
    #[arg(long = "max-iterations", alias = "iterations")]
    pub max_iterations: Option<u64>,

    /// Worker sub-command to run
    #[arg(long)]
    pub command: Option<String>,

    /// Prefix for the worker command line (e.g. "nice -n 10")
    #[arg(short, long, allow_hyphen_values = true)]
    pub prefix: Option<String>,

    /// File receiving the workers' output
    #[arg(long = "log-destination", alias = "log")]
    pub log_destination: Option<String>,

    /// Routing key passed to workers
    #[arg(short, long)]
    pub route: Option<String>,

    /// Memory limit passed to workers
    #[arg(short = 'l', long = "memory-limit")]
    pub memory_limit: Option<u32>,

    /// Pass --without-signals to workers
    #[arg(short, long = "without-signals")]
    pub without_signals: bool,

    /// Log every launch and pass --debug to workers
    #[arg(short, long)]
    pub debug: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, env = "MQSCALER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, colored
    Pretty,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// Configuration file to read, and whether it must exist
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (expand_path(DEFAULT_CONFIG_PATH), false),
        }
    }

    /// Options given on the command line, to merge over the configuration
    pub fn overrides(&self) -> PolicyOverrides {
        PolicyOverrides {
            min_consumers: self.min_consumers,
            max_consumers: self.max_consumers,
            messages: self.messages,
            poll_interval: self.interval.map(Duration::from_secs),
            max_iterations: self.max_iterations,
            subcommand: self.command.clone(),
            prefix: self
                .prefix
                .as_deref()
                .map(|p| p.split_whitespace().map(str::to_string).collect()),
            log_destination: self.log_destination.as_deref().map(expand_path),
            route: self.route.clone(),
            memory_limit: self.memory_limit,
            without_signals: self.without_signals.then_some(true),
            debug: self.debug.then_some(true),
        }
    }
}
