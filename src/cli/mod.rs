//! Command-line interface for cloud-storage-dump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading (file, environment, arguments)
//! - Verbosity selection for logging

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::{ConfigError, Result};
use crate::export::FormatTag;

/// Dump a whole Elasticsearch index to Google Cloud Storage
#[derive(Parser, Debug)]
#[command(
    name = "cloud-storage-dump",
    version,
    about = "Dump a whole Elasticsearch index to Google Cloud Storage",
    long_about = "Scans every document of an Elasticsearch index, writes it as CSV, JSON or XLSX
and uploads the file to a Google Cloud Storage bucket as <INDEX>.<FORMAT>.

Connection settings come from the environment (CLOUD_STORAGE_BUCKET,
ELASTICSEARCH_HOST, ELASTICSEARCH_PORT, GOOGLE_APPLICATION_CREDENTIALS, ...)
or from a TOML configuration file."
)]
pub struct CliArgs {
    /// Index to dump
    #[arg(value_name = "INDEX", required_unless_present = "list_formats")]
    pub index: Option<String>,

    /// Output format (csv, json, xlsx)
    #[arg(short = 'f', long, value_name = "FORMAT", required_unless_present = "list_formats")]
    pub format: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Directory for temporary files (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Show a progress bar while scanning
    #[arg(long)]
    pub progress: bool,

    /// Verbose mode (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Print the supported formats and exit
    #[arg(long)]
    pub list_formats: bool,
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse process arguments and load configuration
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        config.apply_env()?;
        Self::apply_args_to_config(&mut config, &args);
        Ok(Self { args, config })
    }

    /// Build from already-parsed arguments and a configuration
    pub fn from_parts(args: CliArgs, mut config: Config) -> Self {
        Self::apply_args_to_config(&mut config, &args);
        Self { args, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Configuration file in use, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.args.config_file.as_deref()
    }

    /// Index and format requested on the command line
    pub fn job_request(&self) -> Result<(&str, &str)> {
        let index = self
            .args
            .index
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("INDEX".to_string()))?;
        let format = self
            .args
            .format
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("--format".to_string()))?;
        Ok((index, format))
    }

    /// Effective log level after verbosity flags
    pub fn log_level(&self) -> LogLevel {
        if self.args.very_verbose {
            LogLevel::Trace
        } else if self.args.verbose {
            LogLevel::Debug
        } else {
            self.config.logging.level
        }
    }

    /// Text printed for `--list-formats`
    pub fn formats_listing() -> String {
        FormatTag::ALL
            .iter()
            .map(|tag| format!("{}\t{}", tag.as_str(), tag.content_type()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(dir) = &args.scratch_dir {
            config.export.scratch_dir = Some(dir.clone());
        }
        if args.progress {
            config.export.progress = true;
        }
    }
}
