//! CLI argument definitions for the `mco` grouper.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use mco_classifier::ClusterMode;
use mco_model::Date;

#[derive(Parser)]
#[command(
    name = "mco",
    version,
    about = "MCO GHM grouper - Classify hospital stays into GHM and GHS",
    long_about = "Classify French MCO hospital stays into GHM and GHS.\n\n\
                  Reads the binary .tab rule tables and JSON stay files, and\n\
                  reports per-cluster results as a table, JSON or CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient values (birthdates) in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List decoded tables and the indexes built from them.
    Tables(TablesArgs),

    /// Classify stays into GHM and GHS.
    Classify(ClassifyArgs),

    /// Print the stay durations that can lead to each GHM.
    Constraints(ConstraintsArgs),
}

#[derive(Parser)]
pub struct TablesArgs {
    /// Table files or directories of .tab files.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Parser)]
pub struct ClassifyArgs {
    /// Table file or directory (repeatable).
    #[arg(long = "tables", short = 'T', value_name = "PATH", required = true)]
    pub tables: Vec<PathBuf>,

    /// JSON stay files.
    #[arg(value_name = "STAYS", required = true)]
    pub stays: Vec<PathBuf>,

    /// JSON unit authorizations of the facility.
    #[arg(long = "authorizations", value_name = "PATH")]
    pub authorizations: Option<PathBuf>,

    /// How consecutive stay records are grouped.
    #[arg(long = "cluster-mode", value_enum, default_value = "stay-modes")]
    pub cluster_mode: ClusterModeArg,

    /// Output format for results.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormatArg,

    /// Compare results with the expectations embedded in the stays.
    ///
    /// Exits with a non-zero code when any expectation is not met.
    #[arg(long = "test")]
    pub test: bool,
}

#[derive(Parser)]
pub struct ConstraintsArgs {
    /// Table file or directory (repeatable).
    #[arg(long = "tables", short = 'T', value_name = "PATH", required = true)]
    pub tables: Vec<PathBuf>,

    /// Use the index valid on this date (default: the most recent one).
    #[arg(long = "date", value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub date: Option<Date>,
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value).map_err(|error| error.to_string())
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ClusterModeArg {
    StayModes,
    BillId,
    Disable,
}

impl From<ClusterModeArg> for ClusterMode {
    fn from(value: ClusterModeArg) -> Self {
        match value {
            ClusterModeArg::StayModes => ClusterMode::StayModes,
            ClusterModeArg::BillId => ClusterMode::BillId,
            ClusterModeArg::Disable => ClusterMode::Disable,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Table,
    Json,
    Csv,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
