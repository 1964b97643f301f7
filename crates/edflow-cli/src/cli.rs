//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "edflow",
    version,
    about = "ED patient-flow CSV transforms and KPI worker",
    long_about = "Transform emergency-department CSV exports into normalized visit records,\n\
                  shift-day statistics and ED summaries.\n\n\
                  `serve` runs the newline-delimited JSON worker used by dashboards."
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
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer JSON requests, one per line, on stdout.
    Serve(ServeArgs),

    /// Transform a visit export and show the latest shift days.
    Transform(TransformArgs),

    /// Summarize an ED export (legacy, snapshot or hybrid).
    EdSummary(EdSummaryArgs),
}

#[derive(Parser)]
pub struct ServeArgs {
    /// Read requests from a file instead of stdin.
    #[arg(long = "input", value_name = "PATH")]
    pub input: Option<PathBuf>,
}

#[derive(Parser)]
pub struct TransformArgs {
    /// Visit export to transform.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// JSON file holding transform options (csvSettings, calculations, ...).
    #[arg(long = "options", value_name = "JSON_FILE")]
    pub options: Option<PathBuf>,

    /// Number of latest shift days to show.
    #[arg(long = "days", value_name = "N", default_value_t = 7)]
    pub days: usize,

    /// Rows between progress updates.
    #[arg(long = "progress-step", value_name = "ROWS")]
    pub progress_step: Option<usize>,

    /// Print the full result as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct EdSummaryArgs {
    /// ED export to summarize.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// JSON file holding transform options.
    #[arg(long = "options", value_name = "JSON_FILE")]
    pub options: Option<PathBuf>,

    /// Print the full result as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
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
