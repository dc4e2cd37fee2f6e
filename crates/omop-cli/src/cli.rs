//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "omop-mapper",
    version,
    about = "Derive OMOP CDM mapping rules from scan reports",
    long_about = "Derive structural mapping rules from scan-report concept assignments.\n\n\
                  Reads store and vocabulary snapshots as JSON, builds concepts from a\n\
                  vocabulary dictionary, reuses prior decisions across reports, and\n\
                  exports the generated rules as JSON and CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

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
    /// Process a scan report's tables: build, reuse, and regenerate.
    Process(ProcessArgs),

    /// Export a scan report's mapping rules as JSON and CSV.
    Rules(RulesArgs),

    /// Report hierarchy relatives of a report's concepts mapped elsewhere.
    Analyse(AnalyseArgs),
}

#[derive(Parser)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    /// Scan report whose tables are processed.
    #[arg(long = "report", value_name = "ID")]
    pub report: i64,

    /// Restrict processing to a single table.
    #[arg(long = "table", value_name = "ID")]
    pub table: Option<i64>,

    /// Vocabulary dictionary (table -> field -> vocabulary id) as JSON.
    #[arg(long = "dictionary", value_name = "PATH")]
    pub dictionary: Option<PathBuf>,

    /// Write the updated store snapshot back to its file.
    #[arg(long = "save")]
    pub save: bool,
}

#[derive(Parser)]
pub struct RulesArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    /// Scan report to export rules for.
    #[arg(long = "report", value_name = "ID")]
    pub report: i64,

    /// Output directory for rules.json / rules.csv (default: current).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Which export surfaces to write.
    #[arg(long = "format", value_enum, default_value = "both")]
    pub format: OutputFormatArg,

    /// Also write the rule-provenance graph (provenance.json).
    #[arg(long = "graph")]
    pub graph: bool,
}

#[derive(Parser)]
pub struct AnalyseArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    /// Scan report to analyse.
    #[arg(long = "report", value_name = "ID")]
    pub report: i64,
}

#[derive(Parser)]
pub struct SnapshotArgs {
    /// Mapping store snapshot (JSON).
    #[arg(long = "store", value_name = "PATH")]
    pub store: PathBuf,

    /// Vocabulary snapshot (JSON).
    #[arg(long = "vocab", value_name = "PATH")]
    pub vocab: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Json,
    Csv,
    Both,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
