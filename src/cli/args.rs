//! Defines the command-line arguments and subcommands for the plotline CLI.
//!
//! This module uses the `clap` crate with its "derive" feature. The plotting
//! language itself is not described here: the tokens after `exec --` are
//! handed untouched to the command-line tokenizer.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::surface::TranscriptFormat;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "plotline",
    version,
    about = "A command-driven plotting front-end for argv and command files."
)]
pub struct PlotlineArgs {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Program that runs `ruby ... ruby end` blocks.
    #[arg(long, global = true, default_value = "ruby")]
    pub script_interpreter: String,

    /// Never hand command files to the legacy parser.
    #[arg(long, global = true)]
    pub no_legacy: bool,

    /// How drawing operations are printed.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

impl From<Format> for TranscriptFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => TranscriptFormat::Text,
            Format::Json => TranscriptFormat::Json,
        }
    }
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run plotting commands given as flags, e.g. `exec -- --title Hi data.dat`.
    Exec {
        /// Report bare tokens instead of plotting them.
        #[arg(long)]
        no_default_plot: bool,
        /// Flags, arguments and datasets, after `--`.
        #[arg(last = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
    },
    /// Interpret one or more command files.
    Run {
        /// Command files, run in order in one session.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List all available commands with their flags and options.
    ListCommands,
    /// List all registered argument types.
    ListTypes,
}
