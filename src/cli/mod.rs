//! The plotline Command-Line Interface.
//!
//! This module wires the standard command set, the type registry and a
//! stdout [`Session`] together and dispatches the chosen subcommand.

use std::rc::Rc;

use crate::cli::args::{Command, PlotlineArgs};
use crate::cli::output::StdoutSink;
use crate::commands::standard::standard_commands;
use crate::commands::CommandSet;
use crate::context::ExecutionContext;
use crate::parser::{CommandFileParser, CommandLineParser};
use crate::script::ProcessScriptHost;
use crate::session::Session;
use crate::surface::TranscriptSurface;
use crate::types::TypeRegistry;
use crate::PlotlineError;

pub mod args;
pub mod output;

/// The command bare `exec` tokens are handed to.
pub const DEFAULT_COMMAND: &str = "plot";

/// Runs one CLI invocation.
pub fn run(args: PlotlineArgs) -> Result<(), PlotlineError> {
    let types = Rc::new(TypeRegistry::standard()?);
    let commands = Rc::new(standard_commands()?);

    let mut file_parser = CommandFileParser::new();
    if args.no_legacy {
        file_parser = file_parser.without_legacy_detection();
    }
    let session = Session::new(Rc::clone(&commands), Rc::clone(&types))
        .with_surface(TranscriptSurface::new(StdoutSink, args.format.into()))
        .with_script_host(ProcessScriptHost::new(args.script_interpreter.as_str()))
        .with_file_parser(file_parser);

    match args.command {
        Command::Exec {
            no_default_plot,
            tokens,
        } => handle_exec(session, commands, &types, !no_default_plot, tokens),
        Command::Run { files } => handle_run(session, &files),
        Command::ListCommands => Ok(output::print_commands(&commands)?),
        Command::ListTypes => Ok(output::print_types(&types)?),
    }
}

/// Handles the `exec` subcommand.
fn handle_exec(
    mut session: Session,
    commands: Rc<CommandSet>,
    types: &TypeRegistry,
    default_plot: bool,
    tokens: Vec<String>,
) -> Result<(), PlotlineError> {
    let mut parser = CommandLineParser::new(commands, types)?;
    if default_plot {
        parser = parser.with_default_command(DEFAULT_COMMAND)?;
    }
    let stray = parser.parse(tokens, &mut session)?;
    for token in stray {
        session.warn(&format!("ignoring stray argument '{token}'"));
    }
    finish(session)
}

/// Handles the `run` subcommand.
fn handle_run(mut session: Session, files: &[std::path::PathBuf]) -> Result<(), PlotlineError> {
    for file in files {
        tracing::info!(file = %file.display(), "running command file");
        session.run_file(file)?;
    }
    finish(session)
}

fn finish(mut session: Session) -> Result<(), PlotlineError> {
    session.finish()?;
    tracing::debug!(warnings = session.warnings().len(), "session finished");
    Ok(())
}
