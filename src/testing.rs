//! A recording [`ExecutionContext`] for exercising the front ends without a
//! drawing surface.
//!
//! Commands are never run: every dispatch is stored as a [`RecordedCall`]
//! holding the raw text the parser produced and the location that was
//! current at that point.

use std::rc::Rc;

use crate::commands::{CommandDescriptor, CommandSet};
use crate::context::{Binding, ExecutionContext, ParseOptions, SourceLocation, Variables};
use crate::{err_msg, PlotlineError};

/// One dispatched command, exactly as the parser handed it over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub args: Vec<String>,
    pub options: ParseOptions,
    pub location: SourceLocation,
}

#[derive(Debug, Default)]
pub struct RecordingContext {
    commands: CommandSet,
    location: SourceLocation,
    variables: Variables,
    pub calls: Vec<RecordedCall>,
    pub warnings: Vec<String>,
    pub scripts: Vec<String>,
    pub legacy: Vec<String>,
    /// When set, `run_script` fails with this message.
    pub script_failure: Option<String>,
}

impl RecordingContext {
    pub fn new(commands: CommandSet) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }

    /// Names of the dispatched commands, in order.
    pub fn command_names(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.command.as_str()).collect()
    }
}

impl ExecutionContext for RecordingContext {
    fn run_command(
        &mut self,
        command: &CommandDescriptor,
        args: Vec<String>,
        options: ParseOptions,
    ) -> Result<(), PlotlineError> {
        self.calls.push(RecordedCall {
            command: command.name.clone(),
            args,
            options,
            location: self.location.clone(),
        });
        Ok(())
    }

    fn set_source_location(&mut self, location: SourceLocation) {
        self.location = location;
    }

    fn source_location(&self) -> &SourceLocation {
        &self.location
    }

    fn lookup_command(&self, name: &str) -> Option<Rc<CommandDescriptor>> {
        self.commands.get(name)
    }

    fn define_variable(&mut self, name: &str, binding: Binding, override_existing: bool) -> bool {
        self.variables.define(name, binding, override_existing)
    }

    fn variables(&self) -> &Variables {
        &self.variables
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    fn run_script(&mut self, code: &str) -> Result<(), PlotlineError> {
        self.scripts.push(code.to_string());
        match &self.script_failure {
            Some(message) => Err(err_msg!(Script, "{}", message)),
            None => Ok(()),
        }
    }

    fn run_legacy(&mut self, text: &str) -> Result<(), PlotlineError> {
        self.legacy.push(text.to_string());
        Ok(())
    }
}
