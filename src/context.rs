//! # Execution context contract
//!
//! Both front ends (the command-line tokenizer and the command-file
//! interpreter) resolve text into a command descriptor, raw positional
//! arguments and raw inline options, then hand those to an
//! [`ExecutionContext`]. The context owns everything stateful: the current
//! [`SourceLocation`], the variable scope, and the collaborators for
//! foreign-code blocks and legacy files.
//!
//! [`Session`](crate::session::Session) is the concrete implementation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::commands::CommandDescriptor;
use crate::parser::words;
use crate::types::builtin::BOOLEAN;
use crate::{err_msg, PlotlineError};

/// Stream identifier used for tokens that come from argv.
pub const COMMAND_LINE: &str = "command line";

/// Deferred bindings may refer to other deferred bindings, but not deeper
/// than this.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Raw `/name=value` options harvested for one invocation.
pub type ParseOptions = BTreeMap<String, String>;

/// Where the command being run came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// The command name (files) or the flag token (command line).
    pub label: String,
    pub stream: String,
    /// 1-based physical line; 0 for argv.
    pub line: usize,
    /// 1-based option number on the command line; 0 for files.
    pub index: usize,
}

impl SourceLocation {
    pub fn command_line(token: impl Into<String>, index: usize) -> Self {
        Self {
            label: token.into(),
            stream: COMMAND_LINE.to_string(),
            line: 0,
            index,
        }
    }

    pub fn in_file(label: impl Into<String>, stream: impl Into<String>, line: usize) -> Self {
        Self {
            label: label.into(),
            stream: stream.into(),
            line,
            index: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "{}:{}: {}", self.stream, self.line, self.label)
        } else if self.index > 0 {
            write!(f, "{}, option #{}: {}", self.stream, self.index, self.label)
        } else {
            write!(f, "{}: {}", self.stream, self.label)
        }
    }
}

// ============================================================================
// VARIABLES
// ============================================================================

/// A variable's definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Text already expanded when the variable was defined (`name = ...`).
    Eager(String),
    /// Expression re-expanded against the current scope on every use
    /// (`name := ...`).
    Deferred(String),
}

/// The variable scope of a session.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    bindings: HashMap<String, Binding>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines `name`. Without `override_existing`, an existing binding is
    /// left alone. Returns whether the binding was stored.
    pub fn define(&mut self, name: &str, binding: Binding, override_existing: bool) -> bool {
        if !override_existing && self.bindings.contains_key(name) {
            return false;
        }
        self.bindings.insert(name.to_string(), binding);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The current text of `name`, or `None` when it is undefined.
    pub fn resolve(&self, name: &str) -> Result<Option<String>, PlotlineError> {
        self.resolve_at_depth(name, 0)
    }

    pub(crate) fn resolve_at_depth(
        &self,
        name: &str,
        depth: usize,
    ) -> Result<Option<String>, PlotlineError> {
        match self.bindings.get(name) {
            None => Ok(None),
            Some(Binding::Eager(text)) => Ok(Some(text.clone())),
            Some(Binding::Deferred(expression)) => {
                if depth >= MAX_EXPANSION_DEPTH {
                    return Err(err_msg!(
                        Syntax,
                        "recursive variable '{}' (expansion deeper than {})",
                        name,
                        MAX_EXPANSION_DEPTH
                    ));
                }
                words::expand_variables_at_depth(expression, self, depth + 1).map(Some)
            }
        }
    }
}

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Runs the contents of a `ruby ... ruby end` block.
pub trait ScriptHost {
    fn run(&mut self, code: &str) -> Result<(), PlotlineError>;
}

/// Handles whole files written in the deprecated call syntax.
pub trait LegacyParser {
    fn run(&mut self, text: &str, context: &mut dyn ExecutionContext)
        -> Result<(), PlotlineError>;
}

/// What both front ends dispatch into.
pub trait ExecutionContext {
    /// Coerces `args` and `options` with the command's declared types and
    /// runs its action.
    fn run_command(
        &mut self,
        command: &CommandDescriptor,
        args: Vec<String>,
        options: ParseOptions,
    ) -> Result<(), PlotlineError>;

    fn set_source_location(&mut self, location: SourceLocation);

    fn source_location(&self) -> &SourceLocation;

    fn lookup_command(&self, name: &str) -> Option<Rc<CommandDescriptor>>;

    fn define_variable(&mut self, name: &str, binding: Binding, override_existing: bool) -> bool;

    fn variables(&self) -> &Variables;

    /// Whether `tag` names the boolean type.
    fn is_boolean(&self, tag: &str) -> bool {
        tag == BOOLEAN
    }

    /// Reports a recoverable problem.
    fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
    }

    fn run_script(&mut self, code: &str) -> Result<(), PlotlineError>;

    fn run_legacy(&mut self, text: &str) -> Result<(), PlotlineError>;
}
