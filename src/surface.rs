//! Drawing backend seam.
//!
//! Commands never render anything themselves: once their arguments are
//! coerced they hand the [`Invocation`] to the session's [`DrawingSurface`].
//! The only surface shipped here is [`TranscriptSurface`], which writes one
//! line per drawing operation to an [`OutputSink`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::commands::Invocation;
use crate::{err_msg, PlotlineError};

/// Receives user-visible text.
pub trait OutputSink {
    fn emit(&mut self, text: &str);
}

impl<T: OutputSink> OutputSink for Rc<RefCell<T>> {
    fn emit(&mut self, text: &str) {
        self.borrow_mut().emit(text);
    }
}

/// A rendering backend fed with fully resolved operations.
pub trait DrawingSurface {
    fn apply(&mut self, operation: &Invocation) -> Result<(), PlotlineError>;

    /// Called once after the last operation.
    fn finish(&mut self) -> Result<(), PlotlineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptFormat {
    /// `title "Hello world" /color=1,0,0`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Records every drawing operation as a line of text.
pub struct TranscriptSurface<S> {
    sink: S,
    format: TranscriptFormat,
    operations: usize,
}

impl<S: OutputSink> TranscriptSurface<S> {
    pub fn new(sink: S, format: TranscriptFormat) -> Self {
        Self {
            sink,
            format,
            operations: 0,
        }
    }

    pub fn operations(&self) -> usize {
        self.operations
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

fn quoted(text: String) -> String {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        format!("{text:?}")
    } else {
        text
    }
}

/// The text form of an operation: name, arguments, then sorted options.
pub fn transcript_line(operation: &Invocation) -> String {
    let mut parts = vec![operation.command.clone()];
    parts.extend(operation.args.iter().map(|v| quoted(v.to_string())));
    parts.extend(
        operation
            .options
            .iter()
            .map(|(name, v)| format!("/{name}={}", quoted(v.to_string()))),
    );
    parts.join(" ")
}

impl<S: OutputSink> DrawingSurface for TranscriptSurface<S> {
    fn apply(&mut self, operation: &Invocation) -> Result<(), PlotlineError> {
        let line = match self.format {
            TranscriptFormat::Text => transcript_line(operation),
            TranscriptFormat::Json => serde_json::to_string(operation).map_err(|e| {
                err_msg!(Io, "cannot serialize '{}': {}", operation.command, e)
            })?,
        };
        self.operations += 1;
        self.sink.emit(&line);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PlotlineError> {
        tracing::debug!(operations = self.operations, "transcript complete");
        Ok(())
    }
}
