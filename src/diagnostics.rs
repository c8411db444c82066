//! # Plotline diagnostics
//!
//! Every failure produced by the type registry, the two front-end parsers or
//! the execution context is a [`PlotlineError`]. Errors are rendered through
//! `miette`, so the binary can print a single readable diagnostic before it
//! exits.
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for message-only errors.**
//!   - `err_msg!(Coercion, "invalid literal '{}' for type {}", text, tag)`
//!
//! - **Use `err_loc!` when the current [`SourceLocation`] is known.**
//!   - `err_loc!(UnknownToken, location, "unknown command '{}'", name)`
//!
//! Errors raised deep inside coercion usually have no location yet; the
//! dispatching layer attaches one with [`PlotlineError::with_location`].

use miette::Diagnostic;
use thiserror::Error;

use crate::context::SourceLocation;

/// Type-safe error classification matching the [`PlotlineError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Flag, command or type collisions found while building tables.
    Config,
    /// Unknown long/short options and unknown command names.
    UnknownToken,
    /// A declared inline option without its value.
    MalformedOption,
    /// Text that cannot be converted to the requested type.
    Coercion,
    /// Command-file structure: unterminated blocks, quoting, variables.
    Syntax,
    /// Failures reported by the foreign-code collaborator.
    Script,
    /// Reading streams or files.
    Io,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Config => "config",
            ErrorType::UnknownToken => "unknown-token",
            ErrorType::MalformedOption => "malformed-option",
            ErrorType::Coercion => "coercion",
            ErrorType::Syntax => "syntax",
            ErrorType::Script => "script",
            ErrorType::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an error happened and how to fix it.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub location: Option<SourceLocation>,
    pub help: Option<String>,
}

impl ErrorContext {
    /// An empty context (no location, no help).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at(location: SourceLocation) -> Self {
        Self {
            location: Some(location),
            help: None,
        }
    }
}

/// Unified error type for the command language.
#[derive(Debug, Error)]
pub enum PlotlineError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("{message}")]
    UnknownToken {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("{message}")]
    MalformedOption {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("{message}")]
    Coercion {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Syntax error: {message}")]
    Syntax {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Script error: {message}")]
    Script {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl PlotlineError {
    fn ctx(&self) -> &ErrorContext {
        match self {
            PlotlineError::Config { ctx, .. }
            | PlotlineError::UnknownToken { ctx, .. }
            | PlotlineError::MalformedOption { ctx, .. }
            | PlotlineError::Coercion { ctx, .. }
            | PlotlineError::Syntax { ctx, .. }
            | PlotlineError::Script { ctx, .. }
            | PlotlineError::Io { ctx, .. } => ctx,
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            PlotlineError::Config { ctx, .. }
            | PlotlineError::UnknownToken { ctx, .. }
            | PlotlineError::MalformedOption { ctx, .. }
            | PlotlineError::Coercion { ctx, .. }
            | PlotlineError::Syntax { ctx, .. }
            | PlotlineError::Script { ctx, .. }
            | PlotlineError::Io { ctx, .. } => ctx,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            PlotlineError::Config { .. } => ErrorType::Config,
            PlotlineError::UnknownToken { .. } => ErrorType::UnknownToken,
            PlotlineError::MalformedOption { .. } => ErrorType::MalformedOption,
            PlotlineError::Coercion { .. } => ErrorType::Coercion,
            PlotlineError::Syntax { .. } => ErrorType::Syntax,
            PlotlineError::Script { .. } => ErrorType::Script,
            PlotlineError::Io { .. } => ErrorType::Io,
        }
    }

    /// The bare message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            PlotlineError::Config { message, .. }
            | PlotlineError::UnknownToken { message, .. }
            | PlotlineError::MalformedOption { message, .. }
            | PlotlineError::Coercion { message, .. }
            | PlotlineError::Syntax { message, .. }
            | PlotlineError::Script { message, .. }
            | PlotlineError::Io { message, .. } => message,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.ctx().location.as_ref()
    }

    /// Attaches `location` unless the error already carries one.
    pub fn with_location(mut self, location: &SourceLocation) -> Self {
        let ctx = self.ctx_mut();
        if ctx.location.is_none() {
            ctx.location = Some(location.clone());
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.ctx_mut().help = Some(help.into());
        self
    }
}

impl From<std::io::Error> for PlotlineError {
    fn from(err: std::io::Error) -> Self {
        PlotlineError::Io {
            message: err.to_string(),
            ctx: ErrorContext::none(),
            source: Some(Box::new(err)),
        }
    }
}

impl Diagnostic for PlotlineError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("plotline::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let ctx = self.ctx();
        let text = match (&ctx.location, &ctx.help) {
            (Some(location), Some(help)) => format!("at {location}\n{help}"),
            (Some(location), None) => format!("at {location}"),
            (None, Some(help)) => help.clone(),
            (None, None) => return None,
        };
        Some(Box::new(text))
    }
}

/// Constructs a `PlotlineError` variant with a formatted message and no location.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $($fmt:tt)+) => {
        $crate::PlotlineError::$variant {
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a `PlotlineError` variant tagged with a [`SourceLocation`].
#[macro_export]
macro_rules! err_loc {
    ($variant:ident, $location:expr, $($fmt:tt)+) => {
        $crate::PlotlineError::$variant {
            message: format!($($fmt)+),
            ctx: $crate::ErrorContext::at(::std::clone::Clone::clone($location)),
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_location_is_rendered_in_help() {
        let location = SourceLocation::in_file("plot", "setup.plt", 12);
        let err = err_loc!(UnknownToken, &location, "unknown command '{}'", "plto");
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("unknown command 'plto'"));
        assert!(output.contains("setup.plt:12"));
    }

    #[test]
    fn test_with_location_keeps_first_location() {
        let first = SourceLocation::in_file("title", "a.plt", 3);
        let second = SourceLocation::in_file("title", "b.plt", 9);
        let err = err_loc!(Coercion, &first, "bad").with_location(&second);
        assert_eq!(err.location(), Some(&first));

        let err = err_msg!(Coercion, "bad").with_location(&second);
        assert_eq!(err.location(), Some(&second));
    }

    #[test]
    fn test_error_type_and_code() {
        let err = err_msg!(MalformedOption, "missing option text for /{}", "color");
        assert_eq!(err.error_type(), ErrorType::MalformedOption);
        assert_eq!(err.message(), "missing option text for /color");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("plotline::malformed-option"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: PlotlineError = io.into();
        assert_eq!(err.error_type(), ErrorType::Io);
        assert!(err.to_string().contains("no such file"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("no such file"));
    }

    #[test]
    fn test_message_only_errors_have_no_source() {
        let err = err_msg!(Syntax, "unterminated 'ruby' block");
        assert!(std::error::Error::source(&err).is_none());
    }
}
