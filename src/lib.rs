pub use crate::diagnostics::{ErrorContext, ErrorType, PlotlineError};

pub mod cli;
pub mod commands;
pub mod context;
pub mod diagnostics;
pub mod parser;
pub mod script;
pub mod session;
pub mod surface;
pub mod testing;
pub mod types;
