//! The two front ends.
//!
//! - [`cmdline`]: argv tokens, reached through command flags.
//! - [`file`]: command files, reached through command names.
//! - [`words`]: the quoting and interpolation rules command files use.

pub mod cmdline;
pub mod file;
pub mod words;

pub use cmdline::{Arity, CommandLineParser};
pub use file::CommandFileParser;
