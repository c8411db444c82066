//! Handles all user-facing output for the CLI.
//!
//! This module holds the output sinks the session writes to and the colored
//! listings printed by `list-commands` and `list-types`.

// ============================================================================
// OUTPUT SINKS: OutputBuffer and StdoutSink implementations
// ============================================================================

use std::io::{self, IsTerminal};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::commands::CommandSet;
use crate::surface::OutputSink;
use crate::types::TypeRegistry;

/// OutputBuffer: collects output into a String for testing or programmatic capture.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(text);
    }
}

/// StdoutSink: writes output to stdout for CLI use.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        println!("{}", text);
    }
}

// ============================================================================
// LISTINGS
// ============================================================================

fn heading(out: &mut impl WriteColor, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    writeln!(out, "{text}")?;
    out.reset()
}

/// Writes every command, grouped in first-seen group order.
pub fn write_commands(out: &mut impl WriteColor, commands: &CommandSet) -> io::Result<()> {
    let mut groups: Vec<&str> = Vec::new();
    for command in commands.iter() {
        if !groups.contains(&command.group.as_str()) {
            groups.push(&command.group);
        }
    }
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        heading(out, &format!("[{group}]"))?;
        for command in commands.iter().filter(|c| c.group == *group) {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
            write!(out, "  {}", command.synopsis())?;
            out.reset()?;
            let mut flags = Vec::new();
            if let Some(short) = command.short_option {
                flags.push(format!("-{short}"));
            }
            if let Some(long) = &command.long_option {
                flags.push(format!("--{long}"));
            }
            if !flags.is_empty() {
                write!(out, "  ({})", flags.join(", "))?;
            }
            writeln!(out)?;
            if !command.description.is_empty() {
                writeln!(out, "      {}", command.description)?;
            }
        }
    }
    Ok(())
}

/// Writes every registered type with its display name and description.
pub fn write_types(out: &mut impl WriteColor, types: &TypeRegistry) -> io::Result<()> {
    for (tag, name, description) in types.describe() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(out, "{tag:<16}")?;
        out.reset()?;
        writeln!(out, " {name}: {description}")?;
    }
    Ok(())
}

fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

pub fn print_commands(commands: &CommandSet) -> io::Result<()> {
    let mut stdout = stdout();
    write_commands(&mut stdout, commands)
}

pub fn print_types(types: &TypeRegistry) -> io::Result<()> {
    let mut stdout = stdout();
    write_types(&mut stdout, types)
}
