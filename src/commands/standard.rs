//! The commands the `plotline` binary ships with.
//!
//! Drawing commands forward their resolved invocation to the session's
//! surface unchanged. `include`, `echo`, `set` and `verbose` act on the
//! session itself.

use std::path::Path;

use super::{CommandArg, CommandDescriptor, CommandSet, Invocation};
use crate::context::{Binding, ExecutionContext};
use crate::session::Session;
use crate::types::builtin::{
    ALIGNED_POINT, BIJECTION, BOOLEAN, BOX, COLOR, DIMENSION, FLOAT, LINE_STYLE, MARGINS, MARKER,
    PARTIAL_RANGE, TEXT,
};
use crate::types::Value;
use crate::PlotlineError;

pub const PLOTS: &str = "plots";
pub const AXES: &str = "axes";
pub const DECORATIONS: &str = "decorations";
pub const STYLE: &str = "style";
pub const PAGE: &str = "page";
pub const SESSION: &str = "session";

fn draw(session: &mut Session, operation: &Invocation) -> Result<(), PlotlineError> {
    session.draw(operation)
}

fn drawing(name: &str) -> CommandDescriptor {
    CommandDescriptor::new(name, draw)
}

/// `--name VALUE` that sets one property of the figure.
fn setting(name: &str, tag: &str, group: &str, description: &str) -> CommandDescriptor {
    drawing(name)
        .long(name)
        .arg(CommandArg::new(tag))
        .group(group)
        .describe(description)
}

fn include(session: &mut Session, invocation: &Invocation) -> Result<(), PlotlineError> {
    let path = invocation.text_arg(0)?.to_string();
    session.include(Path::new(&path))
}

fn echo(session: &mut Session, invocation: &Invocation) -> Result<(), PlotlineError> {
    let text = invocation.text_arg(0)?.to_string();
    session.emit(&text);
    Ok(())
}

fn set_variable(session: &mut Session, invocation: &Invocation) -> Result<(), PlotlineError> {
    let name = invocation.text_arg(0)?.to_string();
    let value = invocation.text_arg(1)?.to_string();
    session.define_variable(&name, Binding::Eager(value), true);
    Ok(())
}

fn verbose(session: &mut Session, invocation: &Invocation) -> Result<(), PlotlineError> {
    let on = invocation.arg(0).and_then(Value::as_bool).unwrap_or(false);
    session.set_verbose(on);
    Ok(())
}

/// The full standard command table, in listing order.
pub fn standard_commands() -> Result<CommandSet, PlotlineError> {
    let mut set = CommandSet::new();

    set.add(
        drawing("plot")
            .arg(CommandArg::named(TEXT, "dataset"))
            .option("with", TEXT)
            .option("color", COLOR)
            .option("line-style", LINE_STYLE)
            .option("line-width", FLOAT)
            .option("marker", MARKER)
            .option("legend", TEXT)
            .group(PLOTS)
            .describe("Plots a dataset."),
    )?;

    set.add(
        drawing("title")
            .short('t')
            .long("title")
            .arg(CommandArg::named(TEXT, "label"))
            .option("color", COLOR)
            .group(DECORATIONS)
            .describe("Sets the plot title."),
    )?;
    set.add(
        drawing("xlabel")
            .short('x')
            .long("xlabel")
            .arg(CommandArg::named(TEXT, "label"))
            .option("color", COLOR)
            .group(DECORATIONS)
            .describe("Sets the label of the X axis."),
    )?;
    set.add(
        drawing("ylabel")
            .short('y')
            .long("ylabel")
            .arg(CommandArg::named(TEXT, "label"))
            .option("color", COLOR)
            .group(DECORATIONS)
            .describe("Sets the label of the Y axis."),
    )?;
    set.add(
        drawing("draw-text")
            .long("draw-text")
            .arg(CommandArg::named(ALIGNED_POINT, "position"))
            .arg(CommandArg::named(TEXT, "text"))
            .option("color", COLOR)
            .option("scale", FLOAT)
            .group(DECORATIONS)
            .describe("Writes text at a position given in frame coordinates."),
    )?;

    set.add(setting("xrange", PARTIAL_RANGE, AXES, "Sets the X range, either side may be left out."))?;
    set.add(setting("yrange", PARTIAL_RANGE, AXES, "Sets the Y range, either side may be left out."))?;
    set.add(setting("grid", BOOLEAN, AXES, "Draws a background grid."))?;
    set.add(setting("xlog", BOOLEAN, AXES, "Uses a logarithmic X axis."))?;
    set.add(setting("ylog", BOOLEAN, AXES, "Uses a logarithmic Y axis."))?;
    set.add(setting(
        "xtransform",
        BIJECTION,
        AXES,
        "Transforms X coordinates with forward[::backward] expressions.",
    ))?;

    set.add(
        drawing("page-size")
            .long("page-size")
            .arg(CommandArg::named(DIMENSION, "width"))
            .arg(CommandArg::named(DIMENSION, "height"))
            .group(PAGE)
            .describe("Sets the page size."),
    )?;
    set.add(setting("margins", MARGINS, PAGE, "Sets the plot margins."))?;
    set.add(setting("inset", BOX, PAGE, "Starts an inset in the given box."))?;

    set.add(
        setting("color", COLOR, STYLE, "Sets the color of the next curves.").short('c'),
    )?;
    set.add(setting("line-style", LINE_STYLE, STYLE, "Sets the line style of the next curves."))?;
    set.add(setting("marker", MARKER, STYLE, "Sets the marker of the next curves."))?;
    set.add(setting("line-width", FLOAT, STYLE, "Sets the line width of the next curves."))?;

    set.add(
        CommandDescriptor::new("include", include)
            .short('f')
            .long("file")
            .arg(CommandArg::named(TEXT, "file"))
            .group(SESSION)
            .describe("Runs the commands of another file."),
    )?;
    set.add(
        CommandDescriptor::new("echo", echo)
            .long("echo")
            .arg(CommandArg::named(TEXT, "text"))
            .group(SESSION)
            .describe("Prints text."),
    )?;
    set.add(
        CommandDescriptor::new("set", set_variable)
            .long("set")
            .arg(CommandArg::named(TEXT, "name"))
            .arg(CommandArg::named(TEXT, "value"))
            .group(SESSION)
            .describe("Defines a variable for command files."),
    )?;
    set.add(
        CommandDescriptor::new("verbose", verbose)
            .short('v')
            .long("verbose")
            .arg(CommandArg::new(BOOLEAN))
            .group(SESSION)
            .describe("Logs every command as it runs."),
    )?;

    Ok(set)
}
