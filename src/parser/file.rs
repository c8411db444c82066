//! Command-file interpreter.
//!
//! A command file is read in two passes. The first rebuilds logical lines
//! (joining `\` continuations) and, unless disabled, sniffs for the legacy
//! call syntax; a file that uses it anywhere outside a `ruby` block is handed
//! to the legacy parser as a whole. The second pass classifies every logical
//! line and runs it:
//!
//! ```text
//! # comment
//! base = run1                  eager variable
//! file := $(base).dat          deferred, re-expanded on each use
//! color ?= red                 only when not yet defined
//! for f in a.dat b.dat
//!   plot $f /with=lines
//! for end
//! ruby
//!   puts "inline code"
//! ruby end
//! ```
//!
//! Assignment values use the same quoting as command words, so
//! `label = "a b"` stores `a b`. A bare boolean command such as `grid` is
//! run with `true`.

use std::fs;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::words::{assignment_value, split_line};
use crate::commands::options::split_words;
use crate::context::{Binding, ExecutionContext, SourceLocation};
use crate::{err_loc, PlotlineError};

const SCRIPT_OPEN: &str = "ruby";
const SCRIPT_CLOSE: &str = "ruby end";

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][\w-]*)\s*(\?)?\s*(:?=)\s*(.*)$").expect("valid regex literal")
});

static LOOP_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*for\s+([A-Za-z_][\w-]*)\s+in\s+(.*)$").expect("valid regex literal")
});

static LOOP_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*for\s+end\s*$").expect("valid regex literal"));

#[cfg(feature = "legacy-syntax")]
static LEGACY_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[a-z0-9-]+\(").expect("valid regex literal"));

/// What a logical line is, decided without looking at variables.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Blank,
    ScriptOpen,
    ScriptClose,
    LoopOpen {
        variable: String,
        list: String,
    },
    LoopClose,
    Assignment {
        name: String,
        soft: bool,
        deferred: bool,
        rest: String,
    },
    Command,
}

impl Statement {
    fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Statement::Blank;
        }
        if trimmed == SCRIPT_OPEN {
            return Statement::ScriptOpen;
        }
        if trimmed == SCRIPT_CLOSE {
            return Statement::ScriptClose;
        }
        if LOOP_CLOSE.is_match(text) {
            return Statement::LoopClose;
        }
        if let Some(caps) = LOOP_OPEN.captures(text) {
            return Statement::LoopOpen {
                variable: caps[1].to_string(),
                list: caps[2].to_string(),
            };
        }
        if let Some(caps) = ASSIGNMENT.captures(text) {
            return Statement::Assignment {
                name: caps[1].to_string(),
                soft: caps.get(2).is_some(),
                deferred: &caps[3] == ":=",
                rest: caps[4].to_string(),
            };
        }
        Statement::Command
    }
}

/// A logical line with the number of its last physical line.
#[derive(Debug, Clone)]
struct Line {
    number: usize,
    text: String,
    statement: Statement,
}

impl Line {
    fn new(number: usize, text: String) -> Self {
        let statement = Statement::classify(&text);
        Self {
            number,
            text,
            statement,
        }
    }
}

/// Reads command files and dispatches their statements into an
/// [`ExecutionContext`].
#[derive(Debug, Clone, Copy)]
pub struct CommandFileParser {
    legacy_detection: bool,
}

impl Default for CommandFileParser {
    fn default() -> Self {
        Self {
            legacy_detection: cfg!(feature = "legacy-syntax"),
        }
    }
}

impl CommandFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never routes files to the legacy parser.
    pub fn without_legacy_detection(mut self) -> Self {
        self.legacy_detection = false;
        self
    }

    pub fn detects_legacy(&self) -> bool {
        self.legacy_detection
    }

    pub fn parse_file(
        &self,
        path: &Path,
        context: &mut dyn ExecutionContext,
    ) -> Result<(), PlotlineError> {
        let text = fs::read_to_string(path)
            .map_err(|e| PlotlineError::from(e).with_help(format!("while reading {}", path.display())))?;
        self.parse_string(&path.display().to_string(), &text, context)
    }

    pub fn parse_stream<R: Read>(
        &self,
        stream: &str,
        mut reader: R,
        context: &mut dyn ExecutionContext,
    ) -> Result<(), PlotlineError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.parse_string(stream, &text, context)
    }

    pub fn parse_string(
        &self,
        stream: &str,
        text: &str,
        context: &mut dyn ExecutionContext,
    ) -> Result<(), PlotlineError> {
        if self.legacy_detection {
            if let Some(line) = legacy_line(text) {
                context.warn(&format!(
                    "{stream}:{line}: legacy call syntax detected, handing the whole file to the legacy parser"
                ));
                return context.run_legacy(text);
            }
        }
        let lines = logical_lines(text);
        tracing::debug!(stream, lines = lines.len(), "interpreting command file");
        Interpreter { stream, context }.run(&lines)
    }
}

/// First physical line (1-based) that uses the legacy call syntax outside a
/// `ruby` block.
#[cfg(feature = "legacy-syntax")]
fn legacy_line(text: &str) -> Option<usize> {
    let mut in_script = false;
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if in_script {
            in_script = trimmed != SCRIPT_CLOSE;
        } else if trimmed == SCRIPT_OPEN {
            in_script = true;
        } else if LEGACY_CALL.is_match(line) {
            return Some(index + 1);
        }
    }
    None
}

#[cfg(not(feature = "legacy-syntax"))]
fn legacy_line(_text: &str) -> Option<usize> {
    None
}

/// Joins continuation lines. Lines inside `ruby` blocks are passed through
/// untouched.
fn logical_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut in_script = false;
    let mut last = 0;
    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        last = number;
        if in_script {
            if raw.trim() == SCRIPT_CLOSE {
                in_script = false;
            }
            lines.push(Line::new(number, raw.to_string()));
            continue;
        }
        if let Some(head) = raw.strip_suffix('\\') {
            pending.push_str(head);
            continue;
        }
        pending.push_str(raw);
        let logical = std::mem::take(&mut pending);
        let line = Line::new(number, logical.trim_end().to_string());
        in_script = line.statement == Statement::ScriptOpen;
        lines.push(line);
    }
    if !pending.is_empty() {
        lines.push(Line::new(last, pending.trim_end().to_string()));
    }
    lines
}

enum Mode {
    Normal,
    Script {
        opened: usize,
        code: String,
    },
    Loop {
        opened: usize,
        variable: String,
        values: Vec<String>,
        body: Vec<Line>,
        depth: usize,
        in_script: bool,
    },
}

struct Interpreter<'s, 'c> {
    stream: &'s str,
    context: &'c mut dyn ExecutionContext,
}

impl Interpreter<'_, '_> {
    fn location(&self, label: &str, line: usize) -> SourceLocation {
        SourceLocation::in_file(label, self.stream, line)
    }

    fn run(&mut self, lines: &[Line]) -> Result<(), PlotlineError> {
        let mut mode = Mode::Normal;
        for line in lines {
            mode = match mode {
                Mode::Normal => self.statement(line)?,
                Mode::Script { opened, mut code } => {
                    if line.statement == Statement::ScriptClose {
                        self.run_script(opened, &code);
                        Mode::Normal
                    } else {
                        code.push_str(&line.text);
                        code.push('\n');
                        Mode::Script { opened, code }
                    }
                }
                Mode::Loop {
                    opened,
                    variable,
                    values,
                    mut body,
                    mut depth,
                    mut in_script,
                } => {
                    if !in_script && depth == 0 && line.statement == Statement::LoopClose {
                        self.replay(&variable, &values, &body)?;
                        Mode::Normal
                    } else {
                        if in_script {
                            in_script = line.statement != Statement::ScriptClose;
                        } else {
                            match line.statement {
                                Statement::ScriptOpen => in_script = true,
                                Statement::LoopOpen { .. } => depth += 1,
                                Statement::LoopClose => depth -= 1,
                                _ => {}
                            }
                        }
                        body.push(line.clone());
                        Mode::Loop {
                            opened,
                            variable,
                            values,
                            body,
                            depth,
                            in_script,
                        }
                    }
                }
            };
        }
        match mode {
            Mode::Normal => Ok(()),
            Mode::Script { opened, .. } => Err(self.unterminated(SCRIPT_OPEN, opened)),
            Mode::Loop { opened, .. } => Err(self.unterminated("for", opened)),
        }
    }

    fn unterminated(&self, kind: &str, opened: usize) -> PlotlineError {
        err_loc!(
            Syntax,
            &self.location(kind, opened),
            "unterminated '{}' block opened at line {}",
            kind,
            opened
        )
    }

    fn statement(&mut self, line: &Line) -> Result<Mode, PlotlineError> {
        match &line.statement {
            Statement::Blank => Ok(Mode::Normal),
            Statement::ScriptOpen => Ok(Mode::Script {
                opened: line.number,
                code: String::new(),
            }),
            Statement::ScriptClose => Err(err_loc!(
                Syntax,
                &self.location(SCRIPT_CLOSE, line.number),
                "'{}' without a matching '{}'",
                SCRIPT_CLOSE,
                SCRIPT_OPEN
            )),
            Statement::LoopClose => Err(err_loc!(
                Syntax,
                &self.location("for end", line.number),
                "'for end' without a matching 'for'"
            )),
            Statement::LoopOpen { variable, list } => {
                let values = split_line(list, self.context.variables())
                    .map_err(|e| e.with_location(&self.location("for", line.number)))?;
                Ok(Mode::Loop {
                    opened: line.number,
                    variable: variable.clone(),
                    values,
                    body: Vec::new(),
                    depth: 0,
                    in_script: false,
                })
            }
            Statement::Assignment {
                name,
                soft,
                deferred,
                rest,
            } => {
                let value = assignment_value(rest, self.context.variables(), !deferred)
                    .map_err(|e| e.with_location(&self.location(name, line.number)))?;
                let binding = if *deferred {
                    Binding::Deferred(value)
                } else {
                    Binding::Eager(value)
                };
                if !self.context.define_variable(name, binding, !soft) {
                    tracing::trace!(variable = %name, "soft definition skipped");
                }
                Ok(Mode::Normal)
            }
            Statement::Command => {
                self.command(line)?;
                Ok(Mode::Normal)
            }
        }
    }

    fn command(&mut self, line: &Line) -> Result<(), PlotlineError> {
        let first = line.text.split_whitespace().next().unwrap_or_default();
        let mut words = split_line(&line.text, self.context.variables())
            .map_err(|e| e.with_location(&self.location(first, line.number)))?;
        if words.is_empty() {
            return Ok(());
        }
        let name = words.remove(0);
        let location = self.location(&name, line.number);
        let command = self.context.lookup_command(&name).ok_or_else(|| {
            err_loc!(UnknownToken, &location, "unknown command '{}'", name)
        })?;
        self.context.set_source_location(location.clone());
        let (mut args, options) = split_words(words, &command, self.context)
            .map_err(|e| e.with_location(&location))?;
        // A bare boolean command turns its setting on.
        if args.is_empty() {
            if let [only] = command.args.as_slice() {
                if self.context.is_boolean(&only.type_tag) {
                    args.push("true".to_string());
                }
            }
        }
        self.context.run_command(&command, args, options)
    }

    fn run_script(&mut self, opened: usize, code: &str) {
        let location = self.location(SCRIPT_OPEN, opened);
        self.context.set_source_location(location.clone());
        if let Err(e) = self.context.run_script(code) {
            self.context.warn(&format!("{location}: {e}"));
        }
    }

    fn replay(&mut self, variable: &str, values: &[String], body: &[Line]) -> Result<(), PlotlineError> {
        for value in values {
            self.context
                .define_variable(variable, Binding::Eager(value.clone()), true);
            self.run(body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandArg, CommandDescriptor, CommandSet};
    use crate::diagnostics::ErrorType;
    use crate::testing::RecordingContext;
    use crate::types::builtin::{BOOLEAN, TEXT};

    fn commands() -> CommandSet {
        let mut set = CommandSet::new();
        set.add(CommandDescriptor::new("plot", |_, _| Ok(())).option("with", TEXT))
            .unwrap();
        set.add(CommandDescriptor::new("title", |_, _| Ok(())).arg(CommandArg::new(TEXT)))
            .unwrap();
        set.add(CommandDescriptor::new("grid", |_, _| Ok(())).arg(CommandArg::new(BOOLEAN)))
            .unwrap();
        set
    }

    fn interpret(text: &str) -> (Result<(), PlotlineError>, RecordingContext) {
        let mut ctx = RecordingContext::new(commands());
        let result = CommandFileParser::new().parse_string("test.plt", text, &mut ctx);
        (result, ctx)
    }

    fn args(ctx: &RecordingContext) -> Vec<Vec<String>> {
        ctx.calls.iter().map(|c| c.args.clone()).collect()
    }

    #[test]
    fn test_loop_dispatches_once_per_value() {
        let (result, ctx) = interpret("for v in a b c\nplot $v\nfor end\n");
        result.unwrap();
        assert_eq!(ctx.command_names(), vec!["plot", "plot", "plot"]);
        assert_eq!(args(&ctx), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn test_nested_loops() {
        let text = "for x in 1 2\nfor y in a b\nplot $x$y\nfor end\nfor end\n";
        let (result, ctx) = interpret(text);
        result.unwrap();
        assert_eq!(args(&ctx), vec![vec!["1a"], vec!["1b"], vec!["2a"], vec!["2b"]]);
    }

    #[test]
    fn test_continuation_lines_keep_last_line_number() {
        let (result, ctx) = interpret("plot a.dat \\\n  b.dat   \ntitle Done\n");
        result.unwrap();
        assert_eq!(args(&ctx)[0], vec!["a.dat", "b.dat"]);
        assert_eq!(ctx.calls[0].location.line, 2);
        assert_eq!(ctx.calls[1].location.line, 3);
        assert_eq!(ctx.calls[1].location.stream, "test.plt");
    }

    #[test]
    fn test_trailing_backslash_on_last_line_is_ignored() {
        let (result, ctx) = interpret("plot a.dat \\");
        result.unwrap();
        assert_eq!(args(&ctx), vec![vec!["a.dat"]]);
    }

    #[test]
    fn test_eager_deferred_and_soft_assignments() {
        let text = "\
base = one
eager = $(base).dat
lazy := $(base).dat
base = two
eager ?= ignored
plot $eager $lazy
";
        let (result, ctx) = interpret(text);
        result.unwrap();
        assert_eq!(args(&ctx), vec![vec!["one.dat", "two.dat"]]);
    }

    #[test]
    fn test_assignment_values_follow_quoting_rules() {
        let text = r#"
label = "Hello world"
raw = 'cost: $5'
later := "$(label)!" '$x'
title "$label"
title $raw
title "$later"
"#;
        let (result, ctx) = interpret(text);
        result.unwrap();
        assert_eq!(
            args(&ctx),
            vec![vec!["Hello world"], vec!["cost:", "$5"], vec!["Hello world! $x"]]
        );
    }

    #[test]
    fn test_bare_boolean_command_means_true() {
        let (result, ctx) = interpret("grid
grid off
grid /nope
");
        result.unwrap();
        assert_eq!(args(&ctx), vec![vec!["true"], vec!["off"], vec!["/nope"]]);
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let (result, ctx) = interpret("# header\n\n   # indented\nplot x\n");
        result.unwrap();
        assert_eq!(ctx.calls.len(), 1);
    }

    #[test]
    fn test_options_and_undeclared_words() {
        let (result, ctx) = interpret("plot a.dat /with lines /nope=1 b.dat\n");
        result.unwrap();
        let call = &ctx.calls[0];
        assert_eq!(call.args, vec!["a.dat", "/nope=1", "b.dat"]);
        assert_eq!(call.options.get("with").map(String::as_str), Some("lines"));
        assert_eq!(ctx.warnings.len(), 1);
    }

    #[test]
    fn test_missing_option_text_is_fatal() {
        let (result, _) = interpret("plot a.dat /with\n");
        let err = result.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedOption);
        assert_eq!(err.location().map(|l| l.line), Some(1));
    }

    #[test]
    fn test_unknown_command_names_location() {
        let (result, _) = interpret("plot a\n\nplto b\n");
        let err = result.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnknownToken);
        assert!(err.message().contains("unknown command 'plto'"));
        let location = err.location().unwrap();
        assert_eq!((location.stream.as_str(), location.line), ("test.plt", 3));
    }

    #[test]
    fn test_script_block_runs_verbatim() {
        let (result, ctx) = interpret("ruby\n  x = 1 \\\n  plot(x)\nruby end\ntitle ok\n");
        result.unwrap();
        assert_eq!(ctx.scripts, vec!["  x = 1 \\\n  plot(x)\n".to_string()]);
        assert!(ctx.legacy.is_empty());
        assert_eq!(ctx.command_names(), vec!["title"]);
    }

    #[test]
    fn test_script_failure_is_reported_and_skipped() {
        let mut ctx = RecordingContext::new(commands());
        ctx.script_failure = Some("boom".into());
        CommandFileParser::new()
            .parse_string("test.plt", "ruby\nraise\nruby end\ntitle after\n", &mut ctx)
            .unwrap();
        assert_eq!(ctx.command_names(), vec!["title"]);
        assert_eq!(ctx.warnings.len(), 1);
        assert!(ctx.warnings[0].contains("test.plt:1"));
        assert!(ctx.warnings[0].contains("boom"));
    }

    #[test]
    fn test_unterminated_script_block() {
        let (result, ctx) = interpret("title a\nruby\nputs 1\n");
        let err = result.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Syntax);
        assert!(err.message().contains("unterminated 'ruby' block opened at line 2"));
        assert!(ctx.scripts.is_empty());
    }

    #[test]
    fn test_unterminated_loop() {
        let (result, ctx) = interpret("for v in a b\nplot $v\n");
        assert!(result.unwrap_err().message().contains("unterminated 'for'"));
        assert!(ctx.calls.is_empty());
    }

    #[test]
    fn test_stray_closers_are_errors() {
        assert!(interpret("for end\n").0.is_err());
        assert!(interpret("ruby end\n").0.is_err());
    }

    #[cfg(feature = "legacy-syntax")]
    #[test]
    fn test_legacy_file_is_routed_whole() {
        let text = "# old style\nfoo(1,2)\nplot a\n";
        let (result, ctx) = interpret(text);
        result.unwrap();
        assert_eq!(ctx.legacy, vec![text.to_string()]);
        assert!(ctx.calls.is_empty());
        assert!(ctx.warnings[0].contains("test.plt:2"));
    }

    #[cfg(feature = "legacy-syntax")]
    #[test]
    fn test_legacy_lookalike_inside_script_block_is_not_routed() {
        let (result, ctx) = interpret("ruby\nfoo(1)\nruby end\n");
        result.unwrap();
        assert!(ctx.legacy.is_empty());
        assert_eq!(ctx.scripts, vec!["foo(1)\n".to_string()]);
    }

    #[test]
    fn test_legacy_detection_can_be_disabled() {
        let mut ctx = RecordingContext::new(commands());
        let err = CommandFileParser::new()
            .without_legacy_detection()
            .parse_string("test.plt", "foo(1,2)\n", &mut ctx)
            .unwrap_err();
        assert!(ctx.legacy.is_empty());
        assert!(err.message().contains("unknown command 'foo(1,2)'"));
    }
}
