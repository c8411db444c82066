//! Word tokenizer for command-file lines.
//!
//! Splits a logical line into words the way a small shell would:
//!
//! - `'single quotes'` keep their content literally;
//! - `"double quotes"` allow `\` escapes and variable interpolation;
//! - outside quotes, `\` escapes the next character;
//! - `$name` and `$(name)` interpolate variables. An unquoted expansion is
//!   split on whitespace into separate words, a quoted one is not.
//!
//! Referencing an undefined variable is an error.

use crate::context::Variables;
use crate::{err_msg, PlotlineError};

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Reads a variable reference starting right after a `$`. Returns the name
/// and the position after the reference, or `None` when the `$` does not
/// start a reference.
fn read_reference(chars: &[char], pos: usize) -> Result<Option<(String, usize)>, PlotlineError> {
    match chars.get(pos) {
        Some('(') => {
            let close = chars[pos + 1..]
                .iter()
                .position(|&c| c == ')')
                .ok_or_else(|| err_msg!(Syntax, "unterminated variable reference '$('"))?;
            let name: String = chars[pos + 1..pos + 1 + close].iter().collect();
            if name.is_empty() || !name.chars().all(|c| is_name_char(c) || c == '-') {
                return Err(err_msg!(Syntax, "invalid variable name '{}'", name));
            }
            Ok(Some((name, pos + close + 2)))
        }
        Some(&c) if is_name_start(c) => {
            let end = chars[pos..]
                .iter()
                .position(|&c| !is_name_char(c))
                .map_or(chars.len(), |n| pos + n);
            Ok(Some((chars[pos..end].iter().collect(), end)))
        }
        _ => Ok(None),
    }
}

fn lookup(name: &str, variables: &Variables, depth: usize) -> Result<String, PlotlineError> {
    variables
        .resolve_at_depth(name, depth)?
        .ok_or_else(|| err_msg!(Syntax, "undefined variable '{}'", name))
}

/// Interpolates every `$name` / `$(name)` in `text`. `\$` yields a literal
/// dollar sign; other backslashes are kept.
pub fn expand_variables(text: &str, variables: &Variables) -> Result<String, PlotlineError> {
    expand_variables_at_depth(text, variables, 0)
}

pub fn expand_variables_at_depth(
    text: &str,
    variables: &Variables,
    depth: usize,
) -> Result<String, PlotlineError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if chars.get(pos + 1) == Some(&'$') => {
                out.push('$');
                pos += 2;
            }
            '$' => match read_reference(&chars, pos + 1)? {
                Some((name, next)) => {
                    out.push_str(&lookup(&name, variables, depth)?);
                    pos = next;
                }
                None => {
                    out.push('$');
                    pos += 1;
                }
            },
            ch => {
                out.push(ch);
                pos += 1;
            }
        }
    }
    Ok(out)
}

/// Accumulates words; `started` distinguishes an empty quoted word from no
/// word at all.
#[derive(Default)]
struct Words {
    words: Vec<String>,
    current: String,
    started: bool,
}

impl Words {
    fn push(&mut self, ch: char) {
        self.current.push(ch);
        self.started = true;
    }

    fn push_str(&mut self, text: &str) {
        self.current.push_str(text);
        self.started = true;
    }

    fn finish(&mut self) {
        if self.started {
            self.words.push(std::mem::take(&mut self.current));
            self.started = false;
        }
    }

    /// Appends an unquoted expansion, starting a new word at every run of
    /// whitespace.
    fn push_split(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.finish();
            } else {
                self.push(ch);
            }
        }
    }
}

/// Splits `line` into words, interpolating variables from `variables`.
pub fn split_line(line: &str, variables: &Variables) -> Result<Vec<String>, PlotlineError> {
    let chars: Vec<char> = line.chars().collect();
    let mut words = Words::default();
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        pos += 1;
        match ch {
            c if c.is_whitespace() => words.finish(),
            '\'' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == '\'')
                    .ok_or_else(|| err_msg!(Syntax, "unterminated single quote"))?;
                let literal: String = chars[pos..pos + close].iter().collect();
                words.push_str(&literal);
                pos += close + 1;
            }
            '"' => {
                words.started = true;
                loop {
                    let Some(&c) = chars.get(pos) else {
                        return Err(err_msg!(Syntax, "unterminated double quote"));
                    };
                    pos += 1;
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(&escaped) = chars.get(pos) {
                                words.push(escaped);
                                pos += 1;
                            }
                        }
                        '$' => match read_reference(&chars, pos)? {
                            Some((name, next)) => {
                                words.push_str(&lookup(&name, variables, 0)?);
                                pos = next;
                            }
                            None => words.push('$'),
                        },
                        other => words.push(other),
                    }
                }
            }
            '\\' => match chars.get(pos) {
                Some(&escaped) => {
                    words.push(escaped);
                    pos += 1;
                }
                None => words.push('\\'),
            },
            '$' => match read_reference(&chars, pos)? {
                Some((name, next)) => {
                    words.push_split(&lookup(&name, variables, 0)?);
                    pos = next;
                }
                None => words.push('$'),
            },
            other => words.push(other),
        }
    }
    words.finish();
    Ok(words.words)
}

/// Reads the right-hand side of an assignment with the same quoting rules as
/// [`split_line`], producing one value. Whitespace between words is kept.
///
/// With `interpolate` set, variables are expanded now. Otherwise references
/// stay in the text for later expansion, and `$` signs protected by quotes or
/// escapes are written as `\$` so that expansion leaves them literal.
pub fn assignment_value(
    rest: &str,
    variables: &Variables,
    interpolate: bool,
) -> Result<String, PlotlineError> {
    let chars: Vec<char> = rest.chars().collect();
    let mut out = String::with_capacity(rest.len());
    let literal_dollar = if interpolate { "$" } else { r"\$" };
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        pos += 1;
        match ch {
            '\'' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == '\'')
                    .ok_or_else(|| err_msg!(Syntax, "unterminated single quote"))?;
                for &c in &chars[pos..pos + close] {
                    match c {
                        '$' => out.push_str(literal_dollar),
                        c => out.push(c),
                    }
                }
                pos += close + 1;
            }
            '"' => loop {
                let Some(&c) = chars.get(pos) else {
                    return Err(err_msg!(Syntax, "unterminated double quote"));
                };
                pos += 1;
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(&escaped) = chars.get(pos) {
                            match escaped {
                                '$' => out.push_str(literal_dollar),
                                c => out.push(c),
                            }
                            pos += 1;
                        }
                    }
                    '$' => pos = reference(&chars, pos, variables, interpolate, &mut out)?,
                    other => out.push(other),
                }
            },
            '\\' => match chars.get(pos) {
                Some('$') => {
                    out.push_str(literal_dollar);
                    pos += 1;
                }
                Some(&escaped) => {
                    out.push(escaped);
                    pos += 1;
                }
                None => out.push('\\'),
            },
            '$' => pos = reference(&chars, pos, variables, interpolate, &mut out)?,
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Handles a `$` at `pos - 1`: expands it, or copies the reference through
/// untouched. Returns the position after it.
fn reference(
    chars: &[char],
    pos: usize,
    variables: &Variables,
    interpolate: bool,
    out: &mut String,
) -> Result<usize, PlotlineError> {
    match read_reference(chars, pos)? {
        Some((name, next)) if interpolate => {
            out.push_str(&lookup(&name, variables, 0)?);
            Ok(next)
        }
        Some((_, next)) => {
            out.push('$');
            out.extend(&chars[pos..next]);
            Ok(next)
        }
        None => {
            out.push('$');
            Ok(pos)
        }
    }
}
