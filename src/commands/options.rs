//! Inline option harvesting shared by both front ends.
//!
//! After a command's positional arguments, either front end may find inline
//! options: `/name=value`, `/name value` or `/name = value`. Only options the
//! command declares are consumed. The first option-shaped token that is not
//! declared produces a warning and ends option recognition for that command.

use std::collections::VecDeque;

use once_cell::sync::Lazy;
use regex::Regex;

use super::CommandDescriptor;
use crate::context::{ExecutionContext, ParseOptions};
use crate::{err_msg, PlotlineError};

static OPTION_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(\w[\w-]*)(?:=(.*))?$").expect("valid regex literal"));

/// An option-shaped token, split into name and attached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionToken<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
}

/// Recognizes `/name` and `/name=value`.
pub fn option_token(token: &str) -> Option<OptionToken<'_>> {
    let caps = OPTION_TOKEN.captures(token)?;
    Some(OptionToken {
        name: caps.get(1)?.as_str(),
        value: caps.get(2).map(|m| m.as_str()),
    })
}

fn undeclared(command: &CommandDescriptor, name: &str, context: &mut dyn ExecutionContext) {
    context.warn(&format!(
        "'/{name}' is not an option of command '{}'; treating it as an argument",
        command.name
    ));
}

/// Pulls the value for a declared option from the front of `tokens`,
/// skipping a standalone `=`.
fn take_value<I>(tokens: &mut I, name: &str) -> Result<String, PlotlineError>
where
    I: Iterator<Item = String>,
{
    let value = match tokens.next() {
        Some(eq) if eq == "=" => tokens.next(),
        other => other,
    };
    value.ok_or_else(|| err_msg!(MalformedOption, "missing option text for /{}", name))
}

/// Command-line harvesting: consumes option tokens from the front of
/// `tokens` and stops at the first token that is not a declared option.
pub fn harvest_options(
    tokens: &mut VecDeque<String>,
    command: &CommandDescriptor,
    context: &mut dyn ExecutionContext,
) -> Result<ParseOptions, PlotlineError> {
    let mut options = ParseOptions::new();
    while let Some(front) = tokens.front() {
        let Some(token) = option_token(front) else {
            break;
        };
        if !command.declares_option(token.name) {
            undeclared(command, token.name, context);
            break;
        }
        let name = token.name.to_string();
        let attached = token.value.map(str::to_string);
        tokens.pop_front();
        let value = match attached {
            Some(value) => value,
            None => take_value(&mut std::iter::from_fn(|| tokens.pop_front()), &name)?,
        };
        options.insert(name, value);
    }
    Ok(options)
}

/// Command-file splitting: separates the words after the command name into
/// positional arguments and inline options. Options may appear anywhere;
/// after the first undeclared option-shaped word every remaining word is
/// positional.
pub fn split_words(
    words: Vec<String>,
    command: &CommandDescriptor,
    context: &mut dyn ExecutionContext,
) -> Result<(Vec<String>, ParseOptions), PlotlineError> {
    let mut args = Vec::new();
    let mut options = ParseOptions::new();
    let mut recognizing = true;
    let mut words = words.into_iter();
    while let Some(word) = words.next() {
        if !recognizing {
            args.push(word);
            continue;
        }
        let Some(token) = option_token(&word) else {
            args.push(word);
            continue;
        };
        if !command.declares_option(token.name) {
            undeclared(command, token.name, context);
            recognizing = false;
            args.push(word);
            continue;
        }
        let value = match token.value {
            Some(value) => value.to_string(),
            None => take_value(&mut words, token.name)?,
        };
        options.insert(token.name.to_string(), value);
    }
    Ok((args, options))
}
