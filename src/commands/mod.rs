//! # Command descriptors
//!
//! A [`CommandDescriptor`] is the single source of truth for one operation:
//! the command-file interpreter finds it by `name`, the command-line
//! tokenizer by its short or long flag. Both then hand raw text to the
//! execution context, which coerces it with the declared types and calls the
//! descriptor's action with an [`Invocation`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::session::Session;
use crate::types::{TypeRegistry, Value};
use crate::{err_msg, PlotlineError};

pub mod options;
pub mod standard;

/// What a command does once its arguments are coerced.
pub type CommandAction = Rc<dyn Fn(&mut Session, &Invocation) -> Result<(), PlotlineError>>;

/// A fully coerced call of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<Value>,
    pub options: BTreeMap<String, Value>,
}

impl Invocation {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// The text of argument `index`, for commands whose argument is `text`.
    pub fn text_arg(&self, index: usize) -> Result<&str, PlotlineError> {
        self.arg(index).and_then(Value::as_str).ok_or_else(|| {
            err_msg!(
                Coercion,
                "command '{}' expected text for argument {}",
                self.command,
                index + 1
            )
        })
    }
}

/// A required positional parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandArg {
    pub type_tag: String,
    pub name: Option<String>,
}

impl CommandArg {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: None,
        }
    }

    pub fn named(type_tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: Some(name.into()),
        }
    }

    /// The display name, falling back to the type tag.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_tag)
    }
}

/// Static definition of a named operation.
#[derive(Clone, Serialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub short_option: Option<char>,
    pub long_option: Option<String>,
    pub args: Vec<CommandArg>,
    /// Inline option name to type tag.
    pub options: BTreeMap<String, String>,
    pub description: String,
    pub group: String,
    #[serde(skip)]
    action: CommandAction,
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("short_option", &self.short_option)
            .field("long_option", &self.long_option)
            .field("args", &self.args)
            .field("options", &self.options)
            .finish()
    }
}

impl CommandDescriptor {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Session, &Invocation) -> Result<(), PlotlineError> + 'static,
    {
        Self {
            name: name.into(),
            short_option: None,
            long_option: None,
            args: Vec::new(),
            options: BTreeMap::new(),
            description: String::new(),
            group: String::new(),
            action: Rc::new(action),
        }
    }

    pub fn short(mut self, flag: char) -> Self {
        self.short_option = Some(flag);
        self
    }

    pub fn long(mut self, flag: impl Into<String>) -> Self {
        self.long_option = Some(flag.into());
        self
    }

    pub fn arg(mut self, arg: CommandArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn option(mut self, name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        self.options.insert(name.into(), type_tag.into());
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// A command whose only argument is boolean: its flags take no token.
    pub fn is_boolean_shaped(&self, types: &TypeRegistry) -> bool {
        matches!(self.args.as_slice(), [only] if types.is_boolean(&only.type_tag))
    }

    pub fn declares_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn invoke(&self, session: &mut Session, invocation: &Invocation) -> Result<(), PlotlineError> {
        (self.action)(session, invocation)
    }

    /// `title TEXT [/color=COLOR]`-style synopsis for help listings.
    pub fn synopsis(&self) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(self.args.iter().map(|a| a.label().to_uppercase()));
        parts.extend(
            self.options
                .iter()
                .map(|(name, tag)| format!("[/{name}={}]", tag.to_uppercase())),
        );
        parts.join(" ")
    }
}

/// The ordered command table, indexed by name.
#[derive(Debug, Default)]
pub struct CommandSet {
    commands: Vec<Rc<CommandDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `command`.
    ///
    /// # Errors
    /// Returns a configuration error if a command with the same name exists.
    pub fn add(&mut self, command: CommandDescriptor) -> Result<(), PlotlineError> {
        if self.by_name.contains_key(&command.name) {
            return Err(err_msg!(Config, "command '{}' redefined", command.name));
        }
        self.by_name.insert(command.name.clone(), self.commands.len());
        self.commands.push(Rc::new(command));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<CommandDescriptor>> {
        self.by_name.get(name).map(|&i| Rc::clone(&self.commands[i]))
    }

    /// Commands in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<CommandDescriptor>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtin::{BOOLEAN, COLOR, TEXT};

    fn noop(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, |_, _| Ok(()))
    }

    #[test]
    fn test_boolean_shape() {
        let types = TypeRegistry::standard().unwrap();
        assert!(noop("grid").arg(CommandArg::new(BOOLEAN)).is_boolean_shaped(&types));
        assert!(!noop("title").arg(CommandArg::new(TEXT)).is_boolean_shaped(&types));
        assert!(!noop("pair")
            .arg(CommandArg::new(BOOLEAN))
            .arg(CommandArg::new(BOOLEAN))
            .is_boolean_shaped(&types));
    }

    #[test]
    fn test_duplicate_command_name_fails() {
        let mut set = CommandSet::new();
        set.add(noop("title")).unwrap();
        let err = set.add(noop("title")).unwrap_err();
        assert!(err.message().contains("command 'title' redefined"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_synopsis_lists_args_and_options() {
        let cmd = noop("title")
            .arg(CommandArg::named(TEXT, "label"))
            .option("color", COLOR);
        assert_eq!(cmd.synopsis(), "title LABEL [/color=COLOR]");
    }
}
