//! Command-line tokenizer.
//!
//! Commands are reached from argv through their flags: `--long`, `-s`
//! (bundled as `-abc`), and `--no-long` for boolean-shaped commands. Each
//! command consumes its fixed positional arity, then any trailing inline
//! options it declares. Bare tokens go to the default command when one is
//! configured and are handed back to the caller otherwise.

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::commands::options::harvest_options;
use crate::commands::{CommandDescriptor, CommandSet};
use crate::context::{ExecutionContext, SourceLocation};
use crate::types::TypeRegistry;
use crate::{err_loc, err_msg, PlotlineError};

/// How many tokens a flag consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Boolean-shaped command reached through its own flag.
    FlagTrue,
    /// Boolean-shaped command reached through `--no-<long>`.
    FlagFalse,
}

#[derive(Debug, Clone)]
struct FlagEntry {
    arity: Arity,
    command: Rc<CommandDescriptor>,
}

#[derive(Debug)]
pub struct CommandLineParser {
    commands: Rc<CommandSet>,
    short: BTreeMap<char, FlagEntry>,
    long: BTreeMap<String, FlagEntry>,
    default_command: Option<Rc<CommandDescriptor>>,
}

fn redefined(flag: &str, command: &CommandDescriptor, previous: &CommandDescriptor) -> PlotlineError {
    err_msg!(
        Config,
        "option '{}' redefined by command '{}' (already used by '{}')",
        flag,
        command.name,
        previous.name
    )
}

impl CommandLineParser {
    /// Builds the flag indices in declaration order.
    ///
    /// # Errors
    /// Returns a configuration error when two commands claim the same short
    /// or long flag.
    pub fn new(commands: Rc<CommandSet>, types: &TypeRegistry) -> Result<Self, PlotlineError> {
        let mut short = BTreeMap::new();
        let mut long = BTreeMap::new();
        for command in commands.iter() {
            let boolean = command.is_boolean_shaped(types);
            let arity = if boolean {
                Arity::FlagTrue
            } else {
                Arity::Fixed(command.args.len())
            };
            let entry = |arity| FlagEntry {
                arity,
                command: Rc::clone(command),
            };
            if let Some(flag) = command.short_option {
                if let Some(previous) = short.insert(flag, entry(arity)) {
                    return Err(redefined(&format!("-{flag}"), command, &previous.command));
                }
            }
            if let Some(flag) = &command.long_option {
                let mut names = vec![(flag.clone(), arity)];
                if boolean {
                    names.push((format!("no-{flag}"), Arity::FlagFalse));
                }
                for (name, arity) in names {
                    let label = format!("--{name}");
                    if let Some(previous) = long.insert(name, entry(arity)) {
                        return Err(redefined(&label, command, &previous.command));
                    }
                }
            }
        }
        Ok(Self {
            commands,
            short,
            long,
            default_command: None,
        })
    }

    /// Routes bare tokens to the command called `name`, which must take at
    /// least one argument so that every bare token is consumed.
    pub fn with_default_command(mut self, name: &str) -> Result<Self, PlotlineError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| err_msg!(UnknownToken, "unknown command '{}'", name))?;
        if command.args.is_empty() {
            return Err(err_msg!(
                Config,
                "command '{}' takes no arguments and cannot be the default command",
                name
            ));
        }
        self.default_command = Some(command);
        Ok(self)
    }

    pub fn default_command(&self) -> Option<&CommandDescriptor> {
        self.default_command.as_deref()
    }

    /// Long flags and their arities, sorted by flag.
    pub fn long_flags(&self) -> impl Iterator<Item = (&str, Arity)> {
        self.long.iter().map(|(k, e)| (k.as_str(), e.arity))
    }

    /// Short flags and their arities, sorted by flag.
    pub fn short_flags(&self) -> impl Iterator<Item = (char, Arity)> + '_ {
        self.short.iter().map(|(k, e)| (*k, e.arity))
    }

    /// Consumes `tokens`, dispatching every command into `context`.
    /// Returns the bare tokens no command claimed, in order.
    ///
    /// # Errors
    /// Unknown flags, missing arguments and anything the context reports
    /// abort the whole parse.
    pub fn parse<I, S>(
        &self,
        tokens: I,
        context: &mut dyn ExecutionContext,
    ) -> Result<Vec<String>, PlotlineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: VecDeque<String> = tokens.into_iter().map(Into::into).collect();
        let mut bare = Vec::new();
        let mut counter = 0;

        while let Some(token) = tokens.pop_front() {
            if let Some(name) = token.strip_prefix("--").filter(|n| !n.is_empty()) {
                let entry = self.long.get(name).ok_or_else(|| {
                    err_msg!(UnknownToken, "unknown long option '{}'", token)
                })?;
                self.dispatch(&token, entry, &mut tokens, &mut counter, context)?;
            } else if let Some(letters) = token.strip_prefix('-').filter(|l| !l.is_empty()) {
                for letter in letters.chars() {
                    let entry = self.short.get(&letter).ok_or_else(|| {
                        err_msg!(UnknownToken, "unknown short option '-{}'", letter)
                    })?;
                    let label = format!("-{letter}");
                    self.dispatch(&label, entry, &mut tokens, &mut counter, context)?;
                }
            } else if let Some(command) = &self.default_command {
                let entry = FlagEntry {
                    arity: Arity::Fixed(command.args.len()),
                    command: Rc::clone(command),
                };
                tokens.push_front(token.clone());
                self.dispatch(&token, &entry, &mut tokens, &mut counter, context)?;
            } else {
                bare.push(token);
            }
        }
        Ok(bare)
    }

    fn dispatch(
        &self,
        label: &str,
        entry: &FlagEntry,
        tokens: &mut VecDeque<String>,
        counter: &mut usize,
        context: &mut dyn ExecutionContext,
    ) -> Result<(), PlotlineError> {
        let location = SourceLocation::command_line(label, *counter + 1);
        let args = match entry.arity {
            Arity::FlagTrue => vec!["true".to_string()],
            Arity::FlagFalse => vec!["false".to_string()],
            Arity::Fixed(count) => {
                if tokens.len() < count {
                    return Err(err_loc!(
                        Coercion,
                        &location,
                        "missing argument for {}: expected {}, found {}",
                        label,
                        count,
                        tokens.len()
                    ));
                }
                tokens.drain(..count).collect()
            }
        };
        let options = harvest_options(tokens, &entry.command, context)?;
        *counter += 1;
        tracing::debug!(command = %entry.command.name, %location, "dispatching");
        context.set_source_location(location);
        context.run_command(&entry.command, args, options)
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    use super::*;
    use crate::commands::CommandArg;
    use crate::diagnostics::ErrorType;
    use crate::testing::RecordingContext;
    use crate::types::builtin::{BOOLEAN, FLOAT, PARTIAL_RANGE, TEXT};

    fn noop(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, |_, _| Ok(()))
    }

    fn commands() -> CommandSet {
        let mut set = CommandSet::new();
        set.add(
            noop("verbose")
                .short('v')
                .long("verbose")
                .arg(CommandArg::new(BOOLEAN)),
        )
        .unwrap();
        set.add(
            noop("title")
                .short('t')
                .long("title")
                .arg(CommandArg::new(TEXT))
                .option("color", TEXT),
        )
        .unwrap();
        set.add(noop("xrange").short('x').long("xrange").arg(CommandArg::new(PARTIAL_RANGE)))
            .unwrap();
        set.add(
            noop("margins")
                .long("margins")
                .arg(CommandArg::new(FLOAT))
                .arg(CommandArg::new(FLOAT)),
        )
        .unwrap();
        set.add(noop("page").long("page")).unwrap();
        set.add(noop("plot").arg(CommandArg::new(TEXT)).option("with", TEXT))
            .unwrap();
        set
    }

    fn parser() -> CommandLineParser {
        let types = TypeRegistry::standard().unwrap();
        CommandLineParser::new(Rc::new(commands()), &types).unwrap()
    }

    fn run(parser: &CommandLineParser, tokens: &[&str]) -> (Vec<String>, RecordingContext) {
        let mut ctx = RecordingContext::new(commands());
        let bare = parser.parse(tokens.iter().copied(), &mut ctx).unwrap();
        (bare, ctx)
    }

    #[test]
    fn test_boolean_flag_consumes_nothing() {
        let (bare, ctx) = run(&parser(), &["--verbose", "extra"]);
        assert_eq!(ctx.calls.len(), 1);
        assert_eq!(ctx.calls[0].args, vec!["true".to_string()]);
        assert_eq!(bare, vec!["extra".to_string()]);

        let (bare, ctx) = run(&parser(), &["--no-verbose", "extra"]);
        assert_eq!(ctx.calls[0].args, vec!["false".to_string()]);
        assert_eq!(bare, vec!["extra".to_string()]);
    }

    #[test]
    fn test_fixed_arity_leaves_tail() {
        let (bare, ctx) = run(&parser(), &["--margins", "1", "2", "tail"]);
        assert_eq!(ctx.calls[0].args, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(bare, vec!["tail".to_string()]);

        let (bare, ctx) = run(&parser(), &["--page", "tail"]);
        assert!(ctx.calls[0].args.is_empty());
        assert_eq!(bare, vec!["tail".to_string()]);
    }

    #[test]
    fn test_inline_options_after_arguments() {
        let (bare, ctx) = run(&parser(), &["--title", "Hi", "/color", "=", "red", "rest"]);
        let call = &ctx.calls[0];
        assert_eq!(call.args, vec!["Hi".to_string()]);
        assert_eq!(call.options.get("color").map(String::as_str), Some("red"));
        assert_eq!(bare, vec!["rest".to_string()]);
    }

    #[test]
    fn test_bundled_short_flags_dispatch_in_order() {
        let (_, ctx) = run(&parser(), &["-vt", "Label", "-x", "0:"]);
        assert_eq!(ctx.command_names(), vec!["verbose", "title", "xrange"]);
        assert_eq!(ctx.calls[1].args, vec!["Label".to_string()]);
        assert_eq!(ctx.calls[2].args, vec!["0:".to_string()]);
    }

    #[test]
    fn test_locations_count_dispatches() {
        let (_, ctx) = run(&parser(), &["-v", "--title", "A"]);
        let indices: Vec<usize> = ctx.calls.iter().map(|c| c.location.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(ctx.calls[1].location.label, "--title");
        assert_eq!(ctx.calls[1].location.stream, crate::context::COMMAND_LINE);
    }

    #[test]
    fn test_unknown_long_option_names_token() {
        let mut ctx = RecordingContext::new(commands());
        let err = parser().parse(["--nope"], &mut ctx).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnknownToken);
        assert!(err.message().contains("--nope"));
    }

    #[test]
    fn test_unknown_short_option_aborts_parse() {
        let mut ctx = RecordingContext::new(commands());
        let err = parser().parse(["-vq", "--verbose"], &mut ctx).unwrap_err();
        assert!(err.message().contains("unknown short option '-q'"));
        assert_eq!(ctx.calls.len(), 1);
    }

    #[test]
    fn test_missing_argument() {
        let mut ctx = RecordingContext::new(commands());
        let err = parser().parse(["--margins", "1"], &mut ctx).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Coercion);
        assert!(err.message().contains("missing argument for --margins"));
    }

    #[test]
    fn test_default_command_takes_bare_tokens() {
        let parser = parser().with_default_command("plot").unwrap();
        let (bare, ctx) = run(&parser, &["a.dat", "/with", "lines", "b.dat", "-"]);
        assert!(bare.is_empty());
        assert_eq!(ctx.command_names(), vec!["plot", "plot", "plot"]);
        assert_eq!(ctx.calls[0].args, vec!["a.dat".to_string()]);
        assert_eq!(ctx.calls[0].options.get("with").map(String::as_str), Some("lines"));
        assert_eq!(ctx.calls[2].args, vec!["-".to_string()]);
    }

    #[test]
    fn test_unknown_default_command() {
        let err = parser().with_default_command("nope").unwrap_err();
        assert!(err.message().contains("unknown command 'nope'"));
    }

    #[test]
    fn test_default_command_needs_an_argument() {
        let err = parser().with_default_command("page").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.message().contains("'page' takes no arguments"));
    }

    /// Builds a random set of commands whose flags never collide, returning
    /// it with the long flags each command should receive.
    fn random_commands(rng: &mut Xoshiro256StarStar) -> (CommandSet, Vec<(String, Arity)>) {
        let mut letters: Vec<char> = ('a'..='z').collect();
        letters.shuffle(rng);
        let mut set = CommandSet::new();
        let mut expected = Vec::new();
        for i in 0..rng.gen_range(1..20) {
            let mut command = noop(&format!("cmd{i}"));
            if rng.gen_bool(0.5) {
                if let Some(letter) = letters.pop() {
                    command = command.short(letter);
                }
            }
            let boolean = rng.gen_bool(0.3);
            let arity = if boolean {
                command = command.arg(CommandArg::new(BOOLEAN));
                Arity::FlagTrue
            } else {
                let count = rng.gen_range(0..4);
                for _ in 0..count {
                    command = command.arg(CommandArg::new(TEXT));
                }
                Arity::Fixed(count)
            };
            if rng.gen_bool(0.7) {
                let long = format!("opt-{i}");
                expected.push((long.clone(), arity));
                if boolean {
                    expected.push((format!("no-{long}"), Arity::FlagFalse));
                }
                command = command.long(long);
            }
            set.add(command).unwrap();
        }
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        (set, expected)
    }

    #[test]
    fn test_random_command_sets_index_deterministically() {
        let types = TypeRegistry::standard().unwrap();
        for seed in 0..64 {
            let (set, expected) = random_commands(&mut Xoshiro256StarStar::seed_from_u64(seed));
            let set = Rc::new(set);
            let first = CommandLineParser::new(Rc::clone(&set), &types).unwrap();
            let second = CommandLineParser::new(set, &types).unwrap();

            let longs: Vec<(String, Arity)> =
                first.long_flags().map(|(k, a)| (k.to_string(), a)).collect();
            let again: Vec<(String, Arity)> =
                second.long_flags().map(|(k, a)| (k.to_string(), a)).collect();
            assert_eq!(longs, again, "seed {seed}");
            assert_eq!(longs, expected, "seed {seed}");

            let shorts: Vec<(char, Arity)> = first.short_flags().collect();
            assert_eq!(shorts, second.short_flags().collect::<Vec<_>>(), "seed {seed}");
            assert!(shorts.iter().all(|(_, a)| *a != Arity::FlagFalse), "seed {seed}");
        }
    }

    #[test]
    fn test_flag_collisions_are_config_errors() {
        let types = TypeRegistry::standard().unwrap();
        let mut set = CommandSet::new();
        set.add(noop("a").short('a')).unwrap();
        set.add(noop("b").short('a')).unwrap();
        let err = CommandLineParser::new(Rc::new(set), &types).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.message().contains("'-a' redefined by command 'b'"));

        let mut set = CommandSet::new();
        set.add(noop("grid").long("grid").arg(CommandArg::new(BOOLEAN)))
            .unwrap();
        set.add(noop("nogrid").long("no-grid")).unwrap();
        let err = CommandLineParser::new(Rc::new(set), &types).unwrap_err();
        assert!(err.message().contains("'--no-grid' redefined"));
    }

    #[test]
    fn test_index_build_is_deterministic() {
        let first: Vec<(String, Arity)> =
            parser().long_flags().map(|(k, a)| (k.to_string(), a)).collect();
        let second: Vec<(String, Arity)> =
            parser().long_flags().map(|(k, a)| (k.to_string(), a)).collect();
        assert_eq!(first, second);
        assert!(first.contains(&("no-verbose".to_string(), Arity::FlagFalse)));
        assert!(first.contains(&("margins".to_string(), Arity::Fixed(2))));
        assert!(parser().short_flags().all(|(c, _)| c != 'n'));
    }
}
