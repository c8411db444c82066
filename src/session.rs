//! The concrete [`ExecutionContext`].
//!
//! A [`Session`] owns the variable scope, the current source location, the
//! drawing surface and the output sink. Both front ends dispatch into it;
//! it coerces raw text with the command's declared types and runs the
//! command's action.

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use crate::cli::output::StdoutSink;
use crate::commands::{CommandDescriptor, CommandSet, Invocation};
use crate::context::{
    Binding, ExecutionContext, LegacyParser, ParseOptions, ScriptHost, SourceLocation, Variables,
};
use crate::parser::file::CommandFileParser;
use crate::surface::{DrawingSurface, OutputSink, TranscriptFormat, TranscriptSurface};
use crate::types::TypeRegistry;
use crate::{err_loc, err_msg, PlotlineError};

/// `include` may nest files, but not deeper than this.
pub const MAX_INCLUDE_DEPTH: usize = 32;

pub struct Session {
    commands: Rc<CommandSet>,
    types: Rc<TypeRegistry>,
    variables: Variables,
    location: SourceLocation,
    surface: Box<dyn DrawingSurface>,
    output: Box<dyn OutputSink>,
    script_host: Option<Box<dyn ScriptHost>>,
    legacy_parser: Option<Box<dyn LegacyParser>>,
    file_parser: CommandFileParser,
    warnings: Vec<String>,
    verbose: bool,
    include_depth: usize,
}

impl Session {
    /// A session writing a text transcript and echo output to stdout.
    pub fn new(commands: Rc<CommandSet>, types: Rc<TypeRegistry>) -> Self {
        Self {
            commands,
            types,
            variables: Variables::new(),
            location: SourceLocation::default(),
            surface: Box::new(TranscriptSurface::new(StdoutSink, TranscriptFormat::Text)),
            output: Box::new(StdoutSink),
            script_host: None,
            legacy_parser: None,
            file_parser: CommandFileParser::new(),
            warnings: Vec::new(),
            verbose: false,
            include_depth: 0,
        }
    }

    pub fn with_surface(mut self, surface: impl DrawingSurface + 'static) -> Self {
        self.surface = Box::new(surface);
        self
    }

    pub fn with_output(mut self, output: impl OutputSink + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_script_host(mut self, host: impl ScriptHost + 'static) -> Self {
        self.script_host = Some(Box::new(host));
        self
    }

    pub fn with_legacy_parser(mut self, parser: impl LegacyParser + 'static) -> Self {
        self.legacy_parser = Some(Box::new(parser));
        self
    }

    /// The parser used by `include` and [`Session::run_file`].
    pub fn with_file_parser(mut self, parser: CommandFileParser) -> Self {
        self.file_parser = parser;
        self
    }

    pub fn commands(&self) -> &Rc<CommandSet> {
        &self.commands
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Every warning reported so far, in order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Writes user-visible text to the output sink.
    pub fn emit(&mut self, text: &str) {
        self.output.emit(text);
    }

    /// Forwards a resolved operation to the drawing surface.
    pub fn draw(&mut self, operation: &Invocation) -> Result<(), PlotlineError> {
        self.surface.apply(operation)
    }

    pub fn finish(&mut self) -> Result<(), PlotlineError> {
        self.surface.finish()
    }

    /// Interprets a command file with the session's file parser.
    pub fn run_file(&mut self, path: &Path) -> Result<(), PlotlineError> {
        let parser = self.file_parser;
        parser.parse_file(path, self)
    }

    /// Runs `path` as a nested command file, restoring the current location
    /// afterwards.
    pub fn include(&mut self, path: &Path) -> Result<(), PlotlineError> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(err_loc!(
                Syntax,
                &self.location,
                "include nested deeper than {} files at '{}'",
                MAX_INCLUDE_DEPTH,
                path.display()
            ));
        }
        let saved = self.location.clone();
        self.include_depth += 1;
        let result = self.run_file(path);
        self.include_depth -= 1;
        self.location = saved;
        result
    }

    fn coerce_invocation(
        &self,
        command: &CommandDescriptor,
        args: Vec<String>,
        options: ParseOptions,
    ) -> Result<Invocation, PlotlineError> {
        if args.len() != command.args.len() {
            return Err(err_msg!(
                Coercion,
                "command '{}' expects {} argument(s), got {}",
                command.name,
                command.args.len(),
                args.len()
            )
            .with_help(format!("usage: {}", command.synopsis())));
        }
        let args = command
            .args
            .iter()
            .zip(&args)
            .map(|(arg, text)| self.types.coerce(&arg.type_tag, text))
            .collect::<Result<Vec<_>, _>>()?;
        let mut coerced = BTreeMap::new();
        for (name, text) in options {
            let tag = command.options.get(&name).ok_or_else(|| {
                err_msg!(
                    MalformedOption,
                    "command '{}' has no option /{}",
                    command.name,
                    name
                )
            })?;
            let value = self.types.coerce(tag, &text)?;
            coerced.insert(name, value);
        }
        Ok(Invocation {
            command: command.name.clone(),
            args,
            options: coerced,
        })
    }
}

impl ExecutionContext for Session {
    fn run_command(
        &mut self,
        command: &CommandDescriptor,
        args: Vec<String>,
        options: ParseOptions,
    ) -> Result<(), PlotlineError> {
        let location = self.location.clone();
        let invocation = self
            .coerce_invocation(command, args, options)
            .map_err(|e| e.with_location(&location))?;
        if self.verbose {
            tracing::info!(%location, command = %command.name, "running");
        } else {
            tracing::debug!(%location, command = %command.name, "running");
        }
        command
            .invoke(self, &invocation)
            .map_err(|e| e.with_location(&location))
    }

    fn set_source_location(&mut self, location: SourceLocation) {
        self.location = location;
    }

    fn source_location(&self) -> &SourceLocation {
        &self.location
    }

    fn lookup_command(&self, name: &str) -> Option<Rc<CommandDescriptor>> {
        self.commands.get(name)
    }

    fn define_variable(&mut self, name: &str, binding: Binding, override_existing: bool) -> bool {
        self.variables.define(name, binding, override_existing)
    }

    fn variables(&self) -> &Variables {
        &self.variables
    }

    fn is_boolean(&self, tag: &str) -> bool {
        self.types.is_boolean(tag)
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.warnings.push(message.to_string());
    }

    fn run_script(&mut self, code: &str) -> Result<(), PlotlineError> {
        match self.script_host.as_mut() {
            Some(host) => host.run(code),
            None => Err(err_msg!(Script, "no script interpreter configured")),
        }
    }

    fn run_legacy(&mut self, text: &str) -> Result<(), PlotlineError> {
        let Some(mut parser) = self.legacy_parser.take() else {
            return Err(err_loc!(
                Syntax,
                &self.location,
                "file uses the legacy call syntax but no legacy parser is configured"
            )
            .with_help("rerun with --no-legacy to read it as a modern command file"));
        };
        let result = parser.run(text, self);
        self.legacy_parser = Some(parser);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::cli::output::OutputBuffer;
    use crate::commands::CommandArg;
    use crate::diagnostics::ErrorType;
    use crate::types::builtin::{BOOLEAN, COLOR, INTEGER, TEXT};
    use crate::types::Value;

    fn commands() -> CommandSet {
        let mut set = CommandSet::new();
        set.add(
            CommandDescriptor::new("title", |session, inv| session.draw(inv))
                .arg(CommandArg::new(TEXT))
                .option("color", COLOR),
        )
        .unwrap();
        set.add(
            CommandDescriptor::new("verbose", |session, inv| {
                session.set_verbose(inv.arg(0).and_then(Value::as_bool).unwrap_or(false));
                Ok(())
            })
            .arg(CommandArg::new(BOOLEAN)),
        )
        .unwrap();
        set.add(CommandDescriptor::new("count", |_, _| Ok(())).arg(CommandArg::new(INTEGER)))
            .unwrap();
        set
    }

    fn session() -> (Session, Rc<RefCell<OutputBuffer>>) {
        let buffer = Rc::new(RefCell::new(OutputBuffer::new()));
        let session = Session::new(
            Rc::new(commands()),
            Rc::new(TypeRegistry::standard().unwrap()),
        )
        .with_surface(TranscriptSurface::new(
            Rc::clone(&buffer),
            TranscriptFormat::Text,
        ));
        (session, buffer)
    }

    fn run(session: &mut Session, name: &str, args: &[&str], options: &[(&str, &str)]) -> Result<(), PlotlineError> {
        let command = session.lookup_command(name).unwrap();
        let options = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        session.run_command(&command, args.iter().map(|a| a.to_string()).collect(), options)
    }

    #[test]
    fn test_coerced_values_reach_the_surface() {
        let (mut session, buffer) = session();
        run(&mut session, "title", &["Hi"], &[("color", "red")]).unwrap();
        assert_eq!(buffer.borrow().as_str(), "title Hi /color=1,0,0");
    }

    #[test]
    fn test_boolean_argument() {
        let (mut session, _) = session();
        run(&mut session, "verbose", &["YES"], &[]).unwrap();
        assert!(session.is_verbose());
        run(&mut session, "verbose", &["off"], &[]).unwrap();
        assert!(!session.is_verbose());
    }

    #[test]
    fn test_coercion_error_carries_location() {
        let (mut session, _) = session();
        session.set_source_location(SourceLocation::in_file("count", "a.plt", 7));
        let err = run(&mut session, "count", &["seven"], &[]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Coercion);
        assert!(err.message().contains("invalid literal 'seven'"));
        assert_eq!(err.location().map(|l| l.line), Some(7));
    }

    #[test]
    fn test_wrong_argument_count() {
        let (mut session, _) = session();
        let err = run(&mut session, "title", &["a", "b"], &[]).unwrap_err();
        assert!(err.message().contains("expects 1 argument(s), got 2"));
    }

    #[test]
    fn test_undeclared_option_is_rejected() {
        let (mut session, _) = session();
        let err = run(&mut session, "title", &["a"], &[("size", "3")]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedOption);
    }

    #[test]
    fn test_missing_collaborators_are_errors() {
        let (mut session, _) = session();
        assert_eq!(session.run_script("puts 1").unwrap_err().error_type(), ErrorType::Script);
        assert_eq!(session.run_legacy("foo(1)").unwrap_err().error_type(), ErrorType::Syntax);
    }

    struct Forwarding;

    impl LegacyParser for Forwarding {
        fn run(&mut self, text: &str, context: &mut dyn ExecutionContext) -> Result<(), PlotlineError> {
            let command = context.lookup_command("title").unwrap();
            context.run_command(&command, vec![text.trim().to_string()], ParseOptions::new())
        }
    }

    #[test]
    fn test_legacy_parser_dispatches_through_session() {
        let (session, buffer) = session();
        let mut session = session.with_legacy_parser(Forwarding);
        session.run_legacy("old\n").unwrap();
        session.run_legacy("again\n").unwrap();
        assert_eq!(buffer.borrow().as_str(), "title old\ntitle again");
    }

    #[test]
    fn test_warnings_are_recorded() {
        let (mut session, _) = session();
        session.warn("careful");
        assert_eq!(session.warnings(), ["careful".to_string()]);
    }
}
