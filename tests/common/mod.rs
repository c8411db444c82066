//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use plotline::cli::output::OutputBuffer;
use plotline::commands::standard::standard_commands;
use plotline::context::ScriptHost;
use plotline::session::Session;
use plotline::surface::{TranscriptFormat, TranscriptSurface};
use plotline::types::TypeRegistry;
use plotline::PlotlineError;

/// Shared capture of everything a session prints.
pub type Captured = Rc<RefCell<OutputBuffer>>;

/// A standard session whose transcript and echo output land in one buffer.
pub fn session() -> (Session, Captured) {
    let buffer: Captured = Rc::new(RefCell::new(OutputBuffer::new()));
    let session = Session::new(
        Rc::new(standard_commands().unwrap()),
        Rc::new(TypeRegistry::standard().unwrap()),
    )
    .with_surface(TranscriptSurface::new(
        Rc::clone(&buffer),
        TranscriptFormat::Text,
    ))
    .with_output(Rc::clone(&buffer));
    (session, buffer)
}

pub fn lines(buffer: &Captured) -> Vec<String> {
    buffer.borrow().as_str().lines().map(str::to_string).collect()
}

/// Records script blocks instead of running them.
#[derive(Clone, Default)]
pub struct ScriptLog {
    pub blocks: Rc<RefCell<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl ScriptHost for ScriptLog {
    fn run(&mut self, code: &str) -> Result<(), PlotlineError> {
        self.blocks.borrow_mut().push(code.to_string());
        match &self.fail_with {
            Some(message) => Err(plotline::err_msg!(Script, "{}", message)),
            None => Ok(()),
        }
    }
}
