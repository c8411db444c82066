//! Foreign-code blocks run by an external interpreter.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::context::ScriptHost;
use crate::{err_msg, PlotlineError};

/// Pipes each block into `program` on stdin and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessScriptHost {
    program: String,
    args: Vec<String>,
}

impl ProcessScriptHost {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ScriptHost for ProcessScriptHost {
    fn run(&mut self, code: &str) -> Result<(), PlotlineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| err_msg!(Script, "cannot start '{}': {}", self.program, e))?;

        // Feed stdin from its own thread so a child that fills its stderr
        // pipe before reading all the code cannot stall us.
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(code.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "writer panicked")));
            (output, written)
        });

        let output =
            output.map_err(|e| err_msg!(Script, "'{}' did not finish: {}", self.program, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(err_msg!(
                Script,
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }
        written.map_err(|e| err_msg!(Script, "cannot send code to '{}': {}", self.program, e))?;
        tracing::debug!(program = %self.program, bytes = code.len(), "script block finished");
        Ok(())
    }
}
