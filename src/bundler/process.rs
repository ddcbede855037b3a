//! External tool invocation.
//!
//! The builder never spawns processes directly. It describes the command as a
//! [`ToolCommand`] and hands it to a [`CommandRunner`], which reports the exit
//! code and captured output. [`SystemRunner`] is the real implementation.

use crate::bundler::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

/// A fully specified external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Starts a command for `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Prefixes the command with `fakeroot` when requested.
    pub fn under_fakeroot(self, enabled: bool) -> Self {
        if !enabled {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: OsString::from("fakeroot"),
            args,
        }
    }

    /// Program to execute.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, in order.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Name of the tool doing the work, looking through `fakeroot`.
    pub fn tool_name(&self) -> String {
        let tool: &OsStr = if self.program == "fakeroot" {
            self.args.first().unwrap_or(&self.program)
        } else {
            &self.program
        };
        Path::new(tool)
            .file_name()
            .unwrap_or(tool)
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Runs the command and waits for it to exit.
    ///
    /// # Errors
    ///
    /// [`Error::CommandFailed`] if the process could not be started. A
    /// non-zero exit is not an error at this level.
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;
}

/// Runs commands as real child processes via `tokio::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        log::debug!("running: {}", command);

        let mut cmd = tokio::process::Command::new(command.program());
        cmd.args(command.get_args());

        let output = cmd.output().await.map_err(|error| Error::CommandFailed {
            command: command.tool_name(),
            error,
        })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in result.stdout.lines() {
            log::debug!("{}: {}", command.tool_name(), line);
        }
        if !result.success() {
            for line in result.stderr.lines() {
                log::warn!("{}: {}", command.tool_name(), line);
            }
        }

        Ok(result)
    }
}
