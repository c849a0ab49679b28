//! Immutable launch configuration for a process
//!
//! Holds everything needed to spawn a command:
//! - Program and arguments
//! - Environment variable injection
//! - Working directory control

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tokio::process::Command;

/// Program, arguments, environment, and working directory of a process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessDescriptor {
    /// Program to execute (bare name resolved on PATH, or a path)
    pub program: String,
    /// Command arguments
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment variables to set
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Working directory for the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ProcessDescriptor {
    /// Create a descriptor for a program with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Create a descriptor running `command` through `shell`
    ///
    /// Uses `/C` for `cmd` and `-c` for everything else.
    pub fn shell(shell: impl Into<String>, command: impl Into<String>) -> Self {
        let shell = shell.into();
        let flag = if is_cmd(&shell) { "/C" } else { "-c" };
        Self::new(shell).arg(flag).arg(command)
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line for display and logging
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Resolve the program to an executable path
    ///
    /// Bare names are looked up on `PATH` unless the descriptor overrides
    /// `PATH` itself, in which case resolution is left to the OS.
    pub fn resolve_program(&self) -> io::Result<PathBuf> {
        let program = PathBuf::from(&self.program);
        if program.components().count() > 1 || self.env.contains_key("PATH") {
            return Ok(program);
        }

        which::which(&self.program).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: {}", self.program, e),
            )
        })
    }

    /// Build a tokio command with arguments, environment, and working directory
    pub fn command(&self) -> io::Result<Command> {
        let mut cmd = Command::new(self.resolve_program()?);
        cmd.args(&self.args);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        Ok(cmd)
    }
}

fn is_cmd(shell: &str) -> bool {
    let name = shell.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(shell);
    name.eq_ignore_ascii_case("cmd") || name.eq_ignore_ascii_case("cmd.exe")
}
