//! Subprocess execution.
//!
//! Every external tool is described by a [`Cmd`] and executed through a
//! [`Runner`]. Components never spawn processes directly, so the whole
//! pipeline can be driven by a fake runner in tests.
//!
//! ```rust,ignore
//! use vm_register::process::{Cmd, PrivilegedRunner, SystemRunner};
//!
//! let runner = PrivilegedRunner::new(SystemRunner, "sudo");
//! Cmd::new("qemu-img")
//!     .args(["convert", "-O", "qcow2"])
//!     .arg_path(src)
//!     .arg_path(dst)
//!     .error_msg("failed to create independent image")
//!     .run(&runner)?;
//! ```

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::ProvisionError;

/// How a command's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    /// Collect stdout and stderr into the result.
    #[default]
    Output,
    /// Stream straight to the operator's console. Nothing is captured.
    Inherit,
}

/// Uniform result of running a command.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    /// The command line that was actually executed (after escalation).
    pub command: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, lossily decoded.
    pub fn combined(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Executes commands. Implementations decide how (or whether) a process is spawned.
pub trait Runner {
    fn execute(&self, cmd: &Cmd) -> Result<CmdOutput>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn execute(&self, cmd: &Cmd) -> Result<CmdOutput> {
        (**self).execute(cmd)
    }
}

/// Builder describing one external command invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    capture: Capture,
    error_msg: Option<String>,
    show_command: bool,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            capture: Capture::Output,
            error_msg: None,
            show_command: false,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Stream output to the console instead of capturing it.
    pub fn inherit_stdio(mut self) -> Self {
        self.capture = Capture::Inherit;
        self
    }

    /// Message used when the command exits non-zero.
    pub fn error_msg(mut self, msg: &str) -> Self {
        self.error_msg = Some(msg.to_string());
        self
    }

    /// Include the executed command line in the failure report.
    pub fn show_command(mut self) -> Self {
        self.show_command = true;
        self
    }

    /// Return the output even if the command exits non-zero.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn capture(&self) -> Capture {
        self.capture
    }

    /// The same command prefixed by `via` (e.g. `sudo`).
    pub fn escalated(&self, via: &str) -> Cmd {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program.clone());
        args.extend(self.args.iter().cloned());
        Cmd {
            program: OsString::from(via),
            args,
            ..self.clone()
        }
    }

    /// Run through `runner`, turning a non-zero exit into [`ProvisionError::Subprocess`].
    pub fn run(&self, runner: &dyn Runner) -> Result<CmdOutput> {
        let output = runner.execute(self)?;
        if output.success() || self.allow_fail {
            return Ok(output);
        }

        let what = self
            .error_msg
            .clone()
            .unwrap_or_else(|| format!("{} failed", self.program.to_string_lossy()));
        Err(ProvisionError::Subprocess {
            what,
            status: output.status_text(),
            command: self.show_command.then(|| output.command.clone()),
            output: output.combined().trim_end().to_string(),
        }
        .into())
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Spawns real processes and blocks until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn execute(&self, cmd: &Cmd) -> Result<CmdOutput> {
        let command_line = cmd.to_string();
        tracing::debug!(command = %command_line, capture = ?cmd.capture(), "running");

        let mut command = Command::new(cmd.program());
        command.args(cmd.get_args());

        match cmd.capture() {
            Capture::Output => {
                let output = command
                    .stdin(Stdio::null())
                    .output()
                    .with_context(|| format!("Failed to run {}", command_line))?;
                Ok(finish(command_line, output.status, output.stdout, output.stderr))
            }
            Capture::Inherit => {
                let status = command
                    .status()
                    .with_context(|| format!("Failed to run {}", command_line))?;
                Ok(finish(command_line, status, Vec::new(), Vec::new()))
            }
        }
    }
}

fn finish(command: String, status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> CmdOutput {
    tracing::debug!(command = %command, status = %status, "finished");
    CmdOutput {
        command,
        code: status.code(),
        stdout,
        stderr,
    }
}

/// Runs every command with elevated privilege by prefixing the escalation tool.
#[derive(Debug, Clone)]
pub struct PrivilegedRunner<R> {
    inner: R,
    via: String,
}

impl<R: Runner> PrivilegedRunner<R> {
    pub fn new(inner: R, via: impl Into<String>) -> Self {
        Self {
            inner,
            via: via.into(),
        }
    }
}

impl<R: Runner> Runner for PrivilegedRunner<R> {
    fn execute(&self, cmd: &Cmd) -> Result<CmdOutput> {
        self.inner.execute(&cmd.escalated(&self.via))
    }
}
