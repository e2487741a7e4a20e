//! External process capability.
//!
//! Every subprocess the orchestrator launches (compiler, capability checks,
//! the packaging tool) goes through the [`ExternalProcess`] trait. The real
//! implementation is [`SystemProcess`]; tests substitute fakes that record
//! invocations and return canned exit codes.

mod system;

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub use system::SystemProcess;

/// A fully-specified process invocation: arguments in, no shell involved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
  /// Program name or path, resolved through `PATH` by the implementation.
  pub program: String,
  /// Arguments passed verbatim.
  pub args: Vec<String>,
  /// Working directory. Inherited when `None`.
  pub cwd: Option<PathBuf>,
  /// Extra environment variables layered over the inherited environment.
  pub env: BTreeMap<String, String>,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Self::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Append a path argument.
  pub fn path_arg(self, path: &Path) -> Self {
    self.arg(path.to_string_lossy())
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

/// What a finished process reported back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
  /// Exit code; `None` when the process was terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// A successful exit with no output.
  pub fn ok() -> Self {
    Self {
      code: Some(0),
      ..Self::default()
    }
  }

  /// A failed exit with the given code and stderr text.
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  /// Short diagnostic built from stderr, falling back to stdout.
  pub fn diagnostic(&self) -> String {
    let text = if self.stderr.trim().is_empty() {
      self.stdout.trim()
    } else {
      self.stderr.trim()
    };
    text.lines().take(3).collect::<Vec<_>>().join("; ")
  }
}

/// Runs external programs.
///
/// `Err` means the process could not be started at all; a process that ran
/// and exited non-zero is an `Ok` with a non-success [`ProcessOutput`].
pub trait ExternalProcess: Send + Sync {
  fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput>;
}
