//! Process execution backed by `std::process`.

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{ExternalProcess, Invocation, ProcessOutput};

/// Runs invocations as real child processes and captures their output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcess;

impl ExternalProcess for SystemProcess {
  fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).stdin(Stdio::null());

    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }
    for (key, value) in &invocation.env {
      command.env(key, value);
    }

    debug!(cmd = %invocation, cwd = ?invocation.cwd, "spawning process");

    let output = command.output()?;
    let result = ProcessOutput {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.success() {
      if !result.stderr.is_empty() {
        debug!(stderr = %result.stderr, "command stderr");
      }
      if !result.stdout.is_empty() {
        debug!(stdout = %result.stdout, "command stdout");
      }
    }

    Ok(result)
  }
}
