//! Producers: the actions that materialize file nodes.
//!
//! A producer runs on a blocking worker thread during evaluation. It receives
//! the node's output path and the paths of its file dependencies, and must
//! leave the output (plus any extra [`Producer::outputs`]) on disk.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::process::{ExternalProcess, Invocation};

use super::types::NodeId;

/// Everything a producer gets to see about the node it materializes.
#[derive(Debug, Clone)]
pub struct ProduceContext {
  pub id: NodeId,
  /// The path the producer must create.
  pub output: PathBuf,
  /// Paths of file dependencies, ordered by node id.
  pub dependencies: Vec<PathBuf>,
}

/// Errors a producer (or evaluation of a file node) can fail with.
#[derive(Debug, Error)]
pub enum ProduceError {
  /// An external command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}{}", stderr_suffix(.stderr))]
  Command {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// An external command could not be started.
  #[error("failed to run {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  /// A source file with no producer does not exist.
  #[error("source file not found: {}", .0.display())]
  MissingSource(PathBuf),

  #[error("io error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The producer reported success without creating its output.
  #[error("producer did not create {}", .0.display())]
  OutputMissing(PathBuf),

  /// Inputs the producer cannot work with.
  #[error("{0}")]
  Invalid(String),

  /// The producer's worker thread panicked or was cancelled.
  #[error("producer aborted: {0}")]
  Aborted(String),
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!(" ({})", stderr)
  }
}

impl ProduceError {
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    ProduceError::Io {
      path: path.into(),
      source,
    }
  }
}

/// Materializes a file node.
pub trait Producer: Send + Sync {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError>;

  /// Short human-readable description for logs and plans.
  fn describe(&self) -> String;

  /// Files written in addition to the node's own output.
  ///
  /// A node whose extra outputs are missing is considered stale.
  fn outputs(&self) -> Vec<PathBuf> {
    Vec::new()
  }

  /// Whether an existing output still matches inputs that are not files,
  /// such as configuration values. A node whose output is not current is
  /// stale regardless of timestamps.
  fn is_current(&self, _output: &Path) -> bool {
    true
  }
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<(), ProduceError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).map_err(|e| ProduceError::io(parent, e))?;
  }
  Ok(())
}

/// Copies a single file to the node's output path.
///
/// Permission bits travel with the copy, so staged executables stay
/// executable.
#[derive(Debug, Clone)]
pub struct CopyProducer {
  source: PathBuf,
}

impl CopyProducer {
  pub fn new(source: impl Into<PathBuf>) -> Self {
    Self { source: source.into() }
  }

  pub fn source(&self) -> &Path {
    &self.source
  }
}

impl Producer for CopyProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    ensure_parent(&ctx.output)?;
    fs::copy(&self.source, &ctx.output).map_err(|e| ProduceError::io(&self.source, e))?;
    debug!(from = %self.source.display(), to = %ctx.output.display(), "copied file");
    Ok(())
  }

  fn describe(&self) -> String {
    format!("copy {}", self.source.display())
  }
}

/// Runs an external command expected to write the node's output.
#[derive(Clone)]
pub struct CommandProducer {
  process: Arc<dyn ExternalProcess>,
  invocation: Invocation,
}

impl CommandProducer {
  pub fn new(process: Arc<dyn ExternalProcess>, invocation: Invocation) -> Self {
    Self { process, invocation }
  }

  pub fn invocation(&self) -> &Invocation {
    &self.invocation
  }
}

impl fmt::Debug for CommandProducer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CommandProducer")
      .field("invocation", &self.invocation)
      .finish_non_exhaustive()
  }
}

impl Producer for CommandProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    ensure_parent(&ctx.output)?;
    run_checked(self.process.as_ref(), &self.invocation)
  }

  fn describe(&self) -> String {
    self.invocation.to_string()
  }
}

/// Run `invocation`, mapping a spawn failure or non-zero exit to a
/// [`ProduceError`].
pub fn run_checked(process: &dyn ExternalProcess, invocation: &Invocation) -> Result<(), ProduceError> {
  let output = process.run(invocation).map_err(|source| ProduceError::Spawn {
    cmd: invocation.to_string(),
    source,
  })?;

  if output.success() {
    Ok(())
  } else {
    Err(ProduceError::Command {
      cmd: invocation.to_string(),
      code: output.code,
      stderr: output.diagnostic(),
    })
  }
}

type ProduceFn = dyn Fn(&ProduceContext) -> Result<(), ProduceError> + Send + Sync;

/// A producer backed by a closure.
pub struct FnProducer {
  description: String,
  func: Box<ProduceFn>,
}

impl FnProducer {
  pub fn new<F>(description: impl Into<String>, func: F) -> Self
  where
    F: Fn(&ProduceContext) -> Result<(), ProduceError> + Send + Sync + 'static,
  {
    Self {
      description: description.into(),
      func: Box::new(func),
    }
  }
}

impl Producer for FnProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    (self.func)(ctx)
  }

  fn describe(&self) -> String {
    self.description.clone()
  }
}

/// Writes fixed content, and only when the file on disk differs.
///
/// Nodes that should rebuild when configuration changes depend on a stamp
/// holding that configuration: the stamp keeps its old mtime while the
/// content is unchanged and counts as rebuilt once it changes.
#[derive(Debug, Clone)]
pub struct StampProducer {
  content: String,
}

impl StampProducer {
  pub fn new(content: impl Into<String>) -> Self {
    Self { content: content.into() }
  }

  pub fn content(&self) -> &str {
    &self.content
  }
}

impl Producer for StampProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    ensure_parent(&ctx.output)?;
    fs::write(&ctx.output, &self.content).map_err(|e| ProduceError::io(&ctx.output, e))?;
    debug!(path = %ctx.output.display(), "stamp updated");
    Ok(())
  }

  fn describe(&self) -> String {
    "stamp".to_string()
  }

  fn is_current(&self, output: &Path) -> bool {
    fs::read_to_string(output).is_ok_and(|on_disk| on_disk == self.content)
  }
}
