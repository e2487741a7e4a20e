//! Types for the build graph.
//!
//! Node identifiers, evaluation options, per-node outcomes and the errors the
//! graph can raise at construction or evaluation time.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::producer::ProduceError;

/// Identifier of a graph node: a file path or a logical target name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for NodeId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for NodeId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl From<&NodeId> for NodeId {
  fn from(value: &NodeId) -> Self {
    value.clone()
  }
}

impl From<&Path> for NodeId {
  fn from(value: &Path) -> Self {
    Self(value.to_string_lossy().into_owned())
  }
}

impl From<&PathBuf> for NodeId {
  fn from(value: &PathBuf) -> Self {
    Self::from(value.as_path())
  }
}

impl From<PathBuf> for NodeId {
  fn from(value: PathBuf) -> Self {
    Self::from(value.as_path())
  }
}

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum NodeKind {
  /// A file at `path`, either a source (no producer) or a produced artifact.
  File { path: PathBuf },
  /// A named group of dependencies with no artifact of its own.
  Alias,
}

impl NodeKind {
  pub fn name(&self) -> &'static str {
    match self {
      NodeKind::File { .. } => "file",
      NodeKind::Alias => "alias",
    }
  }
}

/// How evaluation reacts to a failed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
  /// Skip dependents of the failed node; independent nodes keep running.
  #[default]
  KeepGoing,
  /// Start no new work once any node has failed.
  FailFast,
}

/// Configuration for a single `evaluate` call.
#[derive(Debug, Clone)]
pub struct EvalOptions {
  /// Maximum number of producers running at once.
  pub jobs: usize,
  pub policy: FailurePolicy,
}

impl Default for EvalOptions {
  fn default() -> Self {
    Self {
      jobs: num_cpus(),
      policy: FailurePolicy::default(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Errors raised while declaring or evaluating the graph.
#[derive(Debug, Error)]
pub enum GraphError {
  /// Adding `node -> dependency` would close a cycle.
  #[error("dependency cycle detected: {node} depends on {dependency}, which already depends on {node}")]
  CycleDetected { node: NodeId, dependency: NodeId },

  /// A node already has a producer; each path has a single writer.
  #[error("node {0} already has a producer")]
  DuplicateProducer(NodeId),

  /// A node was redeclared with a different kind.
  #[error("node {node} is declared as {existing}, cannot redeclare it as {requested}")]
  KindConflict {
    node: NodeId,
    existing: &'static str,
    requested: &'static str,
  },

  /// The requested target was never declared.
  #[error("unknown target: {0}")]
  UnknownTarget(NodeId),

  /// The async runtime used for evaluation could not start.
  #[error("failed to start evaluation runtime: {0}")]
  Runtime(#[source] io::Error),
}

/// Why a node was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reason", content = "node")]
pub enum SkipCause {
  /// A dependency failed or was itself skipped.
  FailedDependency(NodeId),
  /// Fail-fast evaluation stopped after another node failed.
  Aborted,
}

impl fmt::Display for SkipCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipCause::FailedDependency(id) => write!(f, "dependency {} failed", id),
      SkipCause::Aborted => f.write_str("evaluation aborted"),
    }
  }
}

/// Result of evaluating a single node.
#[derive(Debug)]
pub enum NodeOutcome {
  /// The producer ran and materialized the node.
  Built,
  /// Already materialized and newer than its dependencies.
  UpToDate,
  /// An alias; `stale` is true when any dependency was rebuilt.
  Alias { stale: bool },
  /// The producer failed, or a required file is missing.
  Failed(ProduceError),
  /// Not attempted.
  Skipped(SkipCause),
}

impl NodeOutcome {
  pub fn label(&self) -> &'static str {
    match self {
      NodeOutcome::Built => "built",
      NodeOutcome::UpToDate => "up-to-date",
      NodeOutcome::Alias { .. } => "alias",
      NodeOutcome::Failed(_) => "failed",
      NodeOutcome::Skipped(_) => "skipped",
    }
  }

  pub fn is_failure(&self) -> bool {
    matches!(self, NodeOutcome::Failed(_) | NodeOutcome::Skipped(_))
  }
}

/// The first failure of an evaluation, as `failure(node_id, cause)`.
#[derive(Debug, Error)]
#[error("node {node} failed: {cause}")]
pub struct EvaluateError {
  pub node: NodeId,
  #[source]
  pub cause: ProduceError,
}

/// Per-node outcomes of one `evaluate` call, in evaluation order.
#[derive(Debug)]
pub struct EvalReport {
  pub target: NodeId,
  order: Vec<NodeId>,
  outcomes: BTreeMap<NodeId, NodeOutcome>,
  executed: usize,
}

impl EvalReport {
  pub(crate) fn new(target: NodeId) -> Self {
    Self {
      target,
      order: Vec::new(),
      outcomes: BTreeMap::new(),
      executed: 0,
    }
  }

  /// Record the outcome of a node whose producer was invoked.
  pub(crate) fn record_executed(&mut self, id: NodeId, outcome: NodeOutcome) {
    self.executed += 1;
    self.record(id, outcome);
  }

  pub(crate) fn record(&mut self, id: NodeId, outcome: NodeOutcome) {
    self.order.push(id.clone());
    self.outcomes.insert(id, outcome);
  }

  /// Returns true if no node failed or was skipped.
  pub fn is_success(&self) -> bool {
    !self.outcomes.values().any(NodeOutcome::is_failure)
  }

  pub fn outcome(&self, id: &NodeId) -> Option<&NodeOutcome> {
    self.outcomes.get(id)
  }

  /// Nodes with their outcomes in the order they were resolved.
  pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeOutcome)> {
    self.order.iter().filter_map(|id| self.outcomes.get(id).map(|o| (id, o)))
  }

  /// Nodes whose producer ran.
  pub fn built(&self) -> Vec<&NodeId> {
    self.filter(|o| matches!(o, NodeOutcome::Built))
  }

  pub fn up_to_date(&self) -> Vec<&NodeId> {
    self.filter(|o| matches!(o, NodeOutcome::UpToDate))
  }

  pub fn failed(&self) -> Vec<(&NodeId, &ProduceError)> {
    self
      .iter()
      .filter_map(|(id, o)| match o {
        NodeOutcome::Failed(e) => Some((id, e)),
        _ => None,
      })
      .collect()
  }

  pub fn skipped(&self) -> Vec<(&NodeId, &SkipCause)> {
    self
      .iter()
      .filter_map(|(id, o)| match o {
        NodeOutcome::Skipped(cause) => Some((id, cause)),
        _ => None,
      })
      .collect()
  }

  /// Number of producers executed (successfully or not).
  pub fn executed(&self) -> usize {
    self.executed
  }

  /// Total number of nodes resolved.
  pub fn total(&self) -> usize {
    self.outcomes.len()
  }

  /// Collapse into `success | failure(node_id, cause)`, reporting the first
  /// failure in evaluation order.
  pub fn into_result(mut self) -> Result<(), EvaluateError> {
    let first = self
      .order
      .iter()
      .find(|id| matches!(self.outcomes.get(*id), Some(NodeOutcome::Failed(_))))
      .cloned();

    match first {
      Some(node) => match self.outcomes.remove(&node) {
        Some(NodeOutcome::Failed(cause)) => Err(EvaluateError { node, cause }),
        _ => Ok(()),
      },
      None => Ok(()),
    }
  }

  /// A serializable view for machine-readable output.
  pub fn summary(&self) -> ReportSummary {
    ReportSummary {
      target: self.target.clone(),
      success: self.is_success(),
      nodes: self
        .iter()
        .map(|(id, outcome)| NodeSummary {
          node: id.clone(),
          outcome: outcome.label(),
          detail: match outcome {
            NodeOutcome::Failed(e) => Some(e.to_string()),
            NodeOutcome::Skipped(cause) => Some(cause.to_string()),
            NodeOutcome::Alias { stale: true } => Some("stale".to_string()),
            _ => None,
          },
        })
        .collect(),
    }
  }

  fn filter(&self, predicate: impl Fn(&NodeOutcome) -> bool) -> Vec<&NodeId> {
    self.iter().filter(|(_, o)| predicate(o)).map(|(id, _)| id).collect()
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
  pub target: NodeId,
  pub success: bool,
  pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
  pub node: NodeId,
  pub outcome: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}
