//! Build graph.
//!
//! A DAG of file nodes and aliases. Edges run from a dependency to its
//! dependent. Cycles are rejected when a node is declared, so the graph is
//! acyclic at all times and evaluation never has to discover one.
//!
//! Referencing a node that was never declared creates an implicit source
//! node for that path. A later declaration may upgrade it to a produced file
//! or to an alias.

mod evaluate;
pub mod producer;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::trace;

pub use producer::{
  CommandProducer, CopyProducer, FnProducer, ProduceContext, ProduceError, Producer, StampProducer,
};
pub use types::{
  EvalOptions, EvalReport, EvaluateError, FailurePolicy, GraphError, NodeId, NodeKind, NodeOutcome, ReportSummary,
  SkipCause,
};

struct Node {
  id: NodeId,
  kind: NodeKind,
  producer: Option<Arc<dyn Producer>>,
  /// Created by reference only; no explicit declaration yet.
  implicit: bool,
}

/// Read-only view of a node for planning and display.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
  pub id: NodeId,
  #[serde(flatten)]
  pub kind: NodeKind,
  /// Producer description, `None` for sources and aliases.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub producer: Option<String>,
  pub dependencies: Vec<NodeId>,
}

/// A directed acyclic graph of build nodes.
#[derive(Default)]
pub struct BuildGraph {
  graph: DiGraph<Node, ()>,
  nodes: HashMap<NodeId, NodeIndex>,
}

impl BuildGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare a file node at `path`.
  ///
  /// Without a producer the node is a source file that must already exist
  /// when evaluated. Dependencies that are not declared yet become implicit
  /// source nodes.
  ///
  /// # Errors
  ///
  /// - [`GraphError::CycleDetected`] if a dependency already depends on `path`
  ///   (including `path` itself). The graph is left unchanged.
  /// - [`GraphError::DuplicateProducer`] if `path` already has a producer and
  ///   another one is supplied.
  /// - [`GraphError::KindConflict`] if `path` names an alias.
  pub fn add_node(
    &mut self,
    path: impl Into<PathBuf>,
    dependencies: &[NodeId],
    producer: Option<Arc<dyn Producer>>,
  ) -> Result<NodeId, GraphError> {
    let path = path.into();
    let id = NodeId::from(path.as_path());

    if let Some(&idx) = self.nodes.get(&id) {
      let node = &self.graph[idx];
      if matches!(node.kind, NodeKind::Alias) {
        return Err(GraphError::KindConflict {
          node: id,
          existing: "alias",
          requested: "file",
        });
      }
      if producer.is_some() && node.producer.is_some() {
        return Err(GraphError::DuplicateProducer(id));
      }
    }

    self.check_acyclic(&id, dependencies)?;

    let idx = self.ensure_file(&id, &path);
    let node = &mut self.graph[idx];
    node.implicit = false;
    if producer.is_some() {
      node.producer = producer;
    }

    self.connect(idx, dependencies);
    trace!(node = %id, deps = dependencies.len(), "declared file node");
    Ok(id)
  }

  /// Declare a source file node with no producer and no dependencies.
  pub fn add_source(&mut self, path: impl Into<PathBuf>) -> Result<NodeId, GraphError> {
    self.add_node(path, &[], None)
  }

  /// Declare an alias: a logical target standing for its dependencies.
  ///
  /// Declaring the same alias again appends to its dependency set.
  ///
  /// # Errors
  ///
  /// [`GraphError::CycleDetected`] as for [`add_node`](Self::add_node), and
  /// [`GraphError::KindConflict`] if `name` is an explicitly declared file.
  pub fn add_alias(&mut self, name: &str, dependencies: &[NodeId]) -> Result<NodeId, GraphError> {
    let id = NodeId::from(name);

    if let Some(&idx) = self.nodes.get(&id) {
      let node = &self.graph[idx];
      if matches!(node.kind, NodeKind::File { .. }) && (!node.implicit || node.producer.is_some()) {
        return Err(GraphError::KindConflict {
          node: id,
          existing: "file",
          requested: "alias",
        });
      }
    }

    self.check_acyclic(&id, dependencies)?;

    let idx = match self.nodes.get(&id) {
      Some(&idx) => {
        let node = &mut self.graph[idx];
        node.kind = NodeKind::Alias;
        node.implicit = false;
        idx
      }
      None => self.insert(Node {
        id: id.clone(),
        kind: NodeKind::Alias,
        producer: None,
        implicit: false,
      }),
    };

    self.connect(idx, dependencies);
    trace!(alias = %id, deps = dependencies.len(), "declared alias");
    Ok(id)
  }

  pub fn contains(&self, id: &NodeId) -> bool {
    self.nodes.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn kind(&self, id: &NodeId) -> Option<&NodeKind> {
    self.nodes.get(id).map(|&idx| &self.graph[idx].kind)
  }

  /// File path of a node, `None` for aliases and unknown ids.
  pub fn path(&self, id: &NodeId) -> Option<&Path> {
    match self.kind(id)? {
      NodeKind::File { path } => Some(path),
      NodeKind::Alias => None,
    }
  }

  pub fn has_producer(&self, id: &NodeId) -> bool {
    self.nodes.get(id).is_some_and(|&idx| self.graph[idx].producer.is_some())
  }

  /// Direct dependencies of `id`, sorted.
  pub fn dependencies(&self, id: &NodeId) -> Vec<NodeId> {
    self.neighbors(id, Direction::Incoming)
  }

  /// Nodes that directly depend on `id`, sorted.
  pub fn dependents(&self, id: &NodeId) -> Vec<NodeId> {
    self.neighbors(id, Direction::Outgoing)
  }

  pub fn info(&self, id: &NodeId) -> Option<NodeInfo> {
    let &idx = self.nodes.get(id)?;
    let node = &self.graph[idx];
    Some(NodeInfo {
      id: node.id.clone(),
      kind: node.kind.clone(),
      producer: node.producer.as_ref().map(|p| p.describe()),
      dependencies: self.dependencies(id),
    })
  }

  /// Parallel evaluation waves for `target`.
  ///
  /// Only the target's dependency closure is included. Each wave holds nodes
  /// whose dependencies all sit in earlier waves; ids within a wave are
  /// sorted.
  ///
  /// # Errors
  ///
  /// [`GraphError::UnknownTarget`] if `target` was never declared.
  pub fn waves(&self, target: &NodeId) -> Result<Vec<Vec<NodeId>>, GraphError> {
    let &root = self
      .nodes
      .get(target)
      .ok_or_else(|| GraphError::UnknownTarget(target.clone()))?;

    let closure = self.closure(root);

    // Kahn's algorithm over the closure, one level per wave
    let mut in_degree: HashMap<NodeIndex, usize> = closure
      .iter()
      .map(|&idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();

    let mut waves = Vec::new();
    let mut remaining: HashSet<NodeIndex> = closure;

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[*idx] == 0).copied().collect();

      // Unreachable while the graph stays acyclic
      if ready.is_empty() {
        break;
      }

      for &idx in &ready {
        remaining.remove(&idx);
        for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&dependent) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      let mut wave: Vec<NodeId> = ready.into_iter().map(|idx| self.graph[idx].id.clone()).collect();
      wave.sort();
      waves.push(wave);
    }

    Ok(waves)
  }

  fn check_acyclic(&self, id: &NodeId, dependencies: &[NodeId]) -> Result<(), GraphError> {
    for dep in dependencies {
      if dep == id {
        return Err(GraphError::CycleDetected {
          node: id.clone(),
          dependency: dep.clone(),
        });
      }

      // Edges run dependency -> dependent, so a path from `id` to `dep`
      // means `dep` already depends on `id`.
      if let (Some(&from), Some(&to)) = (self.nodes.get(id), self.nodes.get(dep))
        && has_path_connecting(&self.graph, from, to, None)
      {
        return Err(GraphError::CycleDetected {
          node: id.clone(),
          dependency: dep.clone(),
        });
      }
    }
    Ok(())
  }

  fn insert(&mut self, node: Node) -> NodeIndex {
    let id = node.id.clone();
    let idx = self.graph.add_node(node);
    self.nodes.insert(id, idx);
    idx
  }

  fn ensure_file(&mut self, id: &NodeId, path: &Path) -> NodeIndex {
    match self.nodes.get(id) {
      Some(&idx) => idx,
      None => self.insert(Node {
        id: id.clone(),
        kind: NodeKind::File {
          path: path.to_path_buf(),
        },
        producer: None,
        implicit: true,
      }),
    }
  }

  fn connect(&mut self, idx: NodeIndex, dependencies: &[NodeId]) {
    for dep in dependencies {
      let dep_idx = self.ensure_file(dep, Path::new(dep.as_str()));
      self.graph.update_edge(dep_idx, idx, ());
    }
  }

  fn neighbors(&self, id: &NodeId, direction: Direction) -> Vec<NodeId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };

    let mut ids: Vec<NodeId> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| self.graph[n].id.clone())
      .collect();
    ids.sort();
    ids
  }

  /// `root` plus everything it transitively depends on.
  fn closure(&self, root: NodeIndex) -> HashSet<NodeIndex> {
    let mut seen = HashSet::from([root]);
    let mut stack = vec![root];

    while let Some(idx) = stack.pop() {
      for dep in self.graph.neighbors_directed(idx, Direction::Incoming) {
        if seen.insert(dep) {
          stack.push(dep);
        }
      }
    }

    seen
  }
}
