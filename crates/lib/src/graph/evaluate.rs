//! Graph evaluation.
//!
//! Waves run in order. Within a wave, stale file nodes are produced in
//! parallel on blocking worker threads, bounded by a semaphore. A failed node
//! marks every dependent as skipped; under [`FailurePolicy::FailFast`] no
//! further wave starts.
//!
//! Staleness is decided from modification times:
//! - a produced file is stale if its output or any extra output is missing,
//!   if its producer reports the output as no longer current, if a
//!   dependency was rebuilt during this evaluation, or if a dependency is
//!   newer than the output;
//! - an alias is stale if any dependency was rebuilt;
//! - a source file (no producer) is never stale, only present or missing.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use super::BuildGraph;
use super::producer::{ProduceContext, ProduceError, Producer};
use super::types::{EvalOptions, EvalReport, FailurePolicy, GraphError, NodeId, NodeKind, NodeOutcome, SkipCause};

/// A producer scheduled to run, with everything it needs moved in.
struct ProduceJob {
  producer: Arc<dyn Producer>,
  ctx: ProduceContext,
}

impl ProduceJob {
  fn run(self) -> Result<(), ProduceError> {
    self.producer.produce(&self.ctx)?;

    if !self.ctx.output.exists() {
      return Err(ProduceError::OutputMissing(self.ctx.output));
    }
    if let Some(extra) = self.producer.outputs().into_iter().find(|p| !p.exists()) {
      return Err(ProduceError::OutputMissing(extra));
    }
    Ok(())
  }
}

/// Bookkeeping carried across waves.
#[derive(Default)]
struct EvalState {
  /// Nodes that failed or were skipped.
  failed: HashSet<NodeId>,
  /// Nodes whose producer ran successfully, plus stale aliases.
  rebuilt: HashSet<NodeId>,
  /// Modification time of each resolved node; aliases take the newest of
  /// their dependencies.
  stamps: HashMap<NodeId, SystemTime>,
}

impl EvalState {
  fn newest_dependency(&self, deps: &[NodeId]) -> Option<SystemTime> {
    deps.iter().filter_map(|d| self.stamps.get(d)).max().copied()
  }
}

impl BuildGraph {
  /// Bring `target` and everything it depends on up to date.
  ///
  /// Node failures do not surface as `Err`: they are recorded in the
  /// returned [`EvalReport`]. Use [`EvalReport::into_result`] to collapse it
  /// into the first failure.
  ///
  /// # Errors
  ///
  /// [`GraphError::UnknownTarget`] if `target` was never declared.
  pub async fn evaluate(&self, target: &NodeId, options: &EvalOptions) -> Result<EvalReport, GraphError> {
    let waves = self.waves(target)?;
    let node_count: usize = waves.iter().map(Vec::len).sum();

    info!(
      target = %target,
      nodes = node_count,
      waves = waves.len(),
      jobs = options.jobs,
      "evaluating target"
    );

    let mut report = EvalReport::new(target.clone());
    let mut state = EvalState::default();
    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut aborted = false;

    for (wave_idx, wave) in waves.into_iter().enumerate() {
      if aborted {
        for id in wave {
          warn!(node = %id, "skipping node after fail-fast abort");
          state.failed.insert(id.clone());
          report.record(id, NodeOutcome::Skipped(SkipCause::Aborted));
        }
        continue;
      }

      debug!(wave = wave_idx, nodes = wave.len(), "evaluating wave");

      let mut jobs = Vec::new();
      for id in wave {
        if let Some(job) = self.resolve(id, &mut state, &mut report) {
          jobs.push(job);
        }
      }

      if jobs.is_empty() {
        continue;
      }

      for (id, result) in run_wave(jobs, semaphore.clone()).await {
        match result {
          Ok(()) => {
            info!(node = %id, "built");
            if let Some(stamp) = self.path(&id).and_then(modified) {
              state.stamps.insert(id.clone(), stamp);
            }
            state.rebuilt.insert(id.clone());
            report.record_executed(id, NodeOutcome::Built);
          }
          Err(e) => {
            error!(node = %id, error = %e, "producer failed");
            state.failed.insert(id.clone());
            report.record_executed(id, NodeOutcome::Failed(e));
            if options.policy == FailurePolicy::FailFast {
              aborted = true;
            }
          }
        }
      }
    }

    info!(
      target = %report.target,
      built = report.built().len(),
      failed = report.failed().len(),
      skipped = report.skipped().len(),
      "evaluation complete"
    );

    Ok(report)
  }

  /// Run [`evaluate`](Self::evaluate) on a fresh multi-threaded runtime.
  ///
  /// # Errors
  ///
  /// [`GraphError::Runtime`] if the runtime cannot start, otherwise as for
  /// `evaluate`.
  pub fn evaluate_blocking(&self, target: &NodeId, options: &EvalOptions) -> Result<EvalReport, GraphError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
      .enable_all()
      .build()
      .map_err(GraphError::Runtime)?;
    runtime.block_on(self.evaluate(target, options))
  }

  /// Decide what to do with one node whose dependencies are all resolved.
  ///
  /// Records the outcome directly unless a producer has to run, in which
  /// case the job is returned.
  fn resolve(&self, id: NodeId, state: &mut EvalState, report: &mut EvalReport) -> Option<ProduceJob> {
    let &idx = self.nodes.get(&id)?;
    let deps: Vec<NodeId> = self.dependencies(&id);

    if let Some(failed_dep) = deps.iter().find(|d| state.failed.contains(*d)) {
      warn!(node = %id, failed_dep = %failed_dep, "skipping node due to failed dependency");
      let cause = SkipCause::FailedDependency(failed_dep.clone());
      state.failed.insert(id.clone());
      report.record(id, NodeOutcome::Skipped(cause));
      return None;
    }

    let node = &self.graph[idx];
    let path = match &node.kind {
      NodeKind::Alias => {
        let stale = deps.iter().any(|d| state.rebuilt.contains(d));
        if let Some(stamp) = state.newest_dependency(&deps) {
          state.stamps.insert(id.clone(), stamp);
        }
        if stale {
          state.rebuilt.insert(id.clone());
        }
        debug!(alias = %id, stale, "alias resolved");
        report.record(id, NodeOutcome::Alias { stale });
        return None;
      }
      NodeKind::File { path } => path,
    };

    let Some(producer) = &node.producer else {
      match modified(path) {
        Some(stamp) => {
          state.stamps.insert(id.clone(), stamp);
          report.record(id, NodeOutcome::UpToDate);
        }
        None => {
          error!(node = %id, "source file missing");
          state.failed.insert(id.clone());
          report.record(id, NodeOutcome::Failed(ProduceError::MissingSource(path.clone())));
        }
      }
      return None;
    };

    if let Some(reason) = self.stale_reason(path, producer.as_ref(), &deps, state) {
      debug!(node = %id, reason, producer = %producer.describe(), "node is stale");
      let dependencies = deps.iter().filter_map(|d| self.path(d).map(Path::to_path_buf)).collect();

      return Some(ProduceJob {
        producer: producer.clone(),
        ctx: ProduceContext {
          id,
          output: path.clone(),
          dependencies,
        },
      });
    }

    debug!(node = %id, "up to date");
    if let Some(stamp) = modified(path) {
      state.stamps.insert(id.clone(), stamp);
    }
    report.record(id, NodeOutcome::UpToDate);
    None
  }

  fn stale_reason(
    &self,
    output: &Path,
    producer: &dyn Producer,
    deps: &[NodeId],
    state: &EvalState,
  ) -> Option<&'static str> {
    let Some(own) = modified(output) else {
      return Some("output missing");
    };
    if producer.outputs().iter().any(|p| !p.exists()) {
      return Some("extra output missing");
    }
    if !producer.is_current(output) {
      return Some("output no longer matches its inputs");
    }
    if deps.iter().any(|d| state.rebuilt.contains(d)) {
      return Some("dependency rebuilt");
    }
    if state.newest_dependency(deps).is_some_and(|newest| newest > own) {
      return Some("dependency newer than output");
    }
    None
  }
}

fn modified(path: &Path) -> Option<SystemTime> {
  fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Run a wave of jobs in parallel and return results sorted by node id.
///
/// Every job yields a result: a panicking producer or a task that dies
/// before reporting back is recorded as [`ProduceError::Aborted`].
async fn run_wave(jobs: Vec<ProduceJob>, semaphore: Arc<Semaphore>) -> Vec<(NodeId, Result<(), ProduceError>)> {
  let mut join_set = JoinSet::new();
  let mut tasks: HashMap<task::Id, NodeId> = HashMap::new();

  for job in jobs {
    let id = job.ctx.id.clone();
    let semaphore = semaphore.clone();

    info!(node = %id, producer = %job.producer.describe(), "building");

    let handle = join_set.spawn(async move {
      let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| ProduceError::Aborted(e.to_string()))?;
      match task::spawn_blocking(move || job.run()).await {
        Ok(result) => result,
        Err(e) => Err(ProduceError::Aborted(e.to_string())),
      }
    });
    tasks.insert(handle.id(), id);
  }

  let mut results = Vec::with_capacity(tasks.len());
  while let Some(joined) = join_set.join_next_with_id().await {
    let (task_id, result) = match joined {
      Ok((task_id, result)) => (task_id, result),
      Err(e) => {
        error!(error = %e, "producer task failed");
        (e.id(), Err(ProduceError::Aborted(e.to_string())))
      }
    };
    if let Some(id) = tasks.remove(&task_id) {
      results.push((id, result));
    }
  }

  results.sort_by(|a, b| a.0.cmp(&b.0));
  results
}
