//! End-to-end orchestration.
//!
//! The probe gates everything: if it fails, no graph node is declared or
//! run. Otherwise the graph is populated from the project (compile node,
//! install copies, packaging subgraph, aliases) and the requested target is
//! evaluated.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, Project};
use crate::graph::{
  BuildGraph, CommandProducer, EvalOptions, EvalReport, GraphError, NodeId, NodeInfo, ReportSummary,
  StampProducer,
};
use crate::install::{INSTALL_ALIAS, InstallError, plan_install};
use crate::package::{PACKAGE_ALIAS, PackageArtifact, PackageError, PackagePlan, declare_package};
use crate::probe::{CapabilityChecker, HostChecker, ProbeFailure, ProbeReport, ProbeRequest, probe};
use crate::process::{ExternalProcess, Invocation, SystemProcess};

/// Alias for the compiled program.
pub const BUILD_TARGET: &str = "build";
pub const INSTALL_TARGET: &str = INSTALL_ALIAS;
pub const PACKAGE_TARGET: &str = PACKAGE_ALIAS;

/// Stamp holding the compile command line, under the build directory.
pub const COMPILE_STAMP: &str = "compile-command";

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("toolchain probe failed: {0}")]
  Probe(#[from] ProbeFailure),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Install(#[from] InstallError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error("project has no [package] section")]
  NoPackage,
}

/// The populated graph and the ids of its entry points.
pub struct Populated {
  pub graph: BuildGraph,
  pub build: NodeId,
  pub install: NodeId,
  pub package: Option<PackagePlan>,
}

/// Result of a full run.
#[derive(Debug)]
pub struct RunOutcome {
  /// `None` when the probe was skipped.
  pub probe: Option<ProbeReport>,
  pub report: EvalReport,
  pub artifact: Option<PackageArtifact>,
}

impl RunOutcome {
  pub fn summary(&self) -> RunSummary {
    RunSummary {
      probe: self.probe.clone(),
      evaluation: self.report.summary(),
      artifact: self.artifact.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub probe: Option<ProbeReport>,
  pub evaluation: ReportSummary,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub artifact: Option<PackageArtifact>,
}

/// A project bound to the process runner its producers use.
pub struct Pipeline {
  project: Project,
  process: Arc<dyn ExternalProcess>,
}

impl Pipeline {
  pub fn new(project: Project, process: Arc<dyn ExternalProcess>) -> Self {
    Self { project, process }
  }

  /// Pipeline running real subprocesses.
  pub fn system(project: Project) -> Self {
    Self::new(project, Arc::new(SystemProcess))
  }

  pub fn project(&self) -> &Project {
    &self.project
  }

  pub fn probe_request(&self) -> ProbeRequest {
    self.project.probe_request()
  }

  /// Probe with a caller-supplied checker.
  pub fn probe(&self, checker: &dyn CapabilityChecker) -> Result<ProbeReport, ProbeFailure> {
    probe(&self.probe_request(), checker)
  }

  /// Probe the host toolchain through this pipeline's process runner.
  pub fn probe_host(&self) -> Result<ProbeReport, ProbeFailure> {
    let checker = HostChecker::new(self.process.as_ref());
    self.probe(&checker)
  }

  /// Declare every node the project describes.
  ///
  /// # Errors
  ///
  /// Configuration, install or package declaration errors.
  pub fn populate(&self) -> Result<Populated, PipelineError> {
    let mut graph = BuildGraph::new();

    let build = self.declare_compile(&mut graph)?;
    let install = plan_install(
      &mut graph,
      &self.project.install_artifacts(),
      &self.project.install_destinations(),
    )?;

    let package = match self.project.package_spec()? {
      Some(spec) => Some(declare_package(&mut graph, &spec, self.process.clone())?),
      None => None,
    };

    info!(nodes = graph.len(), project = %self.project.name(), "populated build graph");
    Ok(Populated {
      graph,
      build,
      install,
      package,
    })
  }

  /// Probe (unless `checker` is `None`), populate and evaluate `target`.
  ///
  /// Node failures are reported in [`RunOutcome::report`], not as `Err`.
  ///
  /// # Errors
  ///
  /// [`PipelineError::Probe`] if a capability is missing, in which case the
  /// graph is never built; otherwise declaration errors or an unknown
  /// target.
  pub fn run(
    &self,
    target: &str,
    checker: Option<&dyn CapabilityChecker>,
    options: &EvalOptions,
  ) -> Result<RunOutcome, PipelineError> {
    let probe = match checker {
      Some(checker) => Some(self.probe(checker)?),
      None => {
        info!("toolchain probe skipped");
        None
      }
    };

    let populated = self.populate()?;
    if target == PACKAGE_TARGET && populated.package.is_none() {
      return Err(PipelineError::NoPackage);
    }

    let report = populated.graph.evaluate_blocking(&NodeId::from(target), options)?;

    Ok(RunOutcome {
      probe,
      report,
      artifact: populated.package.map(|p| p.artifact),
    })
  }

  /// Evaluation waves for `target` without running anything.
  pub fn plan(&self, target: &str) -> Result<Vec<Vec<NodeInfo>>, PipelineError> {
    let populated = self.populate()?;
    let waves = populated.graph.waves(&NodeId::from(target))?;

    Ok(
      waves
        .into_iter()
        .map(|wave| wave.iter().filter_map(|id| populated.graph.info(id)).collect())
        .collect(),
    )
  }

  /// The compile node, if the project lists sources, and the `build` alias.
  ///
  /// The compile node also depends on a stamp of its own command line, so
  /// edits to flags, include directories or libraries recompile.
  fn declare_compile(&self, graph: &mut BuildGraph) -> Result<NodeId, PipelineError> {
    let sources = self.project.compile_sources();
    if sources.is_empty() {
      return Ok(graph.add_alias(BUILD_TARGET, &[])?);
    }

    let compile = &self.project.config.compile;
    let output = self.project.compile_output();
    let libraries = self.probe_request().libraries;

    let invocation = Invocation::new(&compile.compiler)
      .args(compile.cflags.iter().cloned())
      .args(
        compile
          .includes
          .iter()
          .map(|dir| format!("-I{}", self.project.resolve(dir).display())),
      )
      .arg("-o")
      .path_arg(&output)
      .args(sources.iter().map(|s| s.to_string_lossy().into_owned()))
      .args(libraries.iter().map(|lib| format!("-l{}", lib)))
      .current_dir(&self.project.root);

    let stamp = graph.add_node(
      self.project.build_dir().join(COMPILE_STAMP),
      &[],
      Some(Arc::new(StampProducer::new(format!("{}\n", invocation)))),
    )?;

    let mut deps: Vec<NodeId> = sources.iter().map(|s| NodeId::from(s.as_path())).collect();
    deps.push(stamp);
    let program = graph.add_node(
      output,
      &deps,
      Some(Arc::new(CommandProducer::new(self.process.clone(), invocation))),
    )?;

    Ok(graph.add_alias(BUILD_TARGET, &[program])?)
  }
}
