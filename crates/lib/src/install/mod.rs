//! Install planning.
//!
//! Maps built artifacts to their install directories as copy nodes and
//! groups them under the `install` alias. Pure path joining: destination
//! directories are normalized to end with a separator and the artifact's
//! file name is appended.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::{BuildGraph, CopyProducer, GraphError, NodeId};

/// Alias grouping every install copy.
pub const INSTALL_ALIAS: &str = "install";

#[derive(Debug, Error)]
pub enum InstallError {
  #[error("install artifact has no file name: {}", .0.display())]
  NoFileName(PathBuf),

  #[error("no install directory configured for {0} artifacts")]
  NoDestination(ArtifactKind),

  #[error(transparent)]
  Graph(#[from] GraphError),
}

/// What an installed file is, which decides where it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
  Binary,
  ManPage,
  AuxBinary,
}

impl std::fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      ArtifactKind::Binary => "binary",
      ArtifactKind::ManPage => "man page",
      ArtifactKind::AuxBinary => "auxiliary binary",
    })
  }
}

/// A built file to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallArtifact {
  pub kind: ArtifactKind,
  pub source: PathBuf,
}

impl InstallArtifact {
  pub fn new(kind: ArtifactKind, source: impl Into<PathBuf>) -> Self {
    Self {
      kind,
      source: source.into(),
    }
  }
}

/// Install directories, each ending with a separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallDestinations {
  pub bin_dir: String,
  pub man_dir: String,
  pub aux_bin_dir: Option<String>,
}

impl InstallDestinations {
  /// `prefix/bin/` and `prefix/share/man/man1/`.
  pub fn from_prefix(prefix: &str) -> Self {
    let prefix = normalize_dir(prefix);
    Self {
      bin_dir: format!("{}bin/", prefix),
      man_dir: format!("{}share/man/man1/", prefix),
      aux_bin_dir: None,
    }
  }

  pub fn with_aux_bin_dir(mut self, dir: &str) -> Self {
    self.aux_bin_dir = Some(normalize_dir(dir));
    self
  }

  pub fn dir_for(&self, kind: ArtifactKind) -> Option<&str> {
    match kind {
      ArtifactKind::Binary => Some(&self.bin_dir),
      ArtifactKind::ManPage => Some(&self.man_dir),
      ArtifactKind::AuxBinary => self.aux_bin_dir.as_deref(),
    }
  }
}

/// Ensure `dir` ends with `/`. An empty directory means the current one.
pub fn normalize_dir(dir: &str) -> String {
  if dir.is_empty() {
    "./".to_string()
  } else if dir.ends_with('/') {
    dir.to_string()
  } else {
    format!("{}/", dir)
  }
}

/// Where `artifact` lands under `destinations`.
///
/// # Errors
///
/// [`InstallError::NoFileName`] for a source without a file name, and
/// [`InstallError::NoDestination`] if its kind has no directory.
pub fn install_path(artifact: &InstallArtifact, destinations: &InstallDestinations) -> Result<PathBuf, InstallError> {
  let dir = destinations
    .dir_for(artifact.kind)
    .ok_or(InstallError::NoDestination(artifact.kind))?;
  let file_name = artifact
    .source
    .file_name()
    .ok_or_else(|| InstallError::NoFileName(artifact.source.clone()))?;

  Ok(Path::new(dir).join(file_name))
}

/// Declare one copy node per artifact plus the `install` alias.
///
/// # Errors
///
/// As for [`install_path`], or [`InstallError::Graph`] if a declaration
/// conflicts with existing nodes.
pub fn plan_install(
  graph: &mut BuildGraph,
  artifacts: &[InstallArtifact],
  destinations: &InstallDestinations,
) -> Result<NodeId, InstallError> {
  let mut copies = Vec::with_capacity(artifacts.len());

  for artifact in artifacts {
    let target = install_path(artifact, destinations)?;
    debug!(
      kind = %artifact.kind,
      from = %artifact.source.display(),
      to = %target.display(),
      "planned install copy"
    );
    let id = graph.add_node(
      target,
      &[NodeId::from(artifact.source.as_path())],
      Some(Arc::new(CopyProducer::new(&artifact.source))),
    )?;
    copies.push(id);
  }

  let alias = graph.add_alias(INSTALL_ALIAS, &copies)?;
  info!(files = copies.len(), bin_dir = %destinations.bin_dir, "planned install");
  Ok(alias)
}
