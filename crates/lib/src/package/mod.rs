//! Package assembly.
//!
//! Declares the packaging subgraph: one staging copy per shipped file, the
//! installed-size node, the control descriptor with its mirrors, the
//! auxiliary documentation copies and finally the archive node, grouped
//! under a `package` alias.
//!
//! ```text
//! source ─► staged copy ─┬─► installed-size ─► control ─┐
//!                        │   package-meta ───────┘      │
//!                        └──────────────────────────────┼─► archive ─► package
//! copyright / changelog ─► doc copies ──────────────────┘
//! ```

pub mod archive;
pub mod manifest;
pub mod size;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::graph::{BuildGraph, CopyProducer, NodeId, StampProducer};
use crate::process::ExternalProcess;

pub use archive::{ArchiveProducer, DEFAULT_ARCHIVER, artifact, artifact_name};
pub use manifest::{ControlDescriptor, ManifestProducer, write_manifest};
pub use size::{SizeProducer, aggregate_size, read_size_stamp};
pub use types::{FileEntry, FileList, PackageArtifact, PackageError, PackageMeta};

/// Alias grouping the archive node.
pub const PACKAGE_ALIAS: &str = "package";

/// Name of the installed-size stamp inside the build directory.
pub const SIZE_STAMP: &str = "installed-size";

/// Name of the package metadata stamp inside the build directory.
pub const META_STAMP: &str = "package-meta";

/// Everything needed to declare the packaging subgraph. Paths are absolute
/// or relative to the working directory; nothing here is resolved further.
#[derive(Debug, Clone)]
pub struct PackageSpec {
  pub meta: PackageMeta,
  pub files: FileList,
  /// Parent of the staging root; the root itself is `<staging_dir>/<name>`.
  pub staging_dir: PathBuf,
  /// Where the artifact is written.
  pub out_dir: PathBuf,
  /// Where the installed-size stamp lives.
  pub build_dir: PathBuf,
  pub copyright: Option<PathBuf>,
  pub changelog: Option<PathBuf>,
  /// Extra copies of the control descriptor.
  pub control_mirrors: Vec<PathBuf>,
  /// Packaging command; staging root and artifact path are appended.
  pub archiver: Vec<String>,
}

impl PackageSpec {
  pub fn staging_root(&self) -> PathBuf {
    self.staging_dir.join(&self.meta.name)
  }

  /// Canonical control descriptor location inside the staging root.
  pub fn control_path(&self) -> PathBuf {
    self.staging_root().join("DEBIAN").join("control")
  }

  pub fn doc_dir(&self) -> PathBuf {
    self.staging_root().join("usr/share/doc").join(&self.meta.name)
  }
}

/// Node ids of the declared packaging subgraph.
#[derive(Debug, Clone)]
pub struct PackagePlan {
  pub artifact: PackageArtifact,
  pub staged: Vec<NodeId>,
  pub size: NodeId,
  pub meta: NodeId,
  pub manifest: NodeId,
  pub auxiliary: Vec<NodeId>,
  pub archive: NodeId,
  pub alias: NodeId,
}

/// Declare the packaging subgraph for `spec` in `graph`.
///
/// # Errors
///
/// [`PackageError::InvalidMeta`] if the metadata is unusable, or
/// [`PackageError::Graph`] if a declaration conflicts with existing nodes.
pub fn declare_package(
  graph: &mut BuildGraph,
  spec: &PackageSpec,
  process: Arc<dyn ExternalProcess>,
) -> Result<PackagePlan, PackageError> {
  spec.meta.validate()?;

  let staging_root = spec.staging_root();
  let artifact = artifact(&spec.meta, &spec.out_dir);

  let mut staged = Vec::with_capacity(spec.files.len());
  for entry in &spec.files {
    let source = NodeId::from(entry.source.as_path());
    let id = graph.add_node(
      entry.staged_path(&staging_root),
      &[source],
      Some(Arc::new(CopyProducer::new(&entry.source))),
    )?;
    staged.push(id);
  }

  let size = graph.add_node(
    spec.build_dir.join(SIZE_STAMP),
    &staged,
    Some(Arc::new(SizeProducer::new(spec.files.entries().to_vec()))),
  )?;

  let meta = graph.add_node(
    spec.build_dir.join(META_STAMP),
    &[],
    Some(Arc::new(StampProducer::new(spec.meta.signature()))),
  )?;

  let manifest = graph.add_node(
    spec.control_path(),
    &[size.clone(), meta.clone()],
    Some(Arc::new(ManifestProducer::new(
      spec.meta.clone(),
      spec.build_dir.join(SIZE_STAMP),
      spec.control_mirrors.clone(),
    ))),
  )?;

  let mut auxiliary = Vec::new();
  for (name, source) in [("copyright", &spec.copyright), ("changelog", &spec.changelog)] {
    let Some(source) = source else { continue };

    let id = graph.add_node(
      spec.doc_dir().join(name),
      &[NodeId::from(source.as_path())],
      Some(Arc::new(CopyProducer::new(source))),
    )?;
    auxiliary.push(id);
  }

  let mut archive_deps = vec![manifest.clone()];
  archive_deps.extend(staged.iter().cloned());
  archive_deps.extend(auxiliary.iter().cloned());

  let archive = graph.add_node(
    &artifact.path,
    &archive_deps,
    Some(Arc::new(ArchiveProducer::new(
      process,
      spec.archiver.clone(),
      &staging_root,
    ))),
  )?;

  let alias = graph.add_alias(PACKAGE_ALIAS, std::slice::from_ref(&archive))?;

  info!(
    package = %spec.meta.name,
    files = staged.len(),
    artifact = %artifact.file_name,
    "declared package"
  );

  Ok(PackagePlan {
    artifact,
    staged,
    size,
    meta,
    manifest,
    auxiliary,
    archive,
    alias,
  })
}
