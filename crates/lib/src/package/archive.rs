//! Archive assembly through the external packaging tool.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::graph::producer::{ensure_parent, run_checked};
use crate::graph::{ProduceContext, ProduceError, Producer};
use crate::process::{ExternalProcess, Invocation};

use super::types::{PackageArtifact, PackageMeta};

/// Default packaging command; the staging root and artifact path are
/// appended.
pub const DEFAULT_ARCHIVER: [&str; 3] = ["fakeroot", "dpkg-deb", "-b"];

/// `{name}_{version}-{subversion}-{architecture}.{extension}`
pub fn artifact_name(meta: &PackageMeta) -> String {
  format!(
    "{}_{}-{}-{}.{}",
    meta.name, meta.version, meta.subversion, meta.architecture, meta.extension
  )
}

/// The artifact for `meta` placed in `out_dir`.
pub fn artifact(meta: &PackageMeta, out_dir: &Path) -> PackageArtifact {
  let file_name = artifact_name(meta);
  PackageArtifact {
    path: out_dir.join(&file_name),
    file_name,
  }
}

/// Runs the packaging tool over the staging root to produce the artifact.
#[derive(Clone)]
pub struct ArchiveProducer {
  process: Arc<dyn ExternalProcess>,
  archiver: Vec<String>,
  staging_root: PathBuf,
}

impl ArchiveProducer {
  pub fn new(process: Arc<dyn ExternalProcess>, archiver: Vec<String>, staging_root: impl Into<PathBuf>) -> Self {
    Self {
      process,
      archiver,
      staging_root: staging_root.into(),
    }
  }

  fn invocation(&self, output: &Path) -> Option<Invocation> {
    let (program, args) = self.archiver.split_first()?;
    Some(
      Invocation::new(program)
        .args(args.iter().cloned())
        .path_arg(&self.staging_root)
        .path_arg(output),
    )
  }
}

impl fmt::Debug for ArchiveProducer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ArchiveProducer")
      .field("archiver", &self.archiver)
      .field("staging_root", &self.staging_root)
      .finish_non_exhaustive()
  }
}

impl Producer for ArchiveProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    let invocation = self
      .invocation(&ctx.output)
      .ok_or_else(|| ProduceError::Invalid("archiver command is empty".to_string()))?;

    ensure_parent(&ctx.output)?;
    info!(artifact = %ctx.output.display(), cmd = %invocation, "assembling package");
    run_checked(self.process.as_ref(), &invocation)
  }

  fn describe(&self) -> String {
    if self.archiver.is_empty() {
      "archive (no archiver configured)".to_string()
    } else {
      format!("{} {}", self.archiver.join(" "), self.staging_root.display())
    }
  }
}
