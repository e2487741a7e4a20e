//! Control descriptor rendering and writing.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::graph::{ProduceContext, ProduceError, Producer};

use super::size::read_size_stamp;
use super::types::{PackageError, PackageMeta};

/// The package control descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDescriptor {
  pub package: String,
  pub priority: String,
  pub section: String,
  /// Sum of shipped file sizes, in bytes.
  pub installed_size: u64,
  pub maintainer: String,
  pub architecture: String,
  pub version: String,
  pub depends: String,
  pub description: String,
}

impl ControlDescriptor {
  pub fn from_meta(meta: &PackageMeta, installed_size: u64) -> Self {
    Self {
      package: meta.name.clone(),
      priority: meta.priority.clone(),
      section: meta.section.clone(),
      installed_size,
      maintainer: meta.maintainer.clone(),
      architecture: meta.architecture.clone(),
      version: meta.version.clone(),
      depends: meta.depends.clone(),
      description: meta.description.clone(),
    }
  }

  /// Render as `Field: value` lines in fixed order, ending with a blank
  /// line.
  ///
  /// `dpkg-deb -b` rejects a control file containing a field with an empty
  /// value, so an empty `Depends` is left out instead of rendered as
  /// `Depends: `. Every other field is validated non-empty beforehand.
  pub fn render(&self) -> String {
    let mut text = String::new();
    let installed_size = self.installed_size.to_string();

    let fields = [
      ("Package", self.package.as_str()),
      ("Priority", self.priority.as_str()),
      ("Section", self.section.as_str()),
      ("Installed-Size", installed_size.as_str()),
      ("Maintainer", self.maintainer.as_str()),
      ("Architecture", self.architecture.as_str()),
      ("Version", self.version.as_str()),
      ("Depends", self.depends.as_str()),
      ("Description", self.description.as_str()),
    ];

    for (field, value) in fields {
      if field == "Depends" && value.is_empty() {
        continue;
      }
      // Writing to a String cannot fail
      let _ = writeln!(text, "{}: {}", field, value);
    }
    text.push('\n');
    text
  }
}

/// Write `text` to every destination, each atomically.
///
/// Every destination receives identical bytes. Parent directories are
/// created as needed.
///
/// # Errors
///
/// [`PackageError::NoDestinations`] for an empty list, otherwise
/// [`PackageError::Io`] for the first destination that cannot be written.
pub fn write_manifest(text: &str, destinations: &[PathBuf]) -> Result<(), PackageError> {
  if destinations.is_empty() {
    return Err(PackageError::NoDestinations);
  }

  for dest in destinations {
    write_atomic(dest, text.as_bytes())?;
    debug!(path = %dest.display(), bytes = text.len(), "wrote manifest");
  }
  Ok(())
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), PackageError> {
  if let Some(dir) = path.parent()
    && !dir.as_os_str().is_empty()
  {
    fs::create_dir_all(dir).map_err(|e| PackageError::io(dir, e))?;
  }

  let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
  temp_name.push(".tmp");
  let temp_path = path.with_file_name(temp_name);

  fs::write(&temp_path, content).map_err(|e| PackageError::io(&temp_path, e))?;
  fs::rename(&temp_path, path).map_err(|e| PackageError::io(path, e))?;
  Ok(())
}

/// Renders the control descriptor from the size stamp and writes it to the
/// node's output plus every mirror.
#[derive(Debug, Clone)]
pub struct ManifestProducer {
  meta: PackageMeta,
  size_stamp: PathBuf,
  mirrors: Vec<PathBuf>,
}

impl ManifestProducer {
  pub fn new(meta: PackageMeta, size_stamp: impl Into<PathBuf>, mirrors: Vec<PathBuf>) -> Self {
    Self {
      meta,
      size_stamp: size_stamp.into(),
      mirrors,
    }
  }
}

impl Producer for ManifestProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    let installed_size = read_size_stamp(&self.size_stamp)?;
    let text = ControlDescriptor::from_meta(&self.meta, installed_size).render();

    let mut destinations = Vec::with_capacity(self.mirrors.len() + 1);
    destinations.push(ctx.output.clone());
    destinations.extend(self.mirrors.iter().cloned());

    write_manifest(&text, &destinations)?;
    info!(
      package = %self.meta.name,
      installed_size,
      destinations = destinations.len(),
      "control descriptor written"
    );
    Ok(())
  }

  fn describe(&self) -> String {
    format!("render control for {}", self.meta.name)
  }

  fn outputs(&self) -> Vec<PathBuf> {
    self.mirrors.clone()
  }
}
