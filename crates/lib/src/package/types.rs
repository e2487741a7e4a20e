//! Types for package assembly.

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::graph::{GraphError, ProduceError};

/// Errors raised while declaring or assembling a package.
#[derive(Debug, Error)]
pub enum PackageError {
  #[error("invalid file entry {}: {reason}", dest.display())]
  InvalidEntry { dest: PathBuf, reason: &'static str },

  #[error("duplicate destination in file list: {}", .0.display())]
  DuplicateDestination(PathBuf),

  #[error("invalid package {field}: {reason}")]
  InvalidMeta { field: &'static str, reason: String },

  #[error("io error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("malformed size stamp {}: {content:?}", path.display())]
  InvalidSizeStamp { path: PathBuf, content: String },

  #[error("manifest has no destinations")]
  NoDestinations,

  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl PackageError {
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    PackageError::Io {
      path: path.into(),
      source,
    }
  }
}

impl From<PackageError> for ProduceError {
  fn from(err: PackageError) -> Self {
    match err {
      PackageError::Io { path, source } => ProduceError::Io { path, source },
      other => ProduceError::Invalid(other.to_string()),
    }
  }
}

/// One file shipped in the package: where it lands and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
  /// Path inside the staging root, e.g. `usr/bin/prog`.
  pub dest: PathBuf,
  pub source: PathBuf,
}

impl FileEntry {
  /// # Errors
  ///
  /// [`PackageError::InvalidEntry`] if `dest` is empty, absolute or contains
  /// `..`, or if `source` is empty.
  pub fn new(dest: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Result<Self, PackageError> {
    let dest = dest.into();
    let source = source.into();

    if dest.as_os_str().is_empty() {
      return Err(PackageError::InvalidEntry {
        dest,
        reason: "destination is empty",
      });
    }
    if dest.is_absolute() || dest.has_root() {
      return Err(PackageError::InvalidEntry {
        dest,
        reason: "destination must be relative",
      });
    }
    if dest.components().any(|c| matches!(c, Component::ParentDir | Component::Prefix(_))) {
      return Err(PackageError::InvalidEntry {
        dest,
        reason: "destination escapes the staging root",
      });
    }
    if source.as_os_str().is_empty() {
      return Err(PackageError::InvalidEntry {
        dest,
        reason: "source is empty",
      });
    }

    Ok(Self { dest, source })
  }

  /// Where this entry is staged under `staging_root`.
  pub fn staged_path(&self, staging_root: &Path) -> PathBuf {
    staging_root.join(&self.dest)
  }
}

/// The validated set of files shipped in a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileList {
  entries: Vec<FileEntry>,
}

impl FileList {
  /// # Errors
  ///
  /// [`PackageError::DuplicateDestination`] if two entries share a
  /// destination.
  pub fn new(entries: Vec<FileEntry>) -> Result<Self, PackageError> {
    let mut seen = HashSet::new();
    for entry in &entries {
      if !seen.insert(entry.dest.as_path()) {
        return Err(PackageError::DuplicateDestination(entry.dest.clone()));
      }
    }
    Ok(Self { entries })
  }

  pub fn entries(&self) -> &[FileEntry] {
    &self.entries
  }

  pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<'a> IntoIterator for &'a FileList {
  type Item = &'a FileEntry;
  type IntoIter = std::slice::Iter<'a, FileEntry>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}

/// Package metadata as it appears in the control descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageMeta {
  pub name: String,
  pub version: String,
  pub subversion: String,
  pub maintainer: String,
  pub architecture: String,
  /// Dependency spec, e.g. `libev4, libjson0`. May be empty.
  pub depends: String,
  pub description: String,
  pub priority: String,
  pub section: String,
  /// Artifact file extension, without the dot.
  pub extension: String,
}

impl PackageMeta {
  /// Check the fields that end up in the artifact name and the control text.
  ///
  /// # Errors
  ///
  /// [`PackageError::InvalidMeta`] naming the first offending field.
  pub fn validate(&self) -> Result<(), PackageError> {
    for (field, value) in [
      ("name", &self.name),
      ("version", &self.version),
      ("subversion", &self.subversion),
      ("architecture", &self.architecture),
      ("extension", &self.extension),
    ] {
      if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
      }
      // These fields are joined with `_` and `-` in the artifact name
      if value.contains('_') || value.contains(char::is_whitespace) || value.contains('/') {
        return Err(invalid(field, "must not contain '_', '/' or whitespace"));
      }
    }

    for (field, value) in [
      ("maintainer", &self.maintainer),
      ("depends", &self.depends),
      ("description", &self.description),
      ("priority", &self.priority),
      ("section", &self.section),
    ] {
      if value.contains('\n') {
        return Err(invalid(field, "must be a single line"));
      }
    }

    for (field, value) in [
      ("maintainer", &self.maintainer),
      ("description", &self.description),
      ("priority", &self.priority),
      ("section", &self.section),
    ] {
      if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
      }
    }

    Ok(())
  }

  /// Every field, one `key=value` line each, for change detection.
  pub fn signature(&self) -> String {
    [
      ("name", &self.name),
      ("version", &self.version),
      ("subversion", &self.subversion),
      ("maintainer", &self.maintainer),
      ("architecture", &self.architecture),
      ("depends", &self.depends),
      ("description", &self.description),
      ("priority", &self.priority),
      ("section", &self.section),
      ("extension", &self.extension),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}\n", key, value))
    .collect()
  }
}

fn invalid(field: &'static str, reason: &str) -> PackageError {
  PackageError::InvalidMeta {
    field,
    reason: reason.to_string(),
  }
}

/// The package file produced by the archive node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageArtifact {
  /// `{name}_{version}-{subversion}-{architecture}.{extension}`
  pub file_name: String,
  pub path: PathBuf,
}
