//! Installed-size aggregation.
//!
//! The size node sums the byte sizes of every shipped file and records the
//! total in a stamp file. The manifest node reads the stamp, so the control
//! text always reflects the files as last staged.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::graph::{ProduceContext, ProduceError, Producer};

use super::types::{FileEntry, PackageError};

/// Sum of the byte sizes of each entry's source file.
///
/// # Errors
///
/// [`PackageError::Io`] naming the first source that cannot be read.
pub fn aggregate_size(entries: &[FileEntry]) -> Result<u64, PackageError> {
  entries.iter().try_fold(0u64, |total, entry| {
    let meta = fs::metadata(&entry.source).map_err(|e| PackageError::io(&entry.source, e))?;
    Ok(total + meta.len())
  })
}

/// Parse a stamp written by [`SizeProducer`].
pub fn read_size_stamp(path: &Path) -> Result<u64, PackageError> {
  let content = fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
  content.trim().parse().map_err(|_| PackageError::InvalidSizeStamp {
    path: path.to_path_buf(),
    content,
  })
}

/// Writes the aggregated installed size, in bytes, to the node's output.
#[derive(Debug, Clone)]
pub struct SizeProducer {
  entries: Vec<FileEntry>,
}

impl SizeProducer {
  pub fn new(entries: Vec<FileEntry>) -> Self {
    Self { entries }
  }
}

impl Producer for SizeProducer {
  fn produce(&self, ctx: &ProduceContext) -> Result<(), ProduceError> {
    let total = aggregate_size(&self.entries)?;
    debug!(files = self.entries.len(), bytes = total, "aggregated installed size");

    crate::graph::producer::ensure_parent(&ctx.output)?;
    fs::write(&ctx.output, format!("{}\n", total)).map_err(|e| ProduceError::io(&ctx.output, e))
  }

  fn describe(&self) -> String {
    format!("sum size of {} files", self.entries.len())
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use tempfile::TempDir;

  use super::*;
  use crate::graph::NodeId;

  fn sized(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![b'x'; len]).unwrap();
    path
  }

  #[test]
  fn sums_exact_source_sizes() {
    let temp = TempDir::new().unwrap();
    let entries = vec![
      FileEntry::new("usr/bin/prog", sized(temp.path(), "prog", 1024)).unwrap(),
      FileEntry::new("usr/share/man/man1/prog.1", sized(temp.path(), "prog.1", 200)).unwrap(),
    ];

    assert_eq!(aggregate_size(&entries).unwrap(), 1224);
  }

  #[test]
  fn empty_list_is_zero() {
    assert_eq!(aggregate_size(&[]).unwrap(), 0);
  }

  #[test]
  fn missing_source_names_path() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("gone");
    let entries = vec![FileEntry::new("usr/bin/gone", &missing).unwrap()];

    match aggregate_size(&entries).unwrap_err() {
      PackageError::Io { path, .. } => assert_eq!(path, missing),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn producer_writes_decimal_stamp() {
    let temp = TempDir::new().unwrap();
    let entries = vec![FileEntry::new("a", sized(temp.path(), "a", 7)).unwrap()];
    let stamp = temp.path().join("build/installed-size");

    SizeProducer::new(entries)
      .produce(&ProduceContext {
        id: NodeId::from(stamp.as_path()),
        output: stamp.clone(),
        dependencies: vec![],
      })
      .unwrap();

    assert_eq!(fs::read_to_string(&stamp).unwrap(), "7\n");
    assert_eq!(read_size_stamp(&stamp).unwrap(), 7);
  }

  #[test]
  fn malformed_stamp_is_rejected() {
    let temp = TempDir::new().unwrap();
    let stamp = temp.path().join("installed-size");
    fs::write(&stamp, "lots").unwrap();

    assert!(matches!(
      read_size_stamp(&stamp),
      Err(PackageError::InvalidSizeStamp { .. })
    ));
  }
}
