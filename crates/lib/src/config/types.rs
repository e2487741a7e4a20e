//! Project file schema (`bake.toml`).
//!
//! Every section except `[project]` is optional. Paths are relative to the
//! directory containing the project file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::platform::{Os, Platform};

/// Root of the project file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
  pub project: ProjectSection,

  #[serde(default)]
  pub compile: CompileSection,

  #[serde(default)]
  pub probe: ProbeSection,

  #[serde(default)]
  pub install: InstallSection,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub package: Option<PackageSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
  pub name: String,

  /// Build output directory (default: "build")
  #[serde(default = "default_build_dir")]
  pub build_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompileSection {
  #[serde(default = "default_compiler")]
  pub compiler: String,

  #[serde(default)]
  pub cflags: Vec<String>,

  /// Include directories, passed as `-I<dir>`.
  #[serde(default)]
  pub includes: Vec<PathBuf>,

  #[serde(default)]
  pub sources: Vec<PathBuf>,

  /// Compiled program (default: `<build_dir>/<project name>`)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<PathBuf>,
}

impl Default for CompileSection {
  fn default() -> Self {
    Self {
      compiler: default_compiler(),
      cflags: Vec::new(),
      includes: Vec::new(),
      sources: Vec::new(),
      output: None,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
  /// Compiler to probe (default: `compile.compiler`)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub compiler: Option<String>,

  #[serde(default)]
  pub libraries: Vec<String>,

  /// Libraries located with `pkg-config --exists`.
  #[serde(default)]
  pub pkg_config: Vec<String>,

  #[serde(default)]
  pub headers: Vec<String>,

  #[serde(default)]
  pub functions: Vec<String>,

  #[serde(default)]
  pub conditional: Vec<ConditionalProbe>,
}

/// Capabilities only required on some platforms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConditionalProbe {
  pub when: PlatformPredicate,

  #[serde(default)]
  pub libraries: Vec<String>,

  #[serde(default)]
  pub headers: Vec<String>,

  #[serde(default)]
  pub functions: Vec<String>,
}

/// Platform condition for a [`ConditionalProbe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformPredicate {
  Apple,
  NotApple,
  Linux,
  Windows,
}

impl PlatformPredicate {
  /// Evaluate against the host. An unknown host only satisfies `not-apple`.
  pub fn matches(&self, platform: Option<&Platform>) -> bool {
    let os = platform.map(|p| p.os);
    match self {
      PlatformPredicate::Apple => os.is_some_and(|os| os.is_apple()),
      PlatformPredicate::NotApple => !os.is_some_and(|os| os.is_apple()),
      PlatformPredicate::Linux => os == Some(Os::Linux),
      PlatformPredicate::Windows => os == Some(Os::Windows),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
  #[serde(default = "default_prefix")]
  pub prefix: String,

  /// Documentation root; man pages are relative to it (default: "doc")
  #[serde(default = "default_doc_dir")]
  pub doc_dir: String,

  /// Programs for `<prefix>/bin/` (default: the compiled program)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub binaries: Option<Vec<PathBuf>>,

  #[serde(default)]
  pub man_pages: Vec<PathBuf>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub aux_bin_dir: Option<String>,

  #[serde(default)]
  pub aux_binaries: Vec<PathBuf>,
}

impl Default for InstallSection {
  fn default() -> Self {
    Self {
      prefix: default_prefix(),
      doc_dir: default_doc_dir(),
      binaries: None,
      man_pages: Vec::new(),
      aux_bin_dir: None,
      aux_binaries: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
  /// Package name (default: project name)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  pub version: String,

  #[serde(default = "default_subversion")]
  pub subversion: String,

  pub maintainer: String,

  /// Package architecture (default: the host's, e.g. "amd64")
  #[serde(skip_serializing_if = "Option::is_none")]
  pub architecture: Option<String>,

  /// Comma-separated runtime dependencies. Empty means no `Depends` line
  /// in the control file, since dpkg rejects empty field values.
  #[serde(default)]
  pub depends: String,

  pub description: String,

  #[serde(default = "default_priority")]
  pub priority: String,

  #[serde(default = "default_section")]
  pub section: String,

  #[serde(default = "default_staging_dir")]
  pub staging_dir: PathBuf,

  /// Artifact directory (default: project root)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub out_dir: Option<PathBuf>,

  #[serde(default = "default_extension")]
  pub extension: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub copyright: Option<PathBuf>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub changelog: Option<PathBuf>,

  /// Extra control descriptor copies (default: `<staging_dir>/control`)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub control_mirrors: Option<Vec<PathBuf>>,

  /// Packaging command (default: `fakeroot dpkg-deb -b`)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub archiver: Option<Vec<String>>,

  #[serde(default)]
  pub files: Vec<FileSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileSection {
  /// Path inside the package, e.g. `usr/bin/prog`.
  pub dest: PathBuf,
  pub source: PathBuf,
}

fn default_build_dir() -> PathBuf {
  PathBuf::from("build")
}

fn default_compiler() -> String {
  "cc".to_string()
}

fn default_prefix() -> String {
  "/usr/local".to_string()
}

fn default_doc_dir() -> String {
  "doc".to_string()
}

fn default_subversion() -> String {
  "1".to_string()
}

fn default_priority() -> String {
  "extra".to_string()
}

fn default_section() -> String {
  "utils".to_string()
}

fn default_staging_dir() -> PathBuf {
  PathBuf::from("debian")
}

fn default_extension() -> String {
  "deb".to_string()
}
