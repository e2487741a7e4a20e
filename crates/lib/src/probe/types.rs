//! Types for capability probing.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// What kind of toolchain capability is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
  /// The C compiler itself.
  Compiler,
  /// A library that must link with `-l<name>`.
  Library,
  /// A library located through `pkg-config`.
  PkgConfig,
  /// A system header.
  Header,
  /// A function that must resolve at link time.
  Function,
}

impl CapabilityKind {
  /// The category reported in diagnostics. pkg-config lookups are libraries.
  pub fn category(&self) -> &'static str {
    match self {
      CapabilityKind::Compiler => "compiler",
      CapabilityKind::Library | CapabilityKind::PkgConfig => "library",
      CapabilityKind::Header => "header",
      CapabilityKind::Function => "function",
    }
  }
}

impl fmt::Display for CapabilityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.category())
  }
}

/// A single named capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Capability {
  pub kind: CapabilityKind,
  pub name: String,
}

impl Capability {
  pub fn new(kind: CapabilityKind, name: impl Into<String>) -> Self {
    Self {
      kind,
      name: name.into(),
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} '{}'", self.kind, self.name)
  }
}

/// The full list of capabilities to check.
///
/// Platform-conditional entries are already resolved; the probe only
/// evaluates what it is given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeRequest {
  pub compiler: String,
  /// Flags passed to every test compilation (e.g. `-D_GNU_SOURCE`).
  pub cflags: Vec<String>,
  pub libraries: Vec<String>,
  pub pkg_config: Vec<String>,
  pub headers: Vec<String>,
  pub functions: Vec<String>,
}

impl ProbeRequest {
  pub fn new(compiler: impl Into<String>) -> Self {
    Self {
      compiler: compiler.into(),
      ..Self::default()
    }
  }

  /// Capabilities in check order: compiler, libraries, pkg-config
  /// libraries, headers, functions.
  pub fn capabilities(&self) -> Vec<Capability> {
    let mut caps = vec![Capability::new(CapabilityKind::Compiler, &self.compiler)];
    caps.extend(self.libraries.iter().map(|l| Capability::new(CapabilityKind::Library, l)));
    caps.extend(self.pkg_config.iter().map(|p| Capability::new(CapabilityKind::PkgConfig, p)));
    caps.extend(self.headers.iter().map(|h| Capability::new(CapabilityKind::Header, h)));
    caps.extend(self.functions.iter().map(|f| Capability::new(CapabilityKind::Function, f)));
    caps
  }
}

/// Outcome of checking one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
  pub capability: Capability,
  pub available: bool,
  /// Why the capability is unavailable. `None` when available.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub diagnostic: Option<String>,
}

impl ProbeResult {
  pub fn available(capability: Capability) -> Self {
    Self {
      capability,
      available: true,
      diagnostic: None,
    }
  }

  pub fn missing(capability: Capability, diagnostic: impl Into<String>) -> Self {
    Self {
      capability,
      available: false,
      diagnostic: Some(diagnostic.into()),
    }
  }
}

/// Every check that ran, all of them successful.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProbeReport {
  pub results: Vec<ProbeResult>,
}

impl ProbeReport {
  pub fn len(&self) -> usize {
    self.results.len()
  }

  pub fn is_empty(&self) -> bool {
    self.results.is_empty()
  }
}

/// The probe stopped at a missing capability.
#[derive(Debug, Clone, Error)]
#[error("{capability} is not available: {diagnostic}")]
pub struct ProbeFailure {
  pub capability: Capability,
  pub diagnostic: String,
  /// Checks performed up to and including the failing one.
  pub checked: Vec<ProbeResult>,
}

/// What a checker concluded about one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
  Available,
  Missing(String),
}
