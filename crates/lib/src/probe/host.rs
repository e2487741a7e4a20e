//! Capability checks against the host toolchain.
//!
//! Each check compiles (and usually links) a throwaway C program in a scratch
//! directory. pkg-config lookups shell out to `pkg-config --exists`.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use crate::process::{ExternalProcess, Invocation};

use super::CapabilityChecker;
use super::types::{Capability, CapabilityKind, CheckOutcome, ProbeRequest};

const SOURCE_NAME: &str = "conftest.c";

/// Probes the real toolchain through an [`ExternalProcess`].
pub struct HostChecker<'a> {
  process: &'a dyn ExternalProcess,
  pkg_config: String,
}

impl<'a> HostChecker<'a> {
  pub fn new(process: &'a dyn ExternalProcess) -> Self {
    Self {
      process,
      pkg_config: "pkg-config".to_string(),
    }
  }

  /// Use a different pkg-config executable.
  pub fn with_pkg_config(mut self, program: impl Into<String>) -> Self {
    self.pkg_config = program.into();
    self
  }

  /// Write `source` into a scratch dir and run the compiler on it.
  ///
  /// Returns `Ok(())` on a zero exit, otherwise the compiler's diagnostic.
  fn try_compile(&self, request: &ProbeRequest, source: &str, link: bool, libs: &[&str]) -> Result<(), String> {
    let scratch = TempDir::new().map_err(|e| format!("cannot create scratch directory: {}", e))?;
    let source_path = scratch.path().join(SOURCE_NAME);
    fs::write(&source_path, source).map_err(|e| format!("cannot write {}: {}", source_path.display(), e))?;

    let invocation = compile_invocation(request, scratch.path(), link, libs);
    debug!(cmd = %invocation, "running capability test compile");

    match self.process.run(&invocation) {
      Ok(output) if output.success() => Ok(()),
      Ok(output) => Err(output.diagnostic()),
      Err(e) => Err(format!("cannot run {}: {}", request.compiler, e)),
    }
  }

  fn check_pkg_config(&self, name: &str) -> Result<(), String> {
    let invocation = Invocation::new(&self.pkg_config).arg("--exists").arg(name);
    match self.process.run(&invocation) {
      Ok(output) if output.success() => Ok(()),
      Ok(output) => Err(output.diagnostic()),
      Err(e) => Err(format!("cannot run {}: {}", self.pkg_config, e)),
    }
  }
}

impl CapabilityChecker for HostChecker<'_> {
  fn check(&self, capability: &Capability, request: &ProbeRequest) -> CheckOutcome {
    let name = capability.name.as_str();

    let (result, summary) = match capability.kind {
      CapabilityKind::Compiler => (
        self.try_compile(request, &main_program(""), true, &[]),
        "c compiler is not installed".to_string(),
      ),
      CapabilityKind::Library => (
        self.try_compile(request, &main_program(""), true, &[name]),
        format!("library {} not installed", name),
      ),
      CapabilityKind::PkgConfig => (
        self.check_pkg_config(name),
        format!("library {} not known to pkg-config", name),
      ),
      CapabilityKind::Header => (
        self.try_compile(request, &main_program(&format!("#include <{}>\n", name)), false, &[]),
        format!("{} does not exist", name),
      ),
      CapabilityKind::Function => {
        let libs: Vec<&str> = request.libraries.iter().map(String::as_str).collect();
        (
          self.try_compile(request, &function_program(name), true, &libs),
          format!("{} does not exist", name),
        )
      }
    };

    match result {
      Ok(()) => CheckOutcome::Available,
      Err(detail) if detail.is_empty() => CheckOutcome::Missing(summary),
      Err(detail) => CheckOutcome::Missing(format!("{} ({})", summary, detail)),
    }
  }
}

fn main_program(prelude: &str) -> String {
  format!("{}int main(void) {{ return 0; }}\n", prelude)
}

/// Program that references `name` with a dummy prototype so only the linker
/// decides whether the symbol exists.
fn function_program(name: &str) -> String {
  format!(
    "#ifdef __cplusplus\nextern \"C\"\n#endif\nchar {name}(void);\nint main(void) {{ return (int) {name}(); }}\n"
  )
}

fn compile_invocation(request: &ProbeRequest, dir: &Path, link: bool, libs: &[&str]) -> Invocation {
  let mut invocation = Invocation::new(&request.compiler)
    .args(request.cflags.iter().cloned())
    .current_dir(dir);

  if link {
    invocation = invocation.arg(SOURCE_NAME).args(["-o", "conftest"]);
  } else {
    invocation = invocation.args(["-c", SOURCE_NAME, "-o", "conftest.o"]);
  }

  invocation.args(libs.iter().map(|lib| format!("-l{}", lib)))
}
