//! Shared helpers for pipeline integration tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use bakery_lib::config::Project;
use bakery_lib::pipeline::Pipeline;
use bakery_lib::probe::{Capability, CapabilityChecker, CheckOutcome, ProbeRequest};
use bakery_lib::process::{ExternalProcess, Invocation, ProcessOutput};
use tempfile::TempDir;

/// Project with two prebuilt files (1024 + 200 bytes), a package section and
/// copyright and changelog documents.
pub const PACKAGE_PROJECT: &str = r#"
[project]
name = "prog"

[probe]
libraries = ["ev"]
headers = ["ev.h"]

[install]
prefix = "stage"

[package]
version = "1.2"
subversion = "3"
maintainer = "Dev <dev@example.org>"
architecture = "amd64"
depends = "libev4"
description = "example program"
copyright = "copyright"
changelog = "changelog"

[[package.files]]
dest = "usr/bin/prog"
source = "build/prog"

[[package.files]]
dest = "usr/share/man/man1/prog.1"
source = "doc/prog.1"
"#;

/// Fake toolchain. Any invocation writes a placeholder to its last argument,
/// which is the artifact path for the archiver.
#[derive(Default)]
pub struct FakeToolchain {
  pub invocations: Mutex<Vec<String>>,
}

impl FakeToolchain {
  pub fn count(&self) -> usize {
    self.invocations.lock().unwrap().len()
  }
}

impl ExternalProcess for FakeToolchain {
  fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
    self.invocations.lock().unwrap().push(invocation.to_string());
    if let Some(target) = invocation.args.last() {
      fs::write(target, b"!<arch>\n")?;
    }
    Ok(ProcessOutput::ok())
  }
}

/// Checker reporting the named capabilities as missing.
pub struct Checker {
  pub missing: Vec<&'static str>,
  pub calls: Mutex<Vec<String>>,
}

impl Checker {
  pub fn all_present() -> Self {
    Self::missing(&[])
  }

  pub fn missing(names: &[&'static str]) -> Self {
    Self {
      missing: names.to_vec(),
      calls: Mutex::new(Vec::new()),
    }
  }
}

impl CapabilityChecker for Checker {
  fn check(&self, capability: &Capability, _: &ProbeRequest) -> CheckOutcome {
    self.calls.lock().unwrap().push(capability.name.clone());
    if self.missing.iter().any(|name| *name == capability.name) {
      CheckOutcome::Missing(format!("{} not found", capability))
    } else {
      CheckOutcome::Available
    }
  }
}

/// Isolated project directory.
pub struct TestProject {
  pub temp: TempDir,
  pub toolchain: Arc<FakeToolchain>,
}

impl TestProject {
  pub fn new(config: &str) -> Self {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("bake.toml"), config).unwrap();
    Self {
      temp,
      toolchain: Arc::new(FakeToolchain::default()),
    }
  }

  /// The packaging project with its prebuilt inputs in place.
  pub fn packaged() -> Self {
    let project = Self::new(PACKAGE_PROJECT);
    project.write("build/prog", &[0u8; 1024]);
    project.write("doc/prog.1", &[b'.'; 200]);
    project.write_docs();
    project
  }

  pub fn write_docs(&self) {
    self.write("copyright", b"Copyright: example\n");
    self.write("changelog", b"prog (1.2-3) unstable; urgency=low\n");
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root().join(relative)
  }

  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  pub fn write(&self, relative: &str, content: &[u8]) {
    let path = self.path(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
  }

  /// Bump a file's mtime past anything written so far.
  pub fn touch(&self, relative: &str) {
    let file = fs::File::options().write(true).open(self.path(relative)).unwrap();
    file
      .set_modified(SystemTime::now() + Duration::from_secs(5))
      .unwrap();
  }

  /// A fresh pipeline over the project file, sharing this project's toolchain.
  pub fn pipeline(&self) -> Pipeline {
    let project = Project::load(&self.path("bake.toml")).unwrap();
    Pipeline::new(project, self.toolchain.clone())
  }
}

pub fn read(path: &Path) -> String {
  fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
}
