//! Project configuration.
//!
//! Loads `bake.toml` and resolves it against the project root and the host
//! platform into the inputs the probe, install planner and package
//! assembler take.

pub mod types;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::install::{ArtifactKind, InstallArtifact, InstallDestinations};
use crate::package::{DEFAULT_ARCHIVER, FileEntry, FileList, PackageError, PackageMeta, PackageSpec};
use crate::platform::Platform;
use crate::probe::ProbeRequest;

pub use types::{
  CompileSection, ConditionalProbe, FileSection, InstallSection, PackageSection, PlatformPredicate, ProbeSection,
  ProjectConfig, ProjectSection,
};

/// Default project file name.
pub const PROJECT_FILE: &str = "bake.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid project configuration: {0}")]
  Invalid(String),

  #[error("invalid package configuration: {0}")]
  Package(#[from] PackageError),
}

/// A loaded project: configuration plus where it lives and what it runs on.
#[derive(Debug, Clone)]
pub struct Project {
  /// Directory containing the project file; every relative path resolves
  /// against it.
  pub root: PathBuf,
  pub config: ProjectConfig,
  /// Host platform, `None` if unrecognised.
  pub platform: Option<Platform>,
}

impl Project {
  /// Load and validate a project file.
  ///
  /// # Errors
  ///
  /// [`ConfigError::Read`] or [`ConfigError::Parse`] for an unreadable
  /// file, [`ConfigError::Invalid`] if validation fails.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let config: ProjectConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let parent = match path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p,
      _ => Path::new("."),
    };
    let root = dunce::canonicalize(parent).map_err(|source| ConfigError::Read {
      path: parent.to_path_buf(),
      source,
    })?;

    info!(path = %path.display(), project = %config.project.name, "loaded project");
    Self::new(root, config)
  }

  /// Wrap an already-parsed configuration rooted at `root`.
  pub fn new(root: impl Into<PathBuf>, config: ProjectConfig) -> Result<Self, ConfigError> {
    let project = Self {
      root: root.into(),
      config,
      platform: Platform::current(),
    };
    project.validate()?;
    Ok(project)
  }

  /// Override the detected host platform.
  pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
    self.platform = platform;
    self
  }

  pub fn name(&self) -> &str {
    &self.config.project.name
  }

  /// Resolve a project-relative path.
  pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
    self.root.join(path)
  }

  pub fn build_dir(&self) -> PathBuf {
    self.resolve(&self.config.project.build_dir)
  }

  /// The compiled program.
  pub fn compile_output(&self) -> PathBuf {
    match &self.config.compile.output {
      Some(output) => self.resolve(output),
      None => self.build_dir().join(self.name()),
    }
  }

  pub fn compile_sources(&self) -> Vec<PathBuf> {
    self.config.compile.sources.iter().map(|s| self.resolve(s)).collect()
  }

  /// Capabilities to probe, with platform-conditional blocks resolved.
  pub fn probe_request(&self) -> ProbeRequest {
    let probe = &self.config.probe;
    let mut request = ProbeRequest {
      compiler: probe
        .compiler
        .clone()
        .unwrap_or_else(|| self.config.compile.compiler.clone()),
      cflags: self.config.compile.cflags.clone(),
      libraries: probe.libraries.clone(),
      pkg_config: probe.pkg_config.clone(),
      headers: probe.headers.clone(),
      functions: probe.functions.clone(),
    };

    for block in &probe.conditional {
      if !block.when.matches(self.platform.as_ref()) {
        debug!(when = ?block.when, "skipping conditional probe block");
        continue;
      }
      request.libraries.extend(block.libraries.iter().cloned());
      request.headers.extend(block.headers.iter().cloned());
      request.functions.extend(block.functions.iter().cloned());
    }

    request
  }

  /// Files to install, by kind.
  pub fn install_artifacts(&self) -> Vec<InstallArtifact> {
    let install = &self.config.install;

    let binaries = match &install.binaries {
      Some(binaries) => binaries.iter().map(|b| self.resolve(b)).collect(),
      None => vec![self.compile_output()],
    };

    let doc_dir = self.resolve(&install.doc_dir);

    binaries
      .into_iter()
      .map(|b| InstallArtifact::new(ArtifactKind::Binary, b))
      .chain(
        install
          .man_pages
          .iter()
          .map(|m| InstallArtifact::new(ArtifactKind::ManPage, doc_dir.join(m))),
      )
      .chain(
        install
          .aux_binaries
          .iter()
          .map(|a| InstallArtifact::new(ArtifactKind::AuxBinary, self.resolve(a))),
      )
      .collect()
  }

  /// Install directories; a relative prefix resolves against the root.
  pub fn install_destinations(&self) -> InstallDestinations {
    let install = &self.config.install;
    let destinations = InstallDestinations::from_prefix(&self.resolve_dir(&install.prefix));
    match &install.aux_bin_dir {
      Some(dir) => destinations.with_aux_bin_dir(&self.resolve_dir(dir)),
      None => destinations,
    }
  }

  /// Package inputs, or `None` if the project has no `[package]` section.
  ///
  /// # Errors
  ///
  /// [`ConfigError::Package`] for invalid file entries or metadata, and
  /// [`ConfigError::Invalid`] if no architecture is configured and the host
  /// is unrecognised.
  pub fn package_spec(&self) -> Result<Option<PackageSpec>, ConfigError> {
    let Some(package) = &self.config.package else {
      return Ok(None);
    };

    let architecture = match (&package.architecture, &self.platform) {
      (Some(arch), _) => arch.clone(),
      (None, Some(platform)) => platform.arch.package_name().to_string(),
      (None, None) => {
        return Err(ConfigError::Invalid(
          "package.architecture is required on an unrecognised host".to_string(),
        ));
      }
    };

    let meta = PackageMeta {
      name: package.name.clone().unwrap_or_else(|| self.name().to_string()),
      version: package.version.clone(),
      subversion: package.subversion.clone(),
      maintainer: package.maintainer.clone(),
      architecture,
      depends: package.depends.clone(),
      description: package.description.clone(),
      priority: package.priority.clone(),
      section: package.section.clone(),
      extension: package.extension.clone(),
    };
    meta.validate()?;

    let entries = package
      .files
      .iter()
      .map(|f| FileEntry::new(&f.dest, self.resolve(&f.source)))
      .collect::<Result<Vec<_>, _>>()?;

    let staging_dir = self.resolve(&package.staging_dir);
    let control_mirrors = match &package.control_mirrors {
      Some(mirrors) => mirrors.iter().map(|m| self.resolve(m)).collect(),
      None => vec![staging_dir.join("control")],
    };

    Ok(Some(PackageSpec {
      meta,
      files: FileList::new(entries)?,
      staging_dir,
      out_dir: package.out_dir.as_ref().map_or_else(|| self.root.clone(), |d| self.resolve(d)),
      build_dir: self.build_dir(),
      copyright: package.copyright.as_ref().map(|p| self.resolve(p)),
      changelog: package.changelog.as_ref().map(|p| self.resolve(p)),
      control_mirrors,
      archiver: package
        .archiver
        .clone()
        .unwrap_or_else(|| DEFAULT_ARCHIVER.iter().map(|s| s.to_string()).collect()),
    }))
  }

  fn resolve_dir(&self, dir: &str) -> String {
    if dir.is_empty() || Path::new(dir).is_absolute() {
      dir.to_string()
    } else {
      self.resolve(dir).to_string_lossy().into_owned()
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let config = &self.config;

    if config.project.name.trim().is_empty() {
      return Err(ConfigError::Invalid("project.name must not be empty".to_string()));
    }
    if config.compile.compiler.trim().is_empty() {
      return Err(ConfigError::Invalid("compile.compiler must not be empty".to_string()));
    }
    if let Some(package) = &config.package
      && let Some(archiver) = &package.archiver
      && archiver.is_empty()
    {
      return Err(ConfigError::Invalid("package.archiver must not be empty".to_string()));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::platform::{Arch, Os};

  const PROJECT: &str = r#"
    [project]
    name = "prog"

    [compile]
    cflags = ["-std=c99", "-D_GNU_SOURCE"]
    sources = ["src/prog.c"]

    [probe]
    libraries = ["pthread", "ev"]
    headers = ["ev.h"]
    functions = ["sigaction"]

    [[probe.conditional]]
    when = "not-apple"
    functions = ["sigignore"]

    [[probe.conditional]]
    when = "apple"
    libraries = ["iconv"]

    [install]
    prefix = "/usr/local"
    man_pages = ["build/man/prog.1"]

    [package]
    version = "1.2"
    subversion = "3"
    maintainer = "Dev <dev@example.org>"
    description = "example program"
    depends = "libev4"
    copyright = "debian/copyright"

    [[package.files]]
    dest = "usr/bin/prog"
    source = "build/prog"

    [[package.files]]
    dest = "usr/share/man/man1/prog.1"
    source = "doc/build/man/prog.1"
  "#;

  fn project(platform: Platform) -> Project {
    let config: ProjectConfig = toml::from_str(PROJECT).unwrap();
    Project::new("/work/prog", config).unwrap().with_platform(Some(platform))
  }

  fn linux() -> Platform {
    Platform::new(Arch::X86_64, Os::Linux)
  }

  #[test]
  fn probe_request_resolves_conditionals() {
    let request = project(linux()).probe_request();
    assert_eq!(request.compiler, "cc");
    assert_eq!(request.libraries, vec!["pthread", "ev"]);
    assert_eq!(request.functions, vec!["sigaction", "sigignore"]);

    let request = project(Platform::new(Arch::Aarch64, Os::MacOs)).probe_request();
    assert_eq!(request.libraries, vec!["pthread", "ev", "iconv"]);
    assert_eq!(request.functions, vec!["sigaction"]);
  }

  #[test]
  fn install_defaults_to_compiled_program() {
    let project = project(linux());
    let artifacts = project.install_artifacts();

    assert_eq!(
      artifacts,
      vec![
        InstallArtifact::new(ArtifactKind::Binary, "/work/prog/build/prog"),
        InstallArtifact::new(ArtifactKind::ManPage, "/work/prog/doc/build/man/prog.1"),
      ]
    );
    assert_eq!(project.install_destinations().bin_dir, "/usr/local/bin/");
  }

  #[test]
  fn relative_prefix_resolves_against_root() {
    let mut project = project(linux());
    project.config.install.prefix = "stage".to_string();
    assert_eq!(project.install_destinations().bin_dir, "/work/prog/stage/bin/");
  }

  #[test]
  fn package_spec_resolves_paths_and_host_arch() {
    let spec = project(linux()).package_spec().unwrap().unwrap();

    assert_eq!(spec.meta.name, "prog");
    assert_eq!(spec.meta.architecture, "amd64");
    assert_eq!(spec.staging_root(), PathBuf::from("/work/prog/debian/prog"));
    assert_eq!(spec.control_mirrors, vec![PathBuf::from("/work/prog/debian/control")]);
    assert_eq!(spec.out_dir, PathBuf::from("/work/prog"));
    assert_eq!(spec.archiver, vec!["fakeroot", "dpkg-deb", "-b"]);
    assert_eq!(spec.files.entries()[0].source, PathBuf::from("/work/prog/build/prog"));
    assert_eq!(spec.copyright, Some(PathBuf::from("/work/prog/debian/copyright")));
  }

  #[test]
  fn arm_host_maps_to_debian_name() {
    let spec = project(Platform::new(Arch::Aarch64, Os::Linux))
      .package_spec()
      .unwrap()
      .unwrap();
    assert_eq!(spec.meta.architecture, "arm64");
  }

  #[test]
  fn unknown_host_needs_explicit_architecture() {
    let project = Project {
      platform: None,
      ..project(linux())
    };
    assert!(matches!(project.package_spec(), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn escaping_file_entry_is_package_error() {
    let mut project = project(linux());
    if let Some(package) = project.config.package.as_mut() {
      package.files[0].dest = PathBuf::from("../etc/passwd");
    }
    assert!(matches!(
      project.package_spec(),
      Err(ConfigError::Package(PackageError::InvalidEntry { .. }))
    ));
  }

  #[test]
  fn empty_name_is_invalid() {
    let mut config: ProjectConfig = toml::from_str(PROJECT).unwrap();
    config.project.name = " ".to_string();
    assert!(matches!(Project::new("/work", config), Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn load_reads_file_and_canonicalizes_root() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(PROJECT_FILE);
    fs::write(&path, PROJECT).unwrap();

    let project = Project::load(&path).unwrap();

    assert_eq!(project.root, dunce::canonicalize(temp.path()).unwrap());
    assert_eq!(project.name(), "prog");
  }

  #[test]
  fn load_reports_parse_errors_with_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(PROJECT_FILE);
    fs::write(&path, "[project\nname = ").unwrap();

    match Project::load(&path).unwrap_err() {
      ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn load_missing_file_is_read_error() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
      Project::load(&temp.path().join("nope.toml")),
      Err(ConfigError::Read { .. })
    ));
  }
}
