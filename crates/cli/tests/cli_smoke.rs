//! CLI smoke tests for bake.
//!
//! These run the real binary against throwaway projects. Nothing here needs
//! a C toolchain: the probe is skipped or expected to fail, and packaging
//! uses a shell one-liner as the archiver.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the bake binary.
fn bake_cmd() -> Command {
  cargo_bin_cmd!("bake")
}

/// Installs a prebuilt program into a local prefix.
const INSTALL_PROJECT: &str = r#"
[project]
name = "prog"

[install]
prefix = "stage"
"#;

/// Packages a prebuilt program with an archiver that only touches the artifact.
const PACKAGE_PROJECT: &str = r#"
[project]
name = "prog"

[package]
version = "1.2"
subversion = "3"
maintainer = "Dev <dev@example.org>"
architecture = "amd64"
description = "example program"
archiver = ["sh", "-c", "touch \"$1\""]

[[package.files]]
dest = "usr/bin/prog"
source = "build/prog"
"#;

/// Temp project with `bake.toml` and a 1024-byte `build/prog`.
fn temp_project(config: &str) -> (TempDir, PathBuf) {
  let temp = TempDir::new().unwrap();
  let config_path = temp.path().join("bake.toml");
  std::fs::write(&config_path, config).unwrap();
  std::fs::create_dir_all(temp.path().join("build")).unwrap();
  std::fs::write(temp.path().join("build/prog"), vec![0u8; 1024]).unwrap();
  (temp, config_path)
}

fn config_arg(path: &Path) -> [String; 2] {
  ["--config".to_string(), path.display().to_string()]
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  bake_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  bake_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("bake"));
}

#[test]
fn unknown_subcommand_fails() {
  bake_cmd().arg("bogus").assert().failure();
}

// =============================================================================
// Info
// =============================================================================

#[test]
fn info_without_project_succeeds() {
  let temp = TempDir::new().unwrap();
  bake_cmd()
    .args(config_arg(&temp.path().join("bake.toml")))
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("Platform"));
}

#[test]
fn info_json_includes_project() {
  let (_temp, config) = temp_project(PACKAGE_PROJECT);
  let output = bake_cmd()
    .args(config_arg(&config))
    .args(["info", "--output", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["project"]["name"], "prog");
  assert!(
    json["project"]["artifact"]
      .as_str()
      .unwrap()
      .ends_with("prog_1.2-3-amd64.deb")
  );
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn missing_project_file_fails() {
  let temp = TempDir::new().unwrap();
  bake_cmd()
    .args(config_arg(&temp.path().join("missing.toml")))
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load project"));
}

#[test]
fn invalid_project_file_fails() {
  let (_temp, config) = temp_project("[project]\nname = \"prog\"\nflavour = \"spicy\"\n");
  bake_cmd()
    .args(config_arg(&config))
    .arg("build")
    .assert()
    .failure();
}

#[test]
fn missing_compiler_fails_probe() {
  let (_temp, config) = temp_project(
    "[project]\nname = \"prog\"\n\n[compile]\ncompiler = \"bake-test-no-such-compiler\"\n",
  );
  bake_cmd()
    .args(config_arg(&config))
    .arg("probe")
    .assert()
    .failure()
    .stderr(predicate::str::contains("c compiler is not installed"));
}

#[test]
fn package_without_section_fails() {
  let (_temp, config) = temp_project(INSTALL_PROJECT);
  bake_cmd()
    .args(config_arg(&config))
    .args(["package", "--skip-probe"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no [package] section"));
}

// =============================================================================
// Plan
// =============================================================================

#[test]
fn plan_lists_waves() {
  let (_temp, config) = temp_project(INSTALL_PROJECT);
  bake_cmd()
    .args(config_arg(&config))
    .args(["plan", "install"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Wave 1"))
    .stdout(predicate::str::contains("stage/bin/prog"));
}

#[test]
fn plan_json_is_array_of_waves() {
  let (temp, config) = temp_project(INSTALL_PROJECT);
  let output = bake_cmd()
    .args(config_arg(&config))
    .args(["plan", "install", "-o", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let waves: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(waves.as_array().unwrap().len(), 3);
  assert_eq!(waves[2][0]["id"], "install");
  assert_eq!(waves[2][0]["kind"], "alias");
  assert!(!temp.path().join("stage").exists());
}

#[test]
fn plan_unknown_target_fails() {
  let (_temp, config) = temp_project(INSTALL_PROJECT);
  bake_cmd()
    .args(config_arg(&config))
    .args(["plan", "nothing-here"])
    .assert()
    .failure();
}

// =============================================================================
// Runs
// =============================================================================

#[test]
fn install_copies_into_prefix() {
  let (temp, config) = temp_project(INSTALL_PROJECT);
  bake_cmd()
    .args(config_arg(&config))
    .args(["install", "--skip-probe"])
    .assert()
    .success();

  assert_eq!(std::fs::read(temp.path().join("stage/bin/prog")).unwrap().len(), 1024);
}

#[test]
fn second_install_is_up_to_date() {
  let (_temp, config) = temp_project(INSTALL_PROJECT);
  bake_cmd()
    .args(config_arg(&config))
    .args(["install", "--skip-probe"])
    .assert()
    .success();

  bake_cmd()
    .args(config_arg(&config))
    .args(["install", "--skip-probe"])
    .assert()
    .success()
    .stdout(predicate::str::contains("up to date"));
}

#[cfg(unix)]
#[test]
fn package_writes_control_and_artifact() {
  let (temp, config) = temp_project(PACKAGE_PROJECT);
  bake_cmd()
    .args(config_arg(&config))
    .args(["package", "--skip-probe"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Packaged"));

  let control = std::fs::read_to_string(temp.path().join("debian/prog/DEBIAN/control")).unwrap();
  assert!(control.contains("Installed-Size: 1024\n"));
  assert!(!control.contains("Depends"));
  assert!(temp.path().join("debian/control").exists());
  assert!(temp.path().join("prog_1.2-3-amd64.deb").exists());
}

#[cfg(unix)]
#[test]
fn package_json_reports_artifact() {
  let (_temp, config) = temp_project(PACKAGE_PROJECT);
  let output = bake_cmd()
    .args(config_arg(&config))
    .args(["package", "--skip-probe", "--output", "json", "--jobs", "2"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["artifact"]["file_name"], "prog_1.2-3-amd64.deb");
  assert_eq!(json["evaluation"]["success"], true);
}
