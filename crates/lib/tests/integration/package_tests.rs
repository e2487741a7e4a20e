//! End-to-end packaging runs.

use bakery_lib::graph::{EvalOptions, NodeId};
use bakery_lib::pipeline::PACKAGE_TARGET;

use super::common::{Checker, TestProject, read};

const EXPECTED_CONTROL: &str = "\
Package: prog
Priority: extra
Section: utils
Installed-Size: 1224
Maintainer: Dev <dev@example.org>
Architecture: amd64
Version: 1.2
Depends: libev4
Description: example program

";

#[test]
fn package_run_produces_artifact_and_control() {
  let project = TestProject::packaged();
  let pipeline = project.pipeline();

  let outcome = pipeline
    .run(PACKAGE_TARGET, Some(&Checker::all_present()), &EvalOptions::default())
    .unwrap();

  assert!(outcome.report.is_success(), "{:?}", outcome.report.summary());

  let artifact = outcome.artifact.unwrap();
  assert_eq!(artifact.file_name, "prog_1.2-3-amd64.deb");
  assert!(project.path("prog_1.2-3-amd64.deb").exists());

  assert_eq!(read(&project.path("debian/prog/DEBIAN/control")), EXPECTED_CONTROL);
  assert_eq!(read(&project.path("build/installed-size")), "1224\n");
  assert!(project.path("debian/prog/usr/bin/prog").exists());
  assert!(project.path("debian/prog/usr/share/man/man1/prog.1").exists());
  assert_eq!(
    read(&project.path("debian/prog/usr/share/doc/prog/copyright")),
    "Copyright: example\n"
  );
  assert!(project.path("debian/prog/usr/share/doc/prog/changelog").exists());
}

#[test]
fn control_mirror_is_byte_identical() {
  let project = TestProject::packaged();

  project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  let canonical = std::fs::read(project.path("debian/prog/DEBIAN/control")).unwrap();
  let mirror = std::fs::read(project.path("debian/control")).unwrap();
  assert_eq!(canonical, mirror);
}

#[test]
fn archiver_receives_staging_root_and_artifact() {
  let project = TestProject::packaged();

  project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  let invocations = project.toolchain.invocations.lock().unwrap();
  assert_eq!(
    *invocations,
    vec![format!(
      "fakeroot dpkg-deb -b {} {}",
      project.path("debian/prog").display(),
      project.path("prog_1.2-3-amd64.deb").display()
    )]
  );
}

#[test]
fn missing_input_fails_archive_but_builds_independent_copies() {
  let project = TestProject::new(super::common::PACKAGE_PROJECT);
  project.write("build/prog", &[0u8; 1024]);
  project.write_docs();

  let outcome = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  assert!(!outcome.report.is_success());
  let man_page = NodeId::from(project.path("doc/prog.1"));
  assert_eq!(outcome.report.outcome(&man_page).map(|o| o.label()), Some("failed"));
  assert!(project.path("debian/prog/usr/bin/prog").exists());
  assert!(!project.path("prog_1.2-3-amd64.deb").exists());
  assert_eq!(project.toolchain.count(), 0);
}
