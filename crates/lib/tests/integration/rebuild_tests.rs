//! Incremental rebuild behaviour across separate runs.

use std::collections::BTreeSet;

use bakery_lib::graph::{BuildGraph, EvalOptions, GraphError, NodeId};
use bakery_lib::package::{META_STAMP, PackageError};
use bakery_lib::pipeline::{PACKAGE_TARGET, PipelineError};

use super::common::{PACKAGE_PROJECT, TestProject};

#[test]
fn second_run_without_changes_executes_nothing() {
  let project = TestProject::packaged();
  let first = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();
  assert_eq!(first.report.executed(), 8);

  let second = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  assert!(second.report.is_success());
  assert_eq!(second.report.executed(), 0);
  assert_eq!(project.toolchain.count(), 1);
}

#[test]
fn changed_source_reruns_only_its_chain() {
  let project = TestProject::packaged();
  project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  project.write("build/prog", &[1u8; 2048]);
  project.touch("build/prog");

  let outcome = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  let built: BTreeSet<NodeId> = outcome.report.built().into_iter().cloned().collect();
  let expected: BTreeSet<NodeId> = [
    "debian/prog/usr/bin/prog",
    "build/installed-size",
    "debian/prog/DEBIAN/control",
    "prog_1.2-3-amd64.deb",
  ]
  .iter()
  .map(|p| NodeId::from(project.path(p)))
  .collect();

  assert_eq!(built, expected);
  assert_eq!(super::common::read(&project.path("build/installed-size")), "2248\n");
  assert_eq!(project.toolchain.count(), 2);
}

#[test]
fn metadata_change_regenerates_control() {
  let project = TestProject::packaged();
  project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  let bumped = PACKAGE_PROJECT.replace("version = \"1.2\"", "version = \"1.3\"");
  project.write("bake.toml", bumped.as_bytes());

  let outcome = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  assert!(outcome.report.is_success());
  let built: BTreeSet<NodeId> = outcome.report.built().into_iter().cloned().collect();
  let expected: BTreeSet<NodeId> = [
    project.path("build").join(META_STAMP),
    project.path("debian/prog/DEBIAN/control"),
    project.path("prog_1.3-3-amd64.deb"),
  ]
  .into_iter()
  .map(NodeId::from)
  .collect();

  assert_eq!(built, expected);
  assert!(super::common::read(&project.path("debian/prog/DEBIAN/control")).contains("Version: 1.3\n"));
  assert!(super::common::read(&project.path("debian/control")).contains("Version: 1.3\n"));
  assert!(project.path("prog_1.3-3-amd64.deb").exists());
}

#[test]
fn doc_copies_rerun_only_when_their_source_changes() {
  let project = TestProject::packaged();
  project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  project.write("changelog", b"prog (1.2-4) unstable; urgency=low\n");
  project.touch("changelog");

  let outcome = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  let built: BTreeSet<NodeId> = outcome.report.built().into_iter().cloned().collect();
  let expected: BTreeSet<NodeId> = ["debian/prog/usr/share/doc/prog/changelog", "prog_1.2-3-amd64.deb"]
    .iter()
    .map(|p| NodeId::from(project.path(p)))
    .collect();

  assert_eq!(built, expected);
}

#[test]
fn deleted_artifact_reruns_archiver_only() {
  let project = TestProject::packaged();
  project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  std::fs::remove_file(project.path("prog_1.2-3-amd64.deb")).unwrap();

  let outcome = project
    .pipeline()
    .run(PACKAGE_TARGET, None, &EvalOptions::default())
    .unwrap();

  assert_eq!(outcome.report.executed(), 1);
  assert!(project.path("prog_1.2-3-amd64.deb").exists());
}

#[test]
fn self_referencing_package_file_is_rejected_at_declaration() {
  let config = PACKAGE_PROJECT.replace("source = \"doc/prog.1\"", "source = \"debian/prog/usr/share/man/man1/prog.1\"");
  let project = TestProject::new(&config);

  let err = project.pipeline().populate().err().unwrap();

  assert!(matches!(
    err,
    PipelineError::Package(PackageError::Graph(GraphError::CycleDetected { .. }))
  ));
}

#[test]
fn indirect_cycle_leaves_graph_unchanged() {
  let mut graph = BuildGraph::new();
  let a = graph.add_node("a", &[NodeId::from("b")], None).unwrap();
  graph.add_node("b", &[NodeId::from("c")], None).unwrap();

  let err = graph.add_node("c", &[a.clone()], None).unwrap_err();

  assert!(matches!(err, GraphError::CycleDetected { .. }));
  assert!(graph.dependencies(&NodeId::from("c")).is_empty());
  assert_eq!(graph.len(), 3);
}
