//! The probe gates all graph work.

use bakery_lib::graph::EvalOptions;
use bakery_lib::pipeline::{PACKAGE_TARGET, PipelineError};
use bakery_lib::probe::CapabilityKind;

use super::common::{Checker, TestProject};

#[test]
fn missing_library_stops_run_before_any_node() {
  let project = TestProject::packaged();
  let checker = Checker::missing(&["ev"]);

  let err = project
    .pipeline()
    .run(PACKAGE_TARGET, Some(&checker), &EvalOptions::default())
    .unwrap_err();

  let PipelineError::Probe(failure) = err else {
    panic!("expected probe failure, got {err:?}");
  };
  assert_eq!(failure.capability.kind, CapabilityKind::Library);
  assert_eq!(failure.capability.name, "ev");
  assert!(!project.path("debian").exists());
  assert_eq!(project.toolchain.count(), 0);
}

#[test]
fn checks_stop_at_first_missing_capability() {
  let project = TestProject::packaged();
  let checker = Checker::missing(&["ev"]);

  let _ = project
    .pipeline()
    .run(PACKAGE_TARGET, Some(&checker), &EvalOptions::default());

  // compiler, then the library; the header is never checked
  assert_eq!(*checker.calls.lock().unwrap(), vec!["cc".to_string(), "ev".to_string()]);
}

#[test]
fn report_lists_every_check_in_order() {
  let project = TestProject::packaged();

  let report = project.pipeline().probe(&Checker::all_present()).unwrap();

  let names: Vec<&str> = report.results.iter().map(|r| r.capability.name.as_str()).collect();
  assert_eq!(names, vec!["cc", "ev", "ev.h"]);
  assert!(report.results.iter().all(|r| r.available));
}
