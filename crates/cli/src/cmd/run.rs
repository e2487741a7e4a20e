//! Implementation of the `bake build`, `bake install` and `bake package`
//! commands.
//!
//! Probes the toolchain (unless skipped), populates the build graph from the
//! project and evaluates the requested alias.

use std::time::Instant;

use anyhow::{Result, bail};
use tracing::debug;

use bakery_lib::pipeline::{PACKAGE_TARGET, PipelineError};
use bakery_lib::probe::{CapabilityChecker, HostChecker};
use bakery_lib::process::SystemProcess;

use super::GlobalOptions;
use crate::output::{
  format_elapsed, print_done, print_failure, print_json, print_node, print_note, print_stat, print_warning,
};

pub fn cmd_run(opts: &GlobalOptions, target: &str) -> Result<()> {
  let pipeline = opts.load_pipeline()?;
  let process = SystemProcess;
  let host = HostChecker::new(&process);
  let checker: Option<&dyn CapabilityChecker> = if opts.skip_probe { None } else { Some(&host) };

  let options = opts.eval_options();
  debug!(alias = %target, jobs = options.jobs, policy = ?options.policy, "running target");

  let started = Instant::now();
  let outcome = match pipeline.run(target, checker, &options) {
    Ok(outcome) => outcome,
    Err(PipelineError::Probe(failure)) => {
      print_failure(&failure.to_string());
      bail!("Toolchain probe failed");
    }
    Err(e) => return Err(e.into()),
  };
  let elapsed = started.elapsed();

  let report = &outcome.report;

  if opts.output.is_json() {
    print_json(&outcome.summary())?;
  } else {
    if let Some(probe) = &outcome.probe {
      print_done(&format!("Toolchain probe passed ({} checks)", probe.len()));
    }

    if opts.verbose {
      for (id, node) in report.iter() {
        print_node(id, node);
      }
      println!();
    }

    for (id, err) in report.failed() {
      print_failure(&format!("{}: {}", id, err));
    }
    for (id, cause) in report.skipped() {
      print_warning(&format!("{}: skipped, {}", id, cause));
    }

    print_stat("Built", &report.built().len().to_string());
    print_stat("Up to date", &report.up_to_date().len().to_string());
    if !report.failed().is_empty() {
      print_stat("Failed", &report.failed().len().to_string());
    }
    if !report.skipped().is_empty() {
      print_stat("Skipped", &report.skipped().len().to_string());
    }
    print_stat("Elapsed", &format_elapsed(elapsed));
  }

  if !report.is_success() {
    bail!("Target '{}' failed", target);
  }

  if !opts.output.is_json() {
    if let Some(artifact) = &outcome.artifact
      && target == PACKAGE_TARGET
    {
      print_done(&format!("Packaged {}", artifact.path.display()));
    } else if report.executed() == 0 {
      print_note(&format!("'{}' is up to date", target));
    } else {
      print_done(&format!("'{}' complete", target));
    }
  }

  Ok(())
}
