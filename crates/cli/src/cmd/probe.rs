//! Implementation of the `bake probe` command.

use anyhow::{Result, bail};
use serde::Serialize;

use bakery_lib::probe::ProbeResult;

use super::GlobalOptions;
use crate::output::{print_capability, print_done, print_failure, print_json};

#[derive(Serialize)]
struct ProbeOutput<'a> {
  success: bool,
  results: &'a [ProbeResult],
}

pub fn cmd_probe(opts: &GlobalOptions) -> Result<()> {
  let pipeline = opts.load_pipeline()?;

  let (results, failure) = match pipeline.probe_host() {
    Ok(report) => (report.results, None),
    Err(failure) => (failure.checked.clone(), Some(failure)),
  };

  if opts.output.is_json() {
    print_json(&ProbeOutput {
      success: failure.is_none(),
      results: &results,
    })?;
  } else {
    for result in &results {
      print_capability(&result.capability, result.available);
    }
  }

  match failure {
    Some(failure) => {
      if !opts.output.is_json() {
        print_failure(&failure.to_string());
      }
      bail!("Toolchain probe failed")
    }
    None => {
      if !opts.output.is_json() {
        print_done(&format!("All {} capabilities available", results.len()));
      }
      Ok(())
    }
  }
}
