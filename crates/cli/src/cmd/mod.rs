mod info;
mod plan;
mod probe;
mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};

use bakery_lib::config::Project;
use bakery_lib::graph::{EvalOptions, FailurePolicy};
use bakery_lib::pipeline::Pipeline;

use crate::output::OutputFormat;

pub use info::cmd_info;
pub use plan::cmd_plan;
pub use probe::cmd_probe;
pub use run::cmd_run;

/// Flags shared by every subcommand.
pub struct GlobalOptions {
  pub config: PathBuf,
  pub jobs: Option<usize>,
  pub fail_fast: bool,
  pub skip_probe: bool,
  pub output: OutputFormat,
  pub verbose: bool,
}

impl GlobalOptions {
  pub fn eval_options(&self) -> EvalOptions {
    let mut options = EvalOptions::default();
    if let Some(jobs) = self.jobs {
      options.jobs = jobs.max(1);
    }
    if self.fail_fast {
      options.policy = FailurePolicy::FailFast;
    }
    options
  }

  pub fn load_project(&self) -> Result<Project> {
    Project::load(&self.config).with_context(|| format!("Failed to load project: {}", self.config.display()))
  }

  pub fn load_pipeline(&self) -> Result<Pipeline> {
    Ok(Pipeline::system(self.load_project()?))
  }
}
