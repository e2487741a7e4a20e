mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bakery_lib::config::PROJECT_FILE;
use bakery_lib::pipeline::{BUILD_TARGET, INSTALL_TARGET, PACKAGE_TARGET};

use crate::cmd::{GlobalOptions, cmd_info, cmd_plan, cmd_probe, cmd_run};
use crate::output::OutputFormat;

/// bake - Build, install and package a C program from a bake.toml
#[derive(Parser)]
#[command(name = "bake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the project file
  #[arg(short, long, global = true, default_value = PROJECT_FILE)]
  config: PathBuf,

  /// Maximum number of producers running at once (default: CPU count)
  #[arg(short, long, global = true)]
  jobs: Option<usize>,

  /// Stop starting new work after the first failure
  #[arg(long, global = true)]
  fail_fast: bool,

  /// Skip the toolchain probe
  #[arg(long, global = true)]
  skip_probe: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Check the toolchain for every required capability
  Probe,

  /// Compile the program
  Build,

  /// Copy built artifacts into the install prefix
  Install,

  /// Assemble the binary package
  Package,

  /// Show evaluation waves for a target without running anything
  Plan {
    /// Target node: an alias or a file path
    #[arg(default_value = BUILD_TARGET)]
    target: String,
  },

  /// Show platform and project information
  Info,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let opts = GlobalOptions {
    config: cli.config,
    jobs: cli.jobs,
    fail_fast: cli.fail_fast,
    skip_probe: cli.skip_probe,
    output: cli.output,
    verbose: cli.verbose,
  };

  match cli.command {
    Commands::Probe => cmd_probe(&opts),
    Commands::Build => cmd_run(&opts, BUILD_TARGET),
    Commands::Install => cmd_run(&opts, INSTALL_TARGET),
    Commands::Package => cmd_run(&opts, PACKAGE_TARGET),
    Commands::Plan { target } => cmd_plan(&opts, &target),
    Commands::Info => cmd_info(&opts),
  }
}
