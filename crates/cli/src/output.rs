//! How `bake` reports to the terminal.
//!
//! Every node a run touches ends up built, up to date, skipped or failed,
//! and every probed capability is available or missing. Each of those gets
//! a mark and a color here so `probe`, `plan` and the run commands print
//! them the same way. `--output json` bypasses all of it.

use std::time::Duration;

use anyhow::Context;
use bakery_lib::graph::NodeOutcome;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream, Style};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Marks printed in front of nodes and capabilities.
pub mod marks {
  pub const BUILT: &str = "+";
  pub const UP_TO_DATE: &str = "=";
  pub const SKIPPED: &str = "-";
  pub const FAILED: &str = "✗";

  pub const AVAILABLE: &str = "✓";
  pub const MISSING: &str = "✗";

  /// A planned node and the producer that will write it.
  pub const PRODUCES: &str = "→";
  /// A plan entry without a producer: a source file or an alias.
  pub const LEAF: &str = "•";
  /// One dependency of a planned node.
  pub const NEEDS: &str = "↳";

  pub const WARN: &str = "⚠";
}

/// Mark and style for a node's outcome in a run.
pub fn outcome_mark(outcome: &NodeOutcome) -> (&'static str, Style) {
  match outcome {
    NodeOutcome::Built | NodeOutcome::Alias { stale: true } => (marks::BUILT, Style::new().green()),
    NodeOutcome::UpToDate | NodeOutcome::Alias { stale: false } => (marks::UP_TO_DATE, Style::new().dimmed()),
    NodeOutcome::Skipped(_) => (marks::SKIPPED, Style::new().yellow()),
    NodeOutcome::Failed(_) => (marks::FAILED, Style::new().red()),
  }
}

/// `  <mark> <node> (<outcome>)`
pub fn print_node(id: impl std::fmt::Display, outcome: &NodeOutcome) {
  let (mark, style) = outcome_mark(outcome);
  println!(
    "  {} {} ({})",
    mark.if_supports_color(Stream::Stdout, |m| m.style(style)),
    id,
    outcome.label()
  );
}

/// `  <mark> <capability>`
pub fn print_capability(capability: impl std::fmt::Display, available: bool) {
  let (mark, style) = if available {
    (marks::AVAILABLE, Style::new().green())
  } else {
    (marks::MISSING, Style::new().red())
  };
  println!(
    "  {} {}",
    mark.if_supports_color(Stream::Stdout, |m| m.style(style)),
    capability
  );
}

/// Wall time of a run. Most incremental runs finish in milliseconds.
pub fn format_elapsed(elapsed: Duration) -> String {
  if elapsed < Duration::from_secs(1) {
    return format!("{}ms", elapsed.as_millis());
  }
  let secs = elapsed.as_secs();
  if secs < 60 {
    format!("{:.2}s", elapsed.as_secs_f64())
  } else {
    format!("{}m {}s", secs / 60, secs % 60)
  }
}

/// A finished target or a passed probe.
pub fn print_done(message: &str) {
  println!(
    "{} {}",
    marks::AVAILABLE.if_supports_color(Stream::Stdout, |m| m.green()),
    message
  );
}

pub fn print_failure(message: &str) {
  eprintln!(
    "{} {}",
    marks::FAILED.if_supports_color(Stream::Stderr, |m| m.red()),
    message.if_supports_color(Stream::Stderr, |m| m.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    marks::WARN.if_supports_color(Stream::Stderr, |m| m.yellow()),
    message.if_supports_color(Stream::Stderr, |m| m.yellow())
  );
}

/// Nothing to do, or a plan header.
pub fn print_note(message: &str) {
  println!(
    "{} {}",
    marks::UP_TO_DATE.if_supports_color(Stream::Stdout, |m| m.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |l| l.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
