//! Implementation of the `bake plan` command.
//!
//! Populates the build graph and prints the evaluation waves for a target
//! without running any producer.

use anyhow::{Context, Result};

use super::GlobalOptions;
use crate::output::{marks, print_json, print_note};

pub fn cmd_plan(opts: &GlobalOptions, target: &str) -> Result<()> {
  let pipeline = opts.load_pipeline()?;
  let waves = pipeline
    .plan(target)
    .with_context(|| format!("Failed to plan target '{}'", target))?;

  if opts.output.is_json() {
    return print_json(&waves);
  }

  let nodes: usize = waves.iter().map(Vec::len).sum();
  print_note(&format!("Plan for '{}': {} node(s) in {} wave(s)", target, nodes, waves.len()));

  for (i, wave) in waves.iter().enumerate() {
    println!();
    println!("Wave {}:", i + 1);
    for node in wave {
      match &node.producer {
        Some(producer) => println!("  {} {} ({})", marks::PRODUCES, node.id, producer),
        None => println!("  {} {} [{}]", marks::LEAF, node.id, node.kind.name()),
      }
      if opts.verbose && !node.dependencies.is_empty() {
        for dep in &node.dependencies {
          println!("      {} {}", marks::NEEDS, dep);
        }
      }
    }
  }

  Ok(())
}
