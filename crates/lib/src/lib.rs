//! bakery-lib: build graph, toolchain probe and packaging for Bakery
//!
//! This crate provides the pieces behind the `bake` command:
//! - `probe`: fail-fast checks for the compiler, libraries, headers and functions
//! - `graph`: the file/alias dependency graph and its incremental evaluator
//! - `install`: copy nodes mapping built artifacts to install directories
//! - `package`: staging, installed size, control descriptor and archive nodes
//! - `pipeline`: ties a loaded project to all of the above

pub mod config;
pub mod graph;
pub mod install;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod probe;
pub mod process;
