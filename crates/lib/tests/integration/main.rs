//! Integration tests driving the full pipeline against fake toolchains.

mod common;
mod package_tests;
mod probe_tests;
mod rebuild_tests;
