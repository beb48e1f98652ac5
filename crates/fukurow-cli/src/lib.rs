//! Command-line test harness for the Fukurow SPARQL engine.
//!
//! `run` executes a query (optionally against a loaded dataset) and prints
//! its result; `check` parses a query without running it, useful as a
//! scriptable conformance check.

pub mod commands;
pub mod dataset;
pub mod interactive;

pub use commands::{Cli, Command, OutputFormat};
