//! Command-line interface
//!
//! Argument parsing for the `tracescope` binary.

pub mod args;

pub use args::{parse_tracepoint, Args};
