//! # mintpass-cli: Mint Pass Command-Line Interface
//!
//! ## Subcommands
//!
//! - `run`: deploy a YAML scenario, replay its steps and report each
//!   outcome against its expectation
//! - `inspect`: summarize a runtime state file written by `run --state-out`
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; behavior lives in `mintpass-runtime`.
//! - Handlers return an exit code; errors propagate as `anyhow::Error`.

pub mod inspect;
pub mod run;
