//! # `mintpass run`
//!
//! Deploys a scenario into a fresh runtime and replays its steps, printing
//! one line per step:
//!
//! ```text
//! [  0] ok   start_sale                 sale active
//! [  1] err  extension_mint             CREDENTIAL_INVALID: caller ... does not hold ...
//! ```
//!
//! A step whose outcome differs from its `expect` is marked `MISMATCH`.
//! Exit code 0 when every step matched, 1 otherwise.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mintpass_runtime::{Scenario, ScenarioConfig, StepReport};

/// Arguments for `mintpass run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario YAML file.
    pub scenario: PathBuf,

    /// Write the final runtime state as JSON.
    #[arg(long)]
    pub state_out: Option<PathBuf>,

    /// Run every step even after a mismatch.
    #[arg(long)]
    pub keep_going: bool,
}

/// Execute `mintpass run`.
pub fn run_scenario(args: &RunArgs) -> Result<u8> {
    let config = ScenarioConfig::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;
    tracing::info!(
        scenario = %args.scenario.display(),
        extensions = config.extensions.len(),
        steps = config.steps.len(),
        "scenario loaded"
    );

    let mut scenario = Scenario::deploy(&config).context("deploying scenario")?;
    let report = scenario
        .run(&config.steps, args.keep_going)
        .context("running scenario")?;

    for step in &report.steps {
        println!("{}", format_step(step));
    }

    if let Some(path) = &args.state_out {
        let json = scenario
            .runtime()
            .to_json()
            .context("serializing runtime state")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing state to {}", path.display()))?;
        tracing::info!(path = %path.display(), "state written");
    }

    let mismatched = report.mismatches().count();
    let skipped = config.steps.len() - report.steps.len();
    if mismatched == 0 {
        println!("{} step(s) matched", report.steps.len());
        Ok(0)
    } else {
        println!("{mismatched} step(s) mismatched, {skipped} not run");
        Ok(1)
    }
}

/// One report line for a step.
pub fn format_step(step: &StepReport) -> String {
    let line = match &step.result {
        Ok(summary) => format!("[{:>3}] ok   {:<26} {summary}", step.index, step.action),
        Err(err) => format!(
            "[{:>3}] err  {:<26} {}: {err}",
            step.index,
            step.action,
            err.code()
        ),
    };
    if step.matched() {
        line
    } else {
        format!("{line}  MISMATCH (expected {})", step.expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintpass_core::MintError;
    use mintpass_runtime::Runtime;

    const SCENARIO: &str = r#"
accounts:
  - { label: user1, balance: "5 ether" }
ledger:
  admin: deployer
extensions:
  - { name: sale, owner: deployer, price: 10, max_per_address: 1, max_per_extension: 5 }
steps:
  - { action: flip_sale_started, caller: deployer }
  - { action: mint, caller: user1, quantity: 1, payment: "1 ether" }
  - { action: start_sale, caller: deployer, extension: sale }
  - { action: add_extension, caller: deployer, extension: sale }
  - { action: extension_mint, caller: user1, extension: sale, quantity: 1, pass: 0, payment: 10 }
  - { action: extension_mint, caller: user1, extension: sale, quantity: 1, pass: 0, payment: 10, expect: PER_ADDRESS_CAP_EXCEEDED }
"#;

    fn write_scenario(dir: &tempfile::TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join("scenario.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_run_writes_state() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = write_scenario(&dir, SCENARIO);
        let state_out = dir.path().join("state.json");
        let args = RunArgs {
            scenario,
            state_out: Some(state_out.clone()),
            keep_going: false,
        };
        assert_eq!(run_scenario(&args).unwrap(), 0);

        let json = std::fs::read_to_string(&state_out).unwrap();
        let runtime = Runtime::from_json(&json).unwrap();
        let ledger = runtime.ledgers().next().unwrap();
        assert_eq!(ledger.total_supply(), 2);
        assert_eq!(runtime.redemptions().len(), 1);
    }

    #[test]
    fn test_mismatch_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = SCENARIO.replace("expect: PER_ADDRESS_CAP_EXCEEDED", "expect: ok");
        let args = RunArgs {
            scenario: write_scenario(&dir, &yaml),
            state_out: None,
            keep_going: true,
        };
        assert_eq!(run_scenario(&args).unwrap(), 1);
    }

    #[test]
    fn test_missing_scenario_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            scenario: dir.path().join("absent.yaml"),
            state_out: None,
            keep_going: false,
        };
        let err = run_scenario(&args).unwrap_err();
        assert!(format!("{err:#}").contains("loading scenario"));
    }

    #[test]
    fn test_format_step_marks_mismatch() {
        let step = StepReport {
            index: 4,
            action: "extension_mint",
            result: Err(MintError::SaleNotStarted),
            expected: "ok".to_string(),
        };
        let line = format_step(&step);
        assert!(line.starts_with("[  4] err  extension_mint"));
        assert!(line.contains("SALE_NOT_STARTED"));
        assert!(line.ends_with("MISMATCH (expected ok)"));
    }
}
