//! # `mintpass inspect`
//!
//! Prints a summary of a runtime state file: every ledger, every sale
//! extension with its policy, and the redemption count.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mintpass_core::Address;
use mintpass_runtime::Runtime;

/// Arguments for `mintpass inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// State JSON written by `mintpass run --state-out`.
    pub state: PathBuf,
}

/// Execute `mintpass inspect`.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let json = std::fs::read_to_string(&args.state)
        .with_context(|| format!("reading state {}", args.state.display()))?;
    let runtime = Runtime::from_json(&json)
        .with_context(|| format!("parsing state {}", args.state.display()))?;
    for line in summarize(&runtime) {
        println!("{line}");
    }
    Ok(0)
}

/// Summary lines for a runtime.
pub fn summarize(runtime: &Runtime) -> Vec<String> {
    let mut lines = Vec::new();
    for ledger in runtime.ledgers() {
        let config = ledger.config();
        lines.push(format!(
            "ledger {} {:?}: supply {}/{}, sale {}, price {}, admin {}, proceeds to {}, {} extension(s)",
            ledger.address(),
            config.name,
            ledger.total_supply(),
            config.max_supply,
            if ledger.sale_started() { "open" } else { "closed" },
            config.price,
            ledger.admin(),
            ledger.proceeds_recipient(),
            ledger.extensions().len(),
        ));
    }
    for ext in runtime.extensions() {
        let registered = runtime
            .ledger(&ext.ledger())
            .map(|l| l.is_extension_allowed(&ext.address()))
            .unwrap_or(false);
        lines.push(format!(
            "extension {} -> {}: {}{}, price {} ({}), remaining {}, cap {}, mint pass {}",
            ext.address(),
            ext.ledger(),
            if ext.sale_active() { "active" } else { "inactive" },
            if registered { "" } else { " (unregistered)" },
            ext.price(),
            ext.payment_policy(),
            ext.n_remaining_tokens(),
            ext.max_per_token(),
            describe_pass_ledger(runtime, &ext.mint_pass_address()),
        ));
    }
    lines.push(format!("redeemed passes: {}", runtime.redemptions().len()));
    lines
}

fn describe_pass_ledger(runtime: &Runtime, address: &Address) -> String {
    if runtime.ledger(address).is_ok() {
        address.to_string()
    } else {
        format!("{address} (no ledger)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintpass_runtime::{Scenario, ScenarioConfig};

    const DEPLOYMENT: &str = r#"
ledger:
  admin: deployer
extensions:
  - { name: sale, owner: deployer, price: 7, max_per_address: 2, max_per_extension: 9, payment_policy: refund_excess }
  - { name: orphan, owner: deployer, price: 1, max_per_address: 1, max_per_extension: 1, mint_pass: somebody }
steps:
  - { action: add_extension, caller: deployer, extension: sale }
"#;

    fn make_runtime() -> Runtime {
        let config = ScenarioConfig::from_yaml_str(DEPLOYMENT).unwrap();
        let mut scenario = Scenario::deploy(&config).unwrap();
        assert!(scenario.run(&config.steps, false).unwrap().passed());
        scenario.into_runtime()
    }

    #[test]
    fn test_summary_lists_components() {
        let lines = summarize(&make_runtime());
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ledger 0x"));
        assert!(lines[0].contains("supply 0/10000"));
        assert!(lines[0].contains("1 extension(s)"));

        let sale = lines.iter().find(|l| l.contains("price 7 wei")).unwrap();
        assert!(sale.contains("REFUND_EXCESS"));
        assert!(sale.contains(": inactive,"));
        let orphan = lines.iter().find(|l| l.contains("(no ledger)")).unwrap();
        assert!(orphan.contains("inactive (unregistered)"));
        assert_eq!(lines[3], "redeemed passes: 0");
    }

    #[test]
    fn test_inspect_reads_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, make_runtime().to_json().unwrap()).unwrap();
        assert_eq!(run_inspect(&InspectArgs { state: path }).unwrap(), 0);
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let err = run_inspect(&InspectArgs { state: path }).unwrap_err();
        assert!(format!("{err:#}").contains("parsing state"));
    }
}
