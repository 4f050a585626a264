//! # Scenario Configuration
//!
//! YAML description of a deployment plus an ordered list of calls against
//! it. Accounts are named by label (`user1`); the ledger is named
//! `ledger`; extensions by the `name` given in `extensions`. Any address
//! may also be written as a `0x`-prefixed hex literal.
//!
//! ```yaml
//! accounts:
//!   - label: user1
//!     balance: "100 ether"
//! ledger:
//!   admin: deployer
//!   price: "1 ether"
//!   beneficiary: deployer
//! extensions:
//!   - name: pass-sale
//!     owner: deployer
//!     price: "0.0001 ether"
//!     max_per_address: 1
//!     max_per_extension: 100
//!     mint_pass: ledger
//! steps:
//!   - action: start_sale
//!     caller: deployer
//!     extension: pass-sale
//!   - action: extension_mint
//!     caller: user1
//!     extension: pass-sale
//!     quantity: 1
//!     pass: 0
//!     payment: "0.0001 ether"
//!     expect: ok
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mintpass_core::{Address, MintError, ParseAddressError, PaymentPolicy, Wei};
use mintpass_ledger::SUPPLY_LIMIT;

/// The name by which scenarios refer to the deployed ledger.
pub const LEDGER_REF: &str = "ledger";

/// The expectation string for a successful step.
pub const EXPECT_OK: &str = "ok";

/// Errors loading or resolving a scenario.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The scenario file could not be read.
    #[error("failed to read scenario at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The scenario is not valid YAML for this schema.
    #[error("failed to parse scenario YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Two extensions share a name.
    #[error("duplicate extension name {0:?}")]
    DuplicateExtension(String),

    /// A step names an extension that is not declared.
    #[error("unknown extension {0:?}")]
    UnknownExtension(String),

    /// A hex address literal is malformed.
    #[error("invalid address {value:?}: {source}")]
    InvalidAddress {
        value: String,
        source: ParseAddressError,
    },

    /// The ledger's supply cap is above what a ledger can hold.
    #[error("ledger max_supply {max_supply} exceeds the limit of {limit}")]
    SupplyLimit { max_supply: u64, limit: u64 },

    /// A deployment call was rejected.
    #[error("deployment failed at {stage}: {source}")]
    Deploy { stage: String, source: MintError },
}

// ─── Deployment ──────────────────────────────────────────────────────

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Accounts funded before any step.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// The base ledger.
    pub ledger: LedgerSpec,
    /// Sale extensions, deployed in order.
    #[serde(default)]
    pub extensions: Vec<ExtensionSpec>,
    /// Calls to run in order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// An account and its initial payment balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub label: String,
    #[serde(default)]
    pub balance: Wei,
}

/// Ledger deployment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSpec {
    /// Deployer and administrator.
    pub admin: String,
    #[serde(default = "default_ledger_name")]
    pub name: String,
    #[serde(default = "default_ledger_price")]
    pub price: Wei,
    #[serde(default = "default_max_per_mint")]
    pub max_per_mint: u64,
    #[serde(default = "default_max_supply")]
    pub max_supply: u64,
    #[serde(default)]
    pub payment_policy: PaymentPolicy,
    /// Proceeds recipient; the ledger itself when absent.
    #[serde(default)]
    pub beneficiary: Option<String>,
}

fn default_ledger_name() -> String {
    "Template".to_string()
}

fn default_ledger_price() -> Wei {
    Wei::ether(1)
}

fn default_max_per_mint() -> u64 {
    20
}

fn default_max_supply() -> u64 {
    10_000
}

/// Sale extension deployment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionSpec {
    /// Name steps use to address this extension.
    pub name: String,
    /// Deployer and owner.
    pub owner: String,
    pub price: Wei,
    pub max_per_address: u64,
    pub max_per_extension: u64,
    /// Pass ledger: `ledger`, an extension name, an account label or hex.
    #[serde(default = "default_mint_pass")]
    pub mint_pass: String,
    #[serde(default)]
    pub payment_policy: PaymentPolicy,
}

fn default_mint_pass() -> String {
    LEDGER_REF.to_string()
}

// ─── Steps ───────────────────────────────────────────────────────────

/// One call and the outcome it is expected to have.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(flatten)]
    pub step: Step,
    /// `ok`, or the error code the call must fail with.
    #[serde(default = "default_expect")]
    pub expect: String,
}

fn default_expect() -> String {
    EXPECT_OK.to_string()
}

/// A call against the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Credit an account.
    Fund { account: String, amount: Wei },
    /// Toggle the ledger's direct sale.
    FlipSaleStarted { caller: String },
    /// Set the ledger's proceeds recipient.
    SetBeneficiary { caller: String, beneficiary: String },
    /// Register an extension on the ledger.
    AddExtension { caller: String, extension: String },
    /// Deregister an extension.
    RemoveExtension { caller: String, extension: String },
    /// Hand over ledger administration.
    TransferAdmin { caller: String, new_admin: String },
    /// Direct sale on the ledger.
    Mint {
        caller: String,
        quantity: u64,
        payment: Wei,
    },
    /// Open an extension's sale.
    StartSale { caller: String, extension: String },
    UpdatePrice {
        caller: String,
        extension: String,
        price: Wei,
    },
    UpdateMaxPerToken {
        caller: String,
        extension: String,
        cap: u64,
    },
    UpdateMintPassAddress {
        caller: String,
        extension: String,
        mint_pass: String,
    },
    UpdateRemainingTokens {
        caller: String,
        extension: String,
        remaining: u64,
    },
    IncreaseRemainingTokens {
        caller: String,
        extension: String,
        delta: u64,
    },
    UpdatePaymentPolicy {
        caller: String,
        extension: String,
        policy: PaymentPolicy,
    },
    TransferOwnership {
        caller: String,
        extension: String,
        new_owner: String,
    },
    /// Mint through an extension with a pass.
    ExtensionMint {
        caller: String,
        extension: String,
        quantity: u64,
        pass: u64,
        payment: Wei,
    },
}

impl Step {
    /// The snake_case action name.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Fund { .. } => "fund",
            Self::FlipSaleStarted { .. } => "flip_sale_started",
            Self::SetBeneficiary { .. } => "set_beneficiary",
            Self::AddExtension { .. } => "add_extension",
            Self::RemoveExtension { .. } => "remove_extension",
            Self::TransferAdmin { .. } => "transfer_admin",
            Self::Mint { .. } => "mint",
            Self::StartSale { .. } => "start_sale",
            Self::UpdatePrice { .. } => "update_price",
            Self::UpdateMaxPerToken { .. } => "update_max_per_token",
            Self::UpdateMintPassAddress { .. } => "update_mint_pass_address",
            Self::UpdateRemainingTokens { .. } => "update_remaining_tokens",
            Self::IncreaseRemainingTokens { .. } => "increase_remaining_tokens",
            Self::UpdatePaymentPolicy { .. } => "update_payment_policy",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::ExtensionMint { .. } => "extension_mint",
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────

impl ScenarioConfig {
    /// Parse a scenario from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.max_supply > SUPPLY_LIMIT {
            return Err(ConfigError::SupplyLimit {
                max_supply: self.ledger.max_supply,
                limit: SUPPLY_LIMIT,
            });
        }
        let mut seen = std::collections::BTreeSet::new();
        for ext in &self.extensions {
            if ext.name == LEDGER_REF || !seen.insert(ext.name.as_str()) {
                return Err(ConfigError::DuplicateExtension(ext.name.clone()));
            }
        }
        Ok(())
    }
}

/// Resolve an account reference: a hex literal (`0x` or `0X`) or a label.
pub fn resolve_account(reference: &str) -> Result<Address, ConfigError> {
    if reference.starts_with("0x") || reference.starts_with("0X") {
        reference
            .parse::<Address>()
            .map_err(|source| ConfigError::InvalidAddress {
                value: reference.to_string(),
                source,
            })
    } else {
        Ok(Address::from_label(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
ledger:
  admin: deployer
"#;

    #[test]
    fn test_minimal_defaults() {
        let config = ScenarioConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.ledger.name, "Template");
        assert_eq!(config.ledger.price, Wei::ether(1));
        assert_eq!(config.ledger.max_per_mint, 20);
        assert_eq!(config.ledger.max_supply, 10_000);
        assert_eq!(config.ledger.payment_policy, PaymentPolicy::Exact);
        assert!(config.extensions.is_empty());
        assert!(config.steps.is_empty());
    }

    #[test]
    fn test_parse_steps_and_amounts() {
        let yaml = r#"
accounts:
  - label: user1
    balance: "2.5 ether"
ledger:
  admin: deployer
extensions:
  - name: sale
    owner: deployer
    price: "0.0001 ether"
    max_per_address: 1
    max_per_extension: 100
    payment_policy: refund_excess
steps:
  - action: start_sale
    caller: deployer
    extension: sale
  - action: extension_mint
    caller: user1
    extension: sale
    quantity: 1
    pass: 0
    payment: 1000
    expect: CREDENTIAL_INVALID
"#;
        let config = ScenarioConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.accounts[0].balance, Wei(2_500_000_000_000_000_000));
        let ext = &config.extensions[0];
        assert_eq!(ext.price, Wei(100_000_000_000_000));
        assert_eq!(ext.mint_pass, LEDGER_REF);
        assert_eq!(ext.payment_policy, PaymentPolicy::RefundExcess);
        assert_eq!(config.steps[0].expect, EXPECT_OK);
        assert_eq!(config.steps[0].step.action(), "start_sale");
        match &config.steps[1].step {
            Step::ExtensionMint { pass, payment, .. } => {
                assert_eq!(*pass, 0);
                assert_eq!(*payment, Wei(1000));
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(config.steps[1].expect, "CREDENTIAL_INVALID");
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let yaml = r#"
ledger:
  admin: deployer
extensions:
  - { name: a, owner: o, price: 1, max_per_address: 1, max_per_extension: 1 }
  - { name: a, owner: o, price: 1, max_per_address: 1, max_per_extension: 1 }
"#;
        assert!(matches!(
            ScenarioConfig::from_yaml_str(yaml),
            Err(ConfigError::DuplicateExtension(name)) if name == "a"
        ));
    }

    #[test]
    fn test_oversized_supply_rejected() {
        let yaml = r#"
ledger:
  admin: deployer
  max_supply: 18446744073709551615
"#;
        assert!(matches!(
            ScenarioConfig::from_yaml_str(yaml),
            Err(ConfigError::SupplyLimit { limit: SUPPLY_LIMIT, .. })
        ));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = r#"
ledger:
  admin: deployer
steps:
  - action: burn
    caller: deployer
"#;
        assert!(matches!(
            ScenarioConfig::from_yaml_str(yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_resolve_account() {
        assert_eq!(resolve_account("user1").unwrap(), Address::from_label("user1"));
        let hex = Address::from_label("x").to_hex();
        assert_eq!(resolve_account(&hex).unwrap(), Address::from_label("x"));
        assert!(matches!(
            resolve_account("0xzz"),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_resolve_account_uppercase_prefix_is_hex() {
        let address = Address::from_label("x");
        let upper = format!("0X{}", &address.to_hex()[2..]);
        assert_eq!(resolve_account(&upper).unwrap(), address);
        assert!(matches!(
            resolve_account("0Xzz"),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScenarioConfig::load(Path::new("/nonexistent/scenario.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
