//! # Scenario Runner
//!
//! Deploys a [`ScenarioConfig`] into a fresh [`Runtime`] and replays its
//! steps, comparing each outcome with the step's expectation.
//!
//! A rejected call is an ordinary outcome, not a runner error: a step that
//! expects `CREDENTIAL_INVALID` and gets it has passed. Runner errors are
//! reserved for references the scenario cannot resolve.

use std::collections::BTreeMap;

use mintpass_core::{Address, MintError, PassId};
use mintpass_ledger::LedgerConfig;
use mintpass_sale::{MintRequest, SaleConfig};

use crate::config::{resolve_account, ConfigError, ScenarioConfig, Step, StepConfig, EXPECT_OK, LEDGER_REF};
use crate::runtime::Runtime;

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Zero-based position in the scenario.
    pub index: usize,
    /// Action name.
    pub action: &'static str,
    /// Summary on success, the rejection otherwise.
    pub result: Result<String, MintError>,
    /// What the scenario expected.
    pub expected: String,
}

impl StepReport {
    /// Whether the outcome matches the expectation.
    pub fn matched(&self) -> bool {
        match &self.result {
            Ok(_) => self.expected == EXPECT_OK,
            Err(err) => self.expected == err.code(),
        }
    }

    /// `ok` or the error code.
    pub fn outcome(&self) -> &str {
        match &self.result {
            Ok(_) => EXPECT_OK,
            Err(err) => err.code(),
        }
    }
}

/// Outcomes of every step that ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
}

impl ScenarioReport {
    /// Whether every step that ran met its expectation.
    pub fn passed(&self) -> bool {
        self.steps.iter().all(StepReport::matched)
    }

    /// Steps whose outcome differed from the expectation.
    pub fn mismatches(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|step| !step.matched())
    }
}

/// A deployed scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    runtime: Runtime,
    ledger: Address,
    extensions: BTreeMap<String, Address>,
}

impl Scenario {
    /// Fund accounts and deploy the ledger and extensions.
    pub fn deploy(config: &ScenarioConfig) -> Result<Self, ConfigError> {
        let mut runtime = Runtime::new();
        for account in &config.accounts {
            let address = resolve_account(&account.label)?;
            runtime
                .fund(address, account.balance)
                .map_err(|source| ConfigError::Deploy {
                    stage: format!("funding {}", account.label),
                    source,
                })?;
        }

        let params = &config.ledger;
        let admin = resolve_account(&params.admin)?;
        let ledger = runtime.deploy_ledger(
            admin,
            LedgerConfig {
                name: params.name.clone(),
                price: params.price,
                max_per_mint: params.max_per_mint,
                max_supply: params.max_supply,
                payment_policy: params.payment_policy,
            },
        );
        if let Some(beneficiary) = &params.beneficiary {
            let beneficiary = resolve_account(beneficiary)?;
            runtime
                .update_ledger(&ledger, |l| l.set_beneficiary(&admin, beneficiary))
                .map_err(|source| ConfigError::Deploy {
                    stage: "beneficiary".to_string(),
                    source,
                })?;
        }

        let mut scenario = Self {
            runtime,
            ledger,
            extensions: BTreeMap::new(),
        };
        for ext in &config.extensions {
            let owner = resolve_account(&ext.owner)?;
            let mint_pass = scenario.resolve_contract(&ext.mint_pass)?;
            let address = scenario.runtime.deploy_extension(
                owner,
                SaleConfig {
                    ledger,
                    mint_pass,
                    price: ext.price,
                    max_per_address: ext.max_per_address,
                    max_per_extension: ext.max_per_extension,
                    payment_policy: ext.payment_policy,
                },
            );
            scenario.extensions.insert(ext.name.clone(), address);
        }
        Ok(scenario)
    }

    /// The runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Consume the scenario, keeping its runtime.
    pub fn into_runtime(self) -> Runtime {
        self.runtime
    }

    /// Address of the deployed ledger.
    pub fn ledger(&self) -> Address {
        self.ledger
    }

    /// Address of a named extension.
    pub fn extension(&self, name: &str) -> Result<Address, ConfigError> {
        self.extensions
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownExtension(name.to_string()))
    }

    /// Run steps in order.
    ///
    /// Stops after the first step that misses its expectation unless
    /// `keep_going` is set.
    pub fn run(&mut self, steps: &[StepConfig], keep_going: bool) -> Result<ScenarioReport, ConfigError> {
        let mut report = ScenarioReport::default();
        for (index, config) in steps.iter().enumerate() {
            let result = self.apply(&config.step)?;
            let step = StepReport {
                index,
                action: config.step.action(),
                result,
                expected: config.expect.clone(),
            };
            let matched = step.matched();
            if matched {
                tracing::debug!(index, action = step.action, outcome = step.outcome(), "step matched");
            } else {
                tracing::error!(
                    index,
                    action = step.action,
                    outcome = step.outcome(),
                    expected = %step.expected,
                    "step did not match expectation"
                );
            }
            report.steps.push(step);
            if !matched && !keep_going {
                break;
            }
        }
        Ok(report)
    }

    /// Apply one step.
    ///
    /// The inner result is the call's own outcome.
    pub fn apply(&mut self, step: &Step) -> Result<Result<String, MintError>, ConfigError> {
        let ledger = self.ledger;
        let outcome = match step {
            Step::Fund { account, amount } => {
                let account = resolve_account(account)?;
                self.runtime
                    .fund(account, *amount)
                    .map(|balance| format!("balance {balance}"))
            }
            Step::FlipSaleStarted { caller } => {
                let caller = resolve_account(caller)?;
                self.runtime
                    .update_ledger(&ledger, |l| l.flip_sale_started(&caller))
                    .map(|started| format!("sale started: {started}"))
            }
            Step::SetBeneficiary { caller, beneficiary } => {
                let caller = resolve_account(caller)?;
                let beneficiary = resolve_account(beneficiary)?;
                self.runtime
                    .update_ledger(&ledger, |l| l.set_beneficiary(&caller, beneficiary))
                    .map(|()| format!("beneficiary {beneficiary}"))
            }
            Step::AddExtension { caller, extension } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_ledger(&ledger, |l| l.add_extension(&caller, extension))
                    .map(|()| format!("registered {extension}"))
            }
            Step::RemoveExtension { caller, extension } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_ledger(&ledger, |l| l.remove_extension(&caller, &extension))
                    .map(|()| format!("deregistered {extension}"))
            }
            Step::TransferAdmin { caller, new_admin } => {
                let caller = resolve_account(caller)?;
                let new_admin = resolve_account(new_admin)?;
                self.runtime
                    .update_ledger(&ledger, |l| l.transfer_admin(&caller, new_admin))
                    .map(|()| format!("admin {new_admin}"))
            }
            Step::Mint {
                caller,
                quantity,
                payment,
            } => {
                let caller = resolve_account(caller)?;
                self.runtime
                    .mint_direct(&ledger, &caller, *quantity, *payment)
                    .map(|tokens| format!("minted {} token(s)", tokens.len()))
            }
            Step::StartSale { caller, extension } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_extension(&extension, |e| e.start_sale(&caller))
                    .map(|()| "sale active".to_string())
            }
            Step::UpdatePrice {
                caller,
                extension,
                price,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_extension(&extension, |e| e.update_price(&caller, *price))
                    .map(|()| format!("price {price}"))
            }
            Step::UpdateMaxPerToken {
                caller,
                extension,
                cap,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_extension(&extension, |e| e.update_max_per_token(&caller, *cap))
                    .map(|()| format!("cap {cap}"))
            }
            Step::UpdateMintPassAddress {
                caller,
                extension,
                mint_pass,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                let mint_pass = self.resolve_contract(mint_pass)?;
                self.runtime
                    .update_extension(&extension, |e| e.update_mint_pass_address(&caller, mint_pass))
                    .map(|()| format!("mint pass {mint_pass}"))
            }
            Step::UpdateRemainingTokens {
                caller,
                extension,
                remaining,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_extension(&extension, |e| e.update_remaining_tokens(&caller, *remaining))
                    .map(|()| format!("remaining {remaining}"))
            }
            Step::IncreaseRemainingTokens {
                caller,
                extension,
                delta,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_extension(&extension, |e| e.increase_remaining_tokens(&caller, *delta))
                    .map(|remaining| format!("remaining {remaining}"))
            }
            Step::UpdatePaymentPolicy {
                caller,
                extension,
                policy,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                self.runtime
                    .update_extension(&extension, |e| e.update_payment_policy(&caller, *policy))
                    .map(|()| format!("policy {policy}"))
            }
            Step::TransferOwnership {
                caller,
                extension,
                new_owner,
            } => {
                let caller = resolve_account(caller)?;
                let extension = self.extension(extension)?;
                let new_owner = resolve_account(new_owner)?;
                self.runtime
                    .update_extension(&extension, |e| e.transfer_ownership(&caller, new_owner))
                    .map(|()| format!("owner {new_owner}"))
            }
            Step::ExtensionMint {
                caller,
                extension,
                quantity,
                pass,
                payment,
            } => {
                let request = MintRequest {
                    caller: resolve_account(caller)?,
                    quantity: *quantity,
                    pass: PassId(*pass),
                    payment: *payment,
                };
                let extension = self.extension(extension)?;
                self.runtime
                    .mint_via_sale(&extension, &request)
                    .map(|receipt| {
                        format!(
                            "minted {} token(s), charged {}",
                            receipt.tokens.len(),
                            receipt.charged
                        )
                    })
            }
        };
        Ok(outcome)
    }

    /// Resolve a contract reference: the ledger, a named extension, or an
    /// account reference.
    fn resolve_contract(&self, reference: &str) -> Result<Address, ConfigError> {
        if reference == LEDGER_REF {
            return Ok(self.ledger);
        }
        match self.extensions.get(reference) {
            Some(address) => Ok(*address),
            None => resolve_account(reference),
        }
    }
}
