//! # Runtime Host
//!
//! Hosts every deployed ledger and sale extension, the payment bank and
//! the global redemption book. Each call takes `&mut Runtime` and runs to
//! completion before the next one starts, which is what makes every call
//! indivisible relative to the others. [`crate::SharedRuntime`] extends
//! that guarantee across threads.
//!
//! The runtime resolves addresses to components and hands each component
//! exactly the state it needs for one call. Components never hold
//! references to one another between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mintpass_core::{Address, MintError, MintResult, PassId, TokenId, Wei};
use mintpass_ledger::{Bank, Ledger, LedgerConfig};
use mintpass_sale::{MintReceipt, MintRequest, PassSource, RedemptionBook, SaleConfig, SaleExtension};

/// All deployed contracts and the state shared between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    ledgers: BTreeMap<Address, Ledger>,
    extensions: BTreeMap<Address, SaleExtension>,
    bank: Bank,
    redemptions: RedemptionBook,
    nonces: BTreeMap<Address, u64>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Deployment ──────────────────────────────────────────────────

    /// Deploy a ledger administered by `deployer`.
    pub fn deploy_ledger(&mut self, deployer: Address, config: LedgerConfig) -> Address {
        let address = self.next_address(deployer);
        tracing::info!(%address, %deployer, name = %config.name, "ledger deployed");
        self.ledgers
            .insert(address, Ledger::new(address, deployer, config));
        address
    }

    /// Deploy a sale extension owned by `deployer`.
    ///
    /// The target ledger does not have to exist yet; mints fail with
    /// `UnknownContract` until it does.
    pub fn deploy_extension(&mut self, deployer: Address, config: SaleConfig) -> Address {
        let address = self.next_address(deployer);
        tracing::info!(
            %address,
            %deployer,
            ledger = %config.ledger,
            mint_pass = %config.mint_pass,
            "sale extension deployed"
        );
        self.extensions
            .insert(address, SaleExtension::new(address, deployer, config));
        address
    }

    fn next_address(&mut self, deployer: Address) -> Address {
        let nonce = self.nonces.entry(deployer).or_insert(0);
        let address = Address::derive_contract(&deployer, *nonce);
        *nonce += 1;
        address
    }

    // ─── Reads ───────────────────────────────────────────────────────

    /// Look up a ledger.
    pub fn ledger(&self, address: &Address) -> MintResult<&Ledger> {
        self.ledgers.get(address).ok_or(MintError::UnknownContract {
            kind: "ledger",
            address: *address,
        })
    }

    /// Look up a sale extension.
    pub fn extension(&self, address: &Address) -> MintResult<&SaleExtension> {
        self.extensions.get(address).ok_or(MintError::UnknownContract {
            kind: "sale extension",
            address: *address,
        })
    }

    /// All ledgers, in address order.
    pub fn ledgers(&self) -> impl Iterator<Item = &Ledger> {
        self.ledgers.values()
    }

    /// All sale extensions, in address order.
    pub fn extensions(&self) -> impl Iterator<Item = &SaleExtension> {
        self.extensions.values()
    }

    /// The payment bank.
    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    /// Payment balance of an account.
    pub fn balance(&self, account: &Address) -> Wei {
        self.bank.balance_of(account)
    }

    /// The global redemption book.
    pub fn redemptions(&self) -> &RedemptionBook {
        &self.redemptions
    }

    /// Whether `pass` on `pass_ledger` has been redeemed.
    pub fn is_redeemed(&self, pass_ledger: &Address, pass: PassId) -> bool {
        self.redemptions.is_redeemed(pass_ledger, pass)
    }

    /// The full state as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Restore state written by [`Runtime::to_json`].
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    // ─── Administration ──────────────────────────────────────────────

    /// Credit an account with new funds.
    pub fn fund(&mut self, account: Address, amount: Wei) -> MintResult<Wei> {
        let balance = self.bank.fund(account, amount)?;
        tracing::debug!(%account, %amount, %balance, "account funded");
        Ok(balance)
    }

    /// Run a ledger operation against the ledger at `address`.
    ///
    /// The closure sees the ledger alone; its result is returned as-is.
    pub fn update_ledger<R>(
        &mut self,
        address: &Address,
        f: impl FnOnce(&mut Ledger) -> MintResult<R>,
    ) -> MintResult<R> {
        let ledger = self
            .ledgers
            .get_mut(address)
            .ok_or(MintError::UnknownContract {
                kind: "ledger",
                address: *address,
            })?;
        f(ledger)
    }

    /// Run an extension operation against the extension at `address`.
    pub fn update_extension<R>(
        &mut self,
        address: &Address,
        f: impl FnOnce(&mut SaleExtension) -> MintResult<R>,
    ) -> MintResult<R> {
        let extension = self
            .extensions
            .get_mut(address)
            .ok_or(MintError::UnknownContract {
                kind: "sale extension",
                address: *address,
            })?;
        f(extension)
    }

    // ─── Mint Paths ──────────────────────────────────────────────────

    /// Direct sale on a ledger.
    pub fn mint_direct(
        &mut self,
        ledger: &Address,
        caller: &Address,
        quantity: u64,
        payment: Wei,
    ) -> MintResult<Vec<TokenId>> {
        let target = self
            .ledgers
            .get_mut(ledger)
            .ok_or(MintError::UnknownContract {
                kind: "ledger",
                address: *ledger,
            })?;
        let result = target.mint(&mut self.bank, caller, quantity, payment);
        if let Err(err) = &result {
            tracing::warn!(%ledger, %caller, quantity, code = err.code(), "direct mint rejected: {err}");
        }
        result
    }

    /// Mint through a sale extension.
    ///
    /// Validates against a read-only view of every component, then
    /// executes. A rejected mint leaves the runtime unchanged.
    pub fn mint_via_sale(
        &mut self,
        extension: &Address,
        request: &MintRequest,
    ) -> MintResult<MintReceipt> {
        let result = self.prepare_and_execute(extension, request);
        match &result {
            Ok(receipt) => tracing::info!(
                %extension,
                caller = %receipt.caller,
                pass = %receipt.pass,
                minted = receipt.tokens.len(),
                "extension mint"
            ),
            Err(err) => tracing::warn!(
                %extension,
                caller = %request.caller,
                pass = %request.pass,
                quantity = request.quantity,
                code = err.code(),
                "extension mint rejected: {err}"
            ),
        }
        result
    }

    fn prepare_and_execute(
        &mut self,
        extension: &Address,
        request: &MintRequest,
    ) -> MintResult<MintReceipt> {
        let sale = self.extension(extension)?;
        let target_address = sale.ledger();
        let pass_address = sale.mint_pass_address();
        let target = self.ledger(&target_address)?;
        let passes = if pass_address == target_address {
            PassSource::TargetLedger
        } else {
            match self.ledgers.get(&pass_address) {
                Some(ledger) => PassSource::External(ledger),
                None => PassSource::Missing,
            }
        };
        let plan = sale.prepare(request, target, passes, &self.bank, &self.redemptions)?;

        let sale = self
            .extensions
            .get_mut(extension)
            .ok_or(MintError::UnknownContract {
                kind: "sale extension",
                address: *extension,
            })?;
        let target = self
            .ledgers
            .get_mut(&target_address)
            .ok_or(MintError::UnknownContract {
                kind: "ledger",
                address: target_address,
            })?;
        sale.execute(plan, target, &mut self.bank, &mut self.redemptions)
    }
}
