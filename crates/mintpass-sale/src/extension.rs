//! # Mint Pass Sale Extension
//!
//! A sale extension mints into a target ledger under its own policy:
//! price, per-address cap, remaining-token counter, and a mint pass
//! requirement checked against a pass ledger.
//!
//! ## Sale State
//!
//! ```text
//! INACTIVE ──start_sale()──▶ ACTIVE
//! ```
//!
//! One-way. There is no path back to inactive; `start_sale` on an active
//! sale is a no-op.
//!
//! ## Mint: Prepare, Then Execute
//!
//! [`SaleExtension::prepare`] is read-only. It runs every precondition in
//! a fixed order, each failing fast with its own error:
//!
//! 1. sale active (`SaleNotStarted`)
//! 2. quantity ≥ 1 (`ZeroQuantity`)
//! 3. payment settles against `price × quantity` (`IncorrectPayment`)
//! 4. `remaining_tokens ≥ quantity` (`SupplyExhausted`)
//! 5. `minted_by(caller) + quantity ≤ max_per_token` (`PerAddressCapExceeded`)
//! 6. pass unredeemed, whoever presents it (`CredentialAlreadyRedeemed`),
//!    then held by the caller (`CredentialInvalid`)
//! 7. caller can cover the payment (`InsufficientFunds`)
//!
//! and returns a [`MintPlan`] holding every value the effects will write.
//!
//! [`SaleExtension::execute`] forwards the mint to the ledger first. That
//! is the only fallible step; if the ledger rejects it (for example the
//! extension was deregistered) nothing else has been written. Afterwards
//! the pass is redeemed, the counters are set from the plan and the
//! payment moves to the ledger's proceeds recipient, all infallibly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mintpass_core::{Address, MintError, MintResult, PassId, PaymentPolicy, TokenId, Wei};
use mintpass_ledger::{Bank, Ledger, PreparedTransfer};

use crate::verifier::{CredentialVerifier, PassLedger, RedemptionBook, VerifiedPass};

// ─── Configuration ───────────────────────────────────────────────────

/// Deployment parameters of a sale extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Ledger the extension mints into.
    pub ledger: Address,
    /// Ledger on which mint passes are held.
    pub mint_pass: Address,
    /// Price per unit.
    pub price: Wei,
    /// Cap on cumulative units per caller.
    pub max_per_address: u64,
    /// Initial remaining-token counter.
    pub max_per_extension: u64,
    /// How attached payments are settled.
    #[serde(default)]
    pub payment_policy: PaymentPolicy,
}

// ─── Requests and Receipts ───────────────────────────────────────────

/// An end-user mint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// The caller; receives the tokens and pays.
    pub caller: Address,
    /// Units requested.
    pub quantity: u64,
    /// Mint pass presented.
    pub pass: PassId,
    /// Payment attached to the call.
    pub payment: Wei,
}

/// Where the pass ledger for a mint lives.
#[derive(Clone, Copy)]
pub enum PassSource<'a> {
    /// Passes are tokens on the target ledger itself.
    TargetLedger,
    /// Passes live on another contract.
    External(&'a dyn PassLedger),
    /// Nothing is deployed at the configured pass address.
    Missing,
}

/// A validated mint, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a mint plan changes nothing until executed"]
pub struct MintPlan {
    request: MintRequest,
    verified: VerifiedPass,
    transfer: PreparedTransfer,
    remaining_after: u64,
    minted_after: u64,
}

impl MintPlan {
    /// The request this plan executes.
    pub fn request(&self) -> &MintRequest {
        &self.request
    }

    /// Amount that will be captured from the caller.
    pub fn charge(&self) -> Wei {
        self.transfer.amount
    }
}

/// Outcome of a successful extension mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Extension that minted.
    pub extension: Address,
    /// Recipient of the tokens.
    pub caller: Address,
    /// Pass redeemed.
    pub pass: PassId,
    /// Token ids minted on the target ledger.
    pub tokens: Vec<TokenId>,
    /// Amount captured from the caller.
    pub charged: Wei,
    /// Recipient of the payment.
    pub paid_to: Address,
}

// ─── Sale Extension ──────────────────────────────────────────────────

/// A mint pass sale extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleExtension {
    address: Address,
    owner: Address,
    ledger: Address,
    price: Wei,
    max_per_address: u64,
    remaining_tokens: u64,
    minted_by_address: BTreeMap<Address, u64>,
    mint_pass_address: Address,
    sale_active: bool,
    payment_policy: PaymentPolicy,
}

impl SaleExtension {
    /// Deploy an inactive extension owned by `owner`.
    pub fn new(address: Address, owner: Address, config: SaleConfig) -> Self {
        Self {
            address,
            owner,
            ledger: config.ledger,
            price: config.price,
            max_per_address: config.max_per_address,
            remaining_tokens: config.max_per_extension,
            minted_by_address: BTreeMap::new(),
            mint_pass_address: config.mint_pass,
            sale_active: false,
            payment_policy: config.payment_policy,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// This extension's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Owner address.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Target ledger address.
    pub fn ledger(&self) -> Address {
        self.ledger
    }

    /// Price per unit.
    pub fn price(&self) -> Wei {
        self.price
    }

    /// Per-address cap on cumulative units.
    pub fn max_per_token(&self) -> u64 {
        self.max_per_address
    }

    /// Pass ledger address.
    pub fn mint_pass_address(&self) -> Address {
        self.mint_pass_address
    }

    /// Units this extension may still mint.
    pub fn n_remaining_tokens(&self) -> u64 {
        self.remaining_tokens
    }

    /// Units minted by `caller` through this extension.
    pub fn minted_by(&self, caller: &Address) -> u64 {
        self.minted_by_address.get(caller).copied().unwrap_or(0)
    }

    /// Whether the sale is active.
    pub fn sale_active(&self) -> bool {
        self.sale_active
    }

    /// Payment settlement policy.
    pub fn payment_policy(&self) -> PaymentPolicy {
        self.payment_policy
    }

    // ── Administration ───────────────────────────────────────────────

    /// Replace the unit price.
    pub fn update_price(&mut self, caller: &Address, price: Wei) -> MintResult<()> {
        self.require_owner(caller, "update the price")?;
        self.price = price;
        tracing::info!(extension = %self.address, %price, "price updated");
        Ok(())
    }

    /// Replace the per-address cap.
    pub fn update_max_per_token(&mut self, caller: &Address, cap: u64) -> MintResult<()> {
        self.require_owner(caller, "update the per-address cap")?;
        self.max_per_address = cap;
        tracing::info!(extension = %self.address, cap, "per-address cap updated");
        Ok(())
    }

    /// Point the extension at another pass ledger.
    pub fn update_mint_pass_address(&mut self, caller: &Address, pass_ledger: Address) -> MintResult<()> {
        self.require_owner(caller, "update the mint pass address")?;
        self.mint_pass_address = pass_ledger;
        tracing::info!(extension = %self.address, %pass_ledger, "mint pass address updated");
        Ok(())
    }

    /// Overwrite the remaining-token counter.
    pub fn update_remaining_tokens(&mut self, caller: &Address, remaining: u64) -> MintResult<()> {
        self.require_owner(caller, "update the remaining tokens")?;
        self.remaining_tokens = remaining;
        tracing::info!(extension = %self.address, remaining, "remaining tokens set");
        Ok(())
    }

    /// Add to the remaining-token counter.
    pub fn increase_remaining_tokens(&mut self, caller: &Address, delta: u64) -> MintResult<u64> {
        self.require_owner(caller, "increase the remaining tokens")?;
        self.remaining_tokens = self
            .remaining_tokens
            .checked_add(delta)
            .ok_or(MintError::ArithmeticOverflow("remaining tokens"))?;
        tracing::info!(extension = %self.address, delta, remaining = self.remaining_tokens, "remaining tokens increased");
        Ok(self.remaining_tokens)
    }

    /// Open the sale. One-way.
    pub fn start_sale(&mut self, caller: &Address) -> MintResult<()> {
        self.require_owner(caller, "start the sale")?;
        if !self.sale_active {
            self.sale_active = true;
            tracing::info!(extension = %self.address, "sale started");
        }
        Ok(())
    }

    /// Change how payments are settled.
    pub fn update_payment_policy(&mut self, caller: &Address, policy: PaymentPolicy) -> MintResult<()> {
        self.require_owner(caller, "update the payment policy")?;
        self.payment_policy = policy;
        tracing::info!(extension = %self.address, %policy, "payment policy updated");
        Ok(())
    }

    /// Hand ownership to another address.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> MintResult<()> {
        self.require_owner(caller, "transfer ownership")?;
        self.owner = new_owner;
        tracing::info!(extension = %self.address, %new_owner, "ownership transferred");
        Ok(())
    }

    // ── Mint ─────────────────────────────────────────────────────────

    /// Validate a mint request without changing any state.
    pub fn prepare(
        &self,
        request: &MintRequest,
        target: &Ledger,
        passes: PassSource<'_>,
        bank: &Bank,
        redemptions: &RedemptionBook,
    ) -> MintResult<MintPlan> {
        if target.address() != self.ledger {
            return Err(MintError::UnknownContract {
                kind: "target ledger",
                address: self.ledger,
            });
        }
        if !self.sale_active {
            return Err(MintError::SaleNotStarted);
        }
        let quantity = request.quantity;
        if quantity == 0 {
            return Err(MintError::ZeroQuantity);
        }

        let charge = self.price.times(quantity)?;
        let captured = self.payment_policy.settle(charge, request.payment)?;

        if self.remaining_tokens < quantity {
            return Err(MintError::SupplyExhausted {
                remaining: self.remaining_tokens,
                requested: quantity,
            });
        }
        let remaining_after = self.remaining_tokens - quantity;

        let minted = self.minted_by(&request.caller);
        let minted_after = minted
            .checked_add(quantity)
            .filter(|total| *total <= self.max_per_address)
            .ok_or(MintError::PerAddressCapExceeded {
                minted,
                requested: quantity,
                cap: self.max_per_address,
            })?;

        let source: Option<&dyn PassLedger> = match passes {
            PassSource::TargetLedger => Some(target as &dyn PassLedger),
            PassSource::External(ledger) => Some(ledger),
            PassSource::Missing => None,
        };
        let verified = CredentialVerifier::new(self.mint_pass_address, source, redemptions)
            .verify(request.pass, &request.caller)?;

        let transfer =
            bank.prepare_transfer(request.caller, target.proceeds_recipient(), captured)?;

        tracing::debug!(
            extension = %self.address,
            caller = %request.caller,
            quantity,
            pass = %request.pass,
            "mint prepared"
        );
        Ok(MintPlan {
            request: *request,
            verified,
            transfer,
            remaining_after,
            minted_after,
        })
    }

    /// Apply a prepared mint.
    ///
    /// The ledger mint runs first; if it fails, nothing has been written.
    pub fn execute(
        &mut self,
        plan: MintPlan,
        target: &mut Ledger,
        bank: &mut Bank,
        redemptions: &mut RedemptionBook,
    ) -> MintResult<MintReceipt> {
        let MintPlan {
            request,
            verified,
            transfer,
            remaining_after,
            minted_after,
        } = plan;

        let tokens = target.mint_via_extension(&self.address, &request.caller, request.quantity)?;

        redemptions.redeem(verified);
        self.remaining_tokens = remaining_after;
        self.minted_by_address.insert(request.caller, minted_after);
        let charged = transfer.amount;
        let paid_to = transfer.to;
        bank.apply(transfer);

        tracing::info!(
            extension = %self.address,
            caller = %request.caller,
            quantity = request.quantity,
            pass = %request.pass,
            %charged,
            "mint pass redeemed"
        );
        Ok(MintReceipt {
            extension: self.address,
            caller: request.caller,
            pass: request.pass,
            tokens,
            charged,
            paid_to,
        })
    }

    /// Prepare and execute in one call.
    pub fn mint(
        &mut self,
        request: &MintRequest,
        target: &mut Ledger,
        passes: PassSource<'_>,
        bank: &mut Bank,
        redemptions: &mut RedemptionBook,
    ) -> MintResult<MintReceipt> {
        let plan = self.prepare(request, target, passes, bank, redemptions)?;
        self.execute(plan, target, bank, redemptions)
    }

    fn require_owner(&self, caller: &Address, action: &'static str) -> MintResult<()> {
        if *caller != self.owner {
            return Err(MintError::Unauthorized {
                caller: *caller,
                action,
            });
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
