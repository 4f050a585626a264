//! # Ledger Core
//!
//! The base token ledger. Owns the supply counter, token ownership,
//! holder balances and the extension registry, and exposes two mint paths:
//!
//! - **Guarded extension mint** ([`Ledger::mint_via_extension`]): callable
//!   only by an address in the registry. Sale extensions enforce their own
//!   policy and then forward here.
//! - **Direct sale** ([`Ledger::mint`]): the ledger's own sale, gated by
//!   `sale_started` and priced by [`LedgerConfig`].
//!
//! ## Atomicity
//!
//! Every mutating operation validates completely before it writes. The
//! supply plan (new total, cap check, overflow check) is computed first;
//! token assignment happens only when nothing else can fail. A rejected
//! call leaves the ledger byte-for-byte unchanged.
//!
//! ## Invariants
//!
//! - `total_supply` never decreases.
//! - Token ids are dense: ids `0..total_supply` are all owned.
//! - `sum(balances) == total_supply`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mintpass_core::{Address, MintError, MintResult, PaymentPolicy, TokenId, Wei, ETHER};

use crate::bank::Bank;
use crate::registry::ExtensionRegistry;

// ─── Configuration ───────────────────────────────────────────────────

/// Hard ceiling on any ledger's supply. Every token holds one ownership
/// entry, so `max_supply` above this is capped here.
pub const SUPPLY_LIMIT: u64 = 1_000_000;

/// Deployment parameters of a ledger's direct sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Display name.
    pub name: String,
    /// Direct-sale price per token.
    pub price: Wei,
    /// Direct-sale limit per call.
    pub max_per_mint: u64,
    /// Ledger-wide supply cap, shared by every mint path. Enforced up to
    /// [`SUPPLY_LIMIT`].
    pub max_supply: u64,
    /// How direct-sale payments are settled.
    pub payment_policy: PaymentPolicy,
}

impl LedgerConfig {
    /// The supply cap actually enforced.
    pub fn supply_cap(&self) -> u64 {
        self.max_supply.min(SUPPLY_LIMIT)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: "Template".to_string(),
            price: Wei(ETHER),
            max_per_mint: 20,
            max_supply: 10_000,
            payment_policy: PaymentPolicy::Exact,
        }
    }
}

// ─── Ledger ──────────────────────────────────────────────────────────

/// A token ledger with an extension registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    address: Address,
    admin: Address,
    config: LedgerConfig,
    total_supply: u64,
    owners: BTreeMap<TokenId, Address>,
    balances: BTreeMap<Address, u64>,
    extensions: ExtensionRegistry,
    beneficiary: Option<Address>,
    sale_started: bool,
}

impl Ledger {
    /// Create a ledger with zero supply, an empty registry and the sale closed.
    pub fn new(address: Address, admin: Address, config: LedgerConfig) -> Self {
        Self {
            address,
            admin,
            config,
            total_supply: 0,
            owners: BTreeMap::new(),
            balances: BTreeMap::new(),
            extensions: ExtensionRegistry::new(),
            beneficiary: None,
            sale_started: false,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// This ledger's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrator address.
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Direct-sale configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Number of tokens minted so far.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Number of tokens held by `holder`.
    pub fn balance_of(&self, holder: &Address) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Current holder of a token.
    pub fn owner_of(&self, token: TokenId) -> Option<Address> {
        self.owners.get(&token).copied()
    }

    /// Configured beneficiary, if any.
    pub fn beneficiary(&self) -> Option<Address> {
        self.beneficiary
    }

    /// Where sale proceeds go: the beneficiary, or the ledger itself when unset.
    pub fn proceeds_recipient(&self) -> Address {
        self.beneficiary.unwrap_or(self.address)
    }

    /// Whether the direct sale is open.
    pub fn sale_started(&self) -> bool {
        self.sale_started
    }

    /// Whether `extension` may call [`Ledger::mint_via_extension`].
    pub fn is_extension_allowed(&self, extension: &Address) -> bool {
        self.extensions.is_allowed(extension)
    }

    /// The extension registry.
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    // ── Administration ───────────────────────────────────────────────

    /// Allow an extension to mint. Idempotent.
    pub fn add_extension(&mut self, caller: &Address, extension: Address) -> MintResult<()> {
        self.require_admin(caller, "add an extension")?;
        if self.extensions.allow(extension) {
            tracing::info!(ledger = %self.address, %extension, "extension allowed");
        }
        Ok(())
    }

    /// Revoke an extension. Idempotent. The extension's own state is untouched.
    pub fn remove_extension(&mut self, caller: &Address, extension: &Address) -> MintResult<()> {
        self.require_admin(caller, "remove an extension")?;
        if self.extensions.revoke(extension) {
            tracing::info!(ledger = %self.address, %extension, "extension revoked");
        }
        Ok(())
    }

    /// Set the proceeds beneficiary.
    pub fn set_beneficiary(&mut self, caller: &Address, beneficiary: Address) -> MintResult<()> {
        self.require_admin(caller, "set the beneficiary")?;
        self.beneficiary = Some(beneficiary);
        tracing::info!(ledger = %self.address, %beneficiary, "beneficiary set");
        Ok(())
    }

    /// Toggle the direct sale. Returns the new state.
    pub fn flip_sale_started(&mut self, caller: &Address) -> MintResult<bool> {
        self.require_admin(caller, "flip the sale state")?;
        self.sale_started = !self.sale_started;
        tracing::info!(ledger = %self.address, sale_started = self.sale_started, "sale state flipped");
        Ok(self.sale_started)
    }

    /// Hand the administrator role to another address.
    pub fn transfer_admin(&mut self, caller: &Address, new_admin: Address) -> MintResult<()> {
        self.require_admin(caller, "transfer the admin role")?;
        self.admin = new_admin;
        tracing::info!(ledger = %self.address, %new_admin, "admin transferred");
        Ok(())
    }

    // ── Mint paths ───────────────────────────────────────────────────

    /// Mint `quantity` tokens to `to` on behalf of a registered extension.
    ///
    /// Fails with `ExtensionNotAllowed` when `extension` is not registered.
    /// Returns the ids of the new tokens.
    pub fn mint_via_extension(
        &mut self,
        extension: &Address,
        to: &Address,
        quantity: u64,
    ) -> MintResult<Vec<TokenId>> {
        if !self.extensions.is_allowed(extension) {
            return Err(MintError::ExtensionNotAllowed {
                extension: *extension,
            });
        }
        let new_total = self.plan_supply(quantity)?;
        let minted = self.assign(to, quantity, new_total);
        tracing::debug!(ledger = %self.address, %extension, %to, quantity, "extension mint");
        Ok(minted)
    }

    /// Direct sale: mint `quantity` tokens to `caller` for `payment`.
    ///
    /// The captured charge moves from `caller` to the proceeds recipient.
    pub fn mint(
        &mut self,
        bank: &mut Bank,
        caller: &Address,
        quantity: u64,
        payment: Wei,
    ) -> MintResult<Vec<TokenId>> {
        if !self.sale_started {
            return Err(MintError::SaleNotStarted);
        }
        if quantity > self.config.max_per_mint {
            return Err(MintError::MaxPerMintExceeded {
                max: self.config.max_per_mint,
                requested: quantity,
            });
        }
        let new_total = self.plan_supply(quantity)?;
        let charge = self.config.price.times(quantity)?;
        let captured = self.config.payment_policy.settle(charge, payment)?;
        let transfer = bank.prepare_transfer(*caller, self.proceeds_recipient(), captured)?;

        let minted = self.assign(caller, quantity, new_total);
        bank.apply(transfer);
        tracing::info!(ledger = %self.address, %caller, quantity, %captured, "direct sale mint");
        Ok(minted)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn require_admin(&self, caller: &Address, action: &'static str) -> MintResult<()> {
        if *caller != self.admin {
            return Err(MintError::Unauthorized {
                caller: *caller,
                action,
            });
        }
        Ok(())
    }

    /// Validate a mint of `quantity` and return the resulting total supply.
    fn plan_supply(&self, quantity: u64) -> MintResult<u64> {
        if quantity == 0 {
            return Err(MintError::ZeroQuantity);
        }
        let new_total = self
            .total_supply
            .checked_add(quantity)
            .ok_or(MintError::ArithmeticOverflow("total supply"))?;
        let cap = self.config.supply_cap();
        if new_total > cap {
            return Err(MintError::MaxSupplyExceeded {
                max: cap,
                would_have: new_total,
            });
        }
        Ok(new_total)
    }

    /// Assign tokens `total_supply..new_total` to `to`. Infallible once planned.
    fn assign(&mut self, to: &Address, quantity: u64, new_total: u64) -> Vec<TokenId> {
        let minted: Vec<TokenId> = (self.total_supply..new_total).map(TokenId).collect();
        for id in &minted {
            self.owners.insert(*id, *to);
        }
        // A holder's balance is bounded by total supply, which was checked.
        *self.balances.entry(*to).or_insert(0) += quantity;
        self.total_supply = new_total;
        minted
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn admin() -> Address {
        Address::from_label("owner")
    }

    fn user1() -> Address {
        Address::from_label("user1")
    }

    fn extension() -> Address {
        Address::from_label("extension")
    }

    fn make_ledger() -> Ledger {
        Ledger::new(Address::from_label("nft"), admin(), LedgerConfig::default())
    }

    fn make_open_ledger() -> Ledger {
        let mut ledger = make_ledger();
        ledger.flip_sale_started(&admin()).unwrap();
        ledger
    }

    // ── Registry ─────────────────────────────────────────────────────

    #[test]
    fn test_new_ledger_is_empty() {
        let ledger = make_ledger();
        assert_eq!(ledger.total_supply(), 0);
        assert!(ledger.extensions().is_empty());
        assert!(!ledger.sale_started());
        assert_eq!(ledger.beneficiary(), None);
        assert_eq!(ledger.proceeds_recipient(), ledger.address());
    }

    #[test]
    fn test_connect_extension() {
        let mut ledger = make_ledger();
        ledger.add_extension(&admin(), extension()).unwrap();
        assert!(ledger.is_extension_allowed(&extension()));
        ledger.add_extension(&admin(), extension()).unwrap();
        assert_eq!(ledger.extensions().len(), 1);
    }

    #[test]
    fn test_registry_is_admin_only() {
        let mut ledger = make_ledger();
        let err = ledger.add_extension(&user1(), extension()).unwrap_err();
        assert!(matches!(err, MintError::Unauthorized { .. }));
        assert!(!ledger.is_extension_allowed(&extension()));

        ledger.add_extension(&admin(), extension()).unwrap();
        let err = ledger.remove_extension(&user1(), &extension()).unwrap_err();
        assert!(matches!(err, MintError::Unauthorized { .. }));
        assert!(ledger.is_extension_allowed(&extension()));
    }

    #[test]
    fn test_setters_are_admin_only() {
        let mut ledger = make_ledger();
        assert!(ledger.set_beneficiary(&user1(), user1()).is_err());
        assert!(ledger.flip_sale_started(&user1()).is_err());
        assert!(ledger.transfer_admin(&user1(), user1()).is_err());
        assert_eq!(ledger, make_ledger());
    }

    #[test]
    fn test_flip_sale_toggles() {
        let mut ledger = make_ledger();
        assert!(ledger.flip_sale_started(&admin()).unwrap());
        assert!(!ledger.flip_sale_started(&admin()).unwrap());
    }

    #[test]
    fn test_transfer_admin_moves_rights() {
        let mut ledger = make_ledger();
        ledger.transfer_admin(&admin(), user1()).unwrap();
        assert!(ledger.add_extension(&admin(), extension()).is_err());
        ledger.add_extension(&user1(), extension()).unwrap();
    }

    // ── Extension mint ───────────────────────────────────────────────

    #[test]
    fn test_extension_mint_requires_registration() {
        let mut ledger = make_ledger();
        let err = ledger
            .mint_via_extension(&extension(), &user1(), 1)
            .unwrap_err();
        assert_eq!(
            err,
            MintError::ExtensionNotAllowed {
                extension: extension()
            }
        );
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_extension_mint_assigns_sequential_ids() {
        let mut ledger = make_ledger();
        ledger.add_extension(&admin(), extension()).unwrap();
        let ids = ledger.mint_via_extension(&extension(), &user1(), 3).unwrap();
        assert_eq!(ids, vec![TokenId(0), TokenId(1), TokenId(2)]);
        assert_eq!(ledger.total_supply(), 3);
        assert_eq!(ledger.balance_of(&user1()), 3);
        assert_eq!(ledger.owner_of(TokenId(2)), Some(user1()));
        assert_eq!(ledger.owner_of(TokenId(3)), None);
    }

    #[test]
    fn test_removed_extension_cannot_mint() {
        let mut ledger = make_ledger();
        ledger.add_extension(&admin(), extension()).unwrap();
        ledger.remove_extension(&admin(), &extension()).unwrap();
        assert!(matches!(
            ledger.mint_via_extension(&extension(), &user1(), 1),
            Err(MintError::ExtensionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_extension_mint_respects_max_supply() {
        let mut ledger = Ledger::new(
            Address::from_label("nft"),
            admin(),
            LedgerConfig {
                max_supply: 2,
                ..LedgerConfig::default()
            },
        );
        ledger.add_extension(&admin(), extension()).unwrap();
        let err = ledger
            .mint_via_extension(&extension(), &user1(), 3)
            .unwrap_err();
        assert_eq!(
            err,
            MintError::MaxSupplyExceeded {
                max: 2,
                would_have: 3
            }
        );
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_supply_limit_bounds_huge_caps() {
        let mut ledger = Ledger::new(
            Address::from_label("nft"),
            admin(),
            LedgerConfig {
                max_supply: u64::MAX,
                ..LedgerConfig::default()
            },
        );
        ledger.add_extension(&admin(), extension()).unwrap();
        let before = ledger.clone();
        let err = ledger
            .mint_via_extension(&extension(), &user1(), u64::MAX)
            .unwrap_err();
        assert_eq!(
            err,
            MintError::MaxSupplyExceeded {
                max: SUPPLY_LIMIT,
                would_have: u64::MAX
            }
        );
        assert_eq!(ledger, before);
        assert_eq!(ledger.config().supply_cap(), SUPPLY_LIMIT);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut ledger = make_ledger();
        ledger.add_extension(&admin(), extension()).unwrap();
        assert_eq!(
            ledger.mint_via_extension(&extension(), &user1(), 0),
            Err(MintError::ZeroQuantity)
        );
    }

    // ── Direct sale ──────────────────────────────────────────────────

    #[test]
    fn test_direct_sale_mints_and_pays_beneficiary() {
        let mut ledger = make_open_ledger();
        ledger.set_beneficiary(&admin(), admin()).unwrap();
        let mut bank = Bank::new();
        bank.fund(user1(), Wei::ether(10)).unwrap();

        let ids = ledger.mint(&mut bank, &user1(), 10, Wei::ether(10)).unwrap();
        assert_eq!(ids.len(), 10);
        assert_eq!(ledger.balance_of(&user1()), 10);
        assert_eq!(bank.balance_of(&user1()), Wei::ZERO);
        assert_eq!(bank.balance_of(&admin()), Wei::ether(10));
    }

    #[test]
    fn test_direct_sale_requires_started() {
        let mut ledger = make_ledger();
        let mut bank = Bank::new();
        bank.fund(user1(), Wei::ether(1)).unwrap();
        assert_eq!(
            ledger.mint(&mut bank, &user1(), 1, Wei::ether(1)),
            Err(MintError::SaleNotStarted)
        );
    }

    #[test]
    fn test_direct_sale_rejects_wrong_payment_without_side_effects() {
        let mut ledger = make_open_ledger();
        let mut bank = Bank::new();
        bank.fund(user1(), Wei::ether(5)).unwrap();
        let (ledger_before, bank_before) = (ledger.clone(), bank.clone());

        let err = ledger
            .mint(&mut bank, &user1(), 2, Wei::ether(1))
            .unwrap_err();
        assert!(matches!(err, MintError::IncorrectPayment { .. }));
        assert_eq!(ledger, ledger_before);
        assert_eq!(bank, bank_before);
    }

    #[test]
    fn test_direct_sale_insufficient_funds() {
        let mut ledger = make_open_ledger();
        let mut bank = Bank::new();
        let err = ledger
            .mint(&mut bank, &user1(), 1, Wei::ether(1))
            .unwrap_err();
        assert!(matches!(err, MintError::InsufficientFunds { .. }));
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_direct_sale_max_per_mint() {
        let mut ledger = make_open_ledger();
        let mut bank = Bank::new();
        bank.fund(user1(), Wei::ether(100)).unwrap();
        assert_eq!(
            ledger.mint(&mut bank, &user1(), 21, Wei::ether(21)),
            Err(MintError::MaxPerMintExceeded {
                max: 20,
                requested: 21
            })
        );
    }

    #[test]
    fn test_proceeds_stay_on_ledger_without_beneficiary() {
        let mut ledger = make_open_ledger();
        let mut bank = Bank::new();
        bank.fund(user1(), Wei::ether(1)).unwrap();
        ledger.mint(&mut bank, &user1(), 1, Wei::ether(1)).unwrap();
        assert_eq!(bank.balance_of(&ledger.address()), Wei::ether(1));
    }

    #[test]
    fn test_ledger_serialization() {
        let mut ledger = make_ledger();
        ledger.add_extension(&admin(), extension()).unwrap();
        ledger.mint_via_extension(&extension(), &user1(), 2).unwrap();
        let json = serde_json::to_string(&ledger).unwrap();
        let parsed: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ledger);
    }

    proptest! {
        /// Supply equals the sum of balances and never decreases,
        /// whatever sequence of extension mints is attempted.
        #[test]
        fn supply_matches_balances(requests in proptest::collection::vec((0u8..3, 0u64..50), 1..40)) {
            let holders = [user1(), admin(), extension()];
            let mut ledger = Ledger::new(
                Address::from_label("nft"),
                admin(),
                LedgerConfig { max_supply: 500, ..LedgerConfig::default() },
            );
            ledger.add_extension(&admin(), extension()).unwrap();

            let mut previous = 0;
            for (holder, quantity) in requests {
                let _ = ledger.mint_via_extension(&extension(), &holders[holder as usize], quantity);
                prop_assert!(ledger.total_supply() >= previous);
                prop_assert!(ledger.total_supply() <= 500);
                previous = ledger.total_supply();
                let sum: u64 = holders.iter().map(|h| ledger.balance_of(h)).sum();
                prop_assert_eq!(sum, ledger.total_supply());
            }
        }
    }
}
