//! # Credential Verifier
//!
//! Admission control for sale extensions. A mint pass is a token on some
//! ledger (the *pass ledger*); presenting pass `n` is valid when the caller
//! currently holds token `n` there and the pass has not been redeemed.
//!
//! ## Redemption Scope
//!
//! Redemption is global per pass ledger: the [`RedemptionBook`] is keyed by
//! `(pass ledger, pass id)` and is shared by every extension in a runtime.
//! A pass that authorized one mint through any extension can never
//! authorize another, whoever presents it.
//!
//! ## Two Steps
//!
//! [`CredentialVerifier::verify`] is read-only and returns a
//! [`VerifiedPass`]. Only a `VerifiedPass` can be redeemed, and
//! [`RedemptionBook::redeem`] cannot fail, so the extension can redeem as
//! its last, infallible step.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mintpass_core::{Address, MintError, MintResult, PassId};
use mintpass_ledger::Ledger;

/// A ledger on which mint passes are held.
pub trait PassLedger: Send + Sync {
    /// Address of the pass ledger.
    fn pass_ledger_address(&self) -> Address;

    /// Current holder of the pass, if it exists.
    fn holder_of(&self, pass: PassId) -> Option<Address>;
}

impl PassLedger for Ledger {
    fn pass_ledger_address(&self) -> Address {
        self.address()
    }

    fn holder_of(&self, pass: PassId) -> Option<Address> {
        self.owner_of(pass.as_token())
    }
}

/// Passes redeemed across all extensions, keyed by pass ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedemptionBook {
    redeemed: BTreeSet<(Address, PassId)>,
}

impl RedemptionBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pass has been redeemed.
    pub fn is_redeemed(&self, pass_ledger: &Address, pass: PassId) -> bool {
        self.redeemed.contains(&(*pass_ledger, pass))
    }

    /// Mark a verified pass redeemed. Once set, never cleared.
    pub fn redeem(&mut self, verified: VerifiedPass) {
        self.redeemed.insert((verified.pass_ledger, verified.pass));
    }

    /// Number of redeemed passes.
    pub fn len(&self) -> usize {
        self.redeemed.len()
    }

    /// Whether nothing has been redeemed.
    pub fn is_empty(&self) -> bool {
        self.redeemed.is_empty()
    }
}

/// Proof that a caller held an unredeemed pass at verification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedPass {
    /// The pass ledger consulted.
    pub pass_ledger: Address,
    /// The pass.
    pub pass: PassId,
    /// The holder that presented it.
    pub holder: Address,
}

/// Checks pass possession and redemption state.
pub struct CredentialVerifier<'a> {
    pass_ledger: Address,
    source: Option<&'a dyn PassLedger>,
    redemptions: &'a RedemptionBook,
}

impl<'a> CredentialVerifier<'a> {
    /// Build a verifier for `pass_ledger`.
    ///
    /// `source` is `None` when nothing is deployed at `pass_ledger`; every
    /// pass is then invalid.
    pub fn new(
        pass_ledger: Address,
        source: Option<&'a dyn PassLedger>,
        redemptions: &'a RedemptionBook,
    ) -> Self {
        Self {
            pass_ledger,
            source,
            redemptions,
        }
    }

    /// Confirm that `pass` is unredeemed and that `caller` holds it.
    ///
    /// Redemption is checked first: a redeemed pass is refused as
    /// redeemed whoever presents it.
    pub fn verify(&self, pass: PassId, caller: &Address) -> MintResult<VerifiedPass> {
        if self.redemptions.is_redeemed(&self.pass_ledger, pass) {
            return Err(MintError::CredentialAlreadyRedeemed {
                ledger: self.pass_ledger,
                pass,
            });
        }
        let holder = self
            .source
            .filter(|source| source.pass_ledger_address() == self.pass_ledger)
            .and_then(|source| source.holder_of(pass));
        if holder != Some(*caller) {
            return Err(MintError::CredentialInvalid {
                ledger: self.pass_ledger,
                pass,
                caller: *caller,
            });
        }
        Ok(VerifiedPass {
            pass_ledger: self.pass_ledger,
            pass,
            holder: *caller,
        })
    }
}
