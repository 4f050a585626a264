//! # mintpass-sale: Mint Pass Sale Extensions
//!
//! Policy engines that mint into a base ledger on behalf of end users.
//!
//! - **Sale Extension** (`extension.rs`): owner-controlled price, per-address
//!   cap, remaining-token counter and one-way sale activation. Its mint is
//!   all-or-nothing: every check runs before any write, and the ledger mint
//!   runs before any local effect.
//!
//! - **Credential Verifier** (`verifier.rs`): mint pass possession checks
//!   against a pass ledger, and the global redemption book.
//!
//! ## Crate Policy
//!
//! - Depends on `mintpass-core` and `mintpass-ledger` internally.
//! - Holds no references to other contracts between calls; the caller
//!   supplies the target ledger and pass ledger for each mint.

pub mod extension;
pub mod verifier;

pub use extension::{MintPlan, MintReceipt, MintRequest, PassSource, SaleConfig, SaleExtension};
pub use verifier::{CredentialVerifier, PassLedger, RedemptionBook, VerifiedPass};
