//! # mintpass-ledger: Base Token Ledger
//!
//! The ledger that sale extensions mint into.
//!
//! ## Components
//!
//! - **Ledger** (`ledger.rs`): supply counter, ownership, balances,
//!   administrator setters, the guarded extension mint and the ledger's own
//!   direct sale.
//!
//! - **Extension Registry** (`registry.rs`): the capability set of
//!   extension addresses allowed to mint. Checked on every extension mint.
//!
//! - **Bank** (`bank.rs`): native-currency balances with two-phase
//!   transfers, so payment is captured only when the whole call succeeds.
//!
//! ## Crate Policy
//!
//! - Depends only on `mintpass-core` internally.
//! - Every mutating operation validates fully before writing.

pub mod bank;
pub mod ledger;
pub mod registry;

pub use bank::{Bank, PreparedTransfer};
pub use ledger::{Ledger, LedgerConfig, SUPPLY_LIMIT};
pub use registry::ExtensionRegistry;
