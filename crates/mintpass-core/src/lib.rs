//! # mintpass-core: Foundational Types for Mint Pass Sales
//!
//! Leaf of the workspace DAG. Defines the identifiers, amounts and error
//! taxonomy shared by the ledger, the sale extensions and the runtime host.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `Address`, `TokenId`, `PassId`.
//!    A pass id is never accepted where a token id is expected.
//!
//! 2. **Integer-only payments.** `Wei` wraps a `u128`; every arithmetic
//!    step is checked and overflow surfaces as `MintError::ArithmeticOverflow`.
//!
//! 3. **One error taxonomy.** `MintError` is the single rejection type for
//!    every mint path, so errors raised by the ledger propagate through the
//!    sale extension unchanged.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `mintpass-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod error;
pub mod identity;

pub use amount::{PaymentPolicy, Wei, ETHER, GWEI};
pub use error::{MintError, ParseAddressError, ParseAmountError};
pub use identity::{Address, PassId, TokenId, ADDRESS_LEN};

/// Result alias for mint operations.
pub type MintResult<T> = Result<T, MintError>;
