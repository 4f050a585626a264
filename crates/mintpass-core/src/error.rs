//! # Error Types: Mint Error Taxonomy
//!
//! One error enum, [`MintError`], is shared by the ledger, the sale
//! extensions and the runtime host so that a rejection raised deep inside
//! the ledger (e.g. `ExtensionNotAllowed` on a forwarded mint) reaches the
//! end user unchanged.
//!
//! ## Propagation
//!
//! Every variant aborts the entire call. No component retries or recovers
//! locally; the caller corrects the triggering condition and calls again.
//! Attached payment is never captured when an error is returned.

use thiserror::Error;

use crate::amount::Wei;
use crate::identity::{Address, PassId};

/// Rejection of a ledger, sale or runtime operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintError {
    /// The caller lacks the role the operation requires.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The attempted action.
        action: &'static str,
    },

    /// The sale gate is closed.
    #[error("sale has not started")]
    SaleNotStarted,

    /// A mint must request at least one unit.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The attached payment does not satisfy the payment policy.
    #[error("incorrect payment: expected {expected}, received {received}")]
    IncorrectPayment {
        /// The charge for the requested quantity.
        expected: Wei,
        /// The attached payment.
        received: Wei,
    },

    /// The extension's remaining-token counter cannot cover the request.
    #[error("supply exhausted: {remaining} remaining, {requested} requested")]
    SupplyExhausted {
        /// Tokens remaining on the extension.
        remaining: u64,
        /// Tokens requested.
        requested: u64,
    },

    /// The request would push the caller past the per-address cap.
    #[error("per-address cap exceeded: {minted} minted + {requested} requested > cap {cap}")]
    PerAddressCapExceeded {
        /// Units already minted by the caller through this extension.
        minted: u64,
        /// Units requested.
        requested: u64,
        /// The per-address cap.
        cap: u64,
    },

    /// The calling extension is not in the ledger's registry.
    #[error("extension {extension} is not allowed to mint")]
    ExtensionNotAllowed {
        /// The rejected extension address.
        extension: Address,
    },

    /// The caller does not currently hold the mint pass.
    #[error("{caller} does not hold {pass} on {ledger}")]
    CredentialInvalid {
        /// The credential ledger consulted.
        ledger: Address,
        /// The presented pass.
        pass: PassId,
        /// The caller.
        caller: Address,
    },

    /// The mint pass was already used for a successful mint.
    #[error("{pass} on {ledger} has already been redeemed")]
    CredentialAlreadyRedeemed {
        /// The credential ledger consulted.
        ledger: Address,
        /// The presented pass.
        pass: PassId,
    },

    /// A checked counter or amount operation overflowed.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// The payer cannot cover the attached payment.
    #[error("insufficient funds: {account} has {available}, needs {required}")]
    InsufficientFunds {
        /// The paying account.
        account: Address,
        /// Its balance.
        available: Wei,
        /// The amount attached.
        required: Wei,
    },

    /// A direct sale request exceeds the per-transaction limit.
    #[error("at most {max} tokens per mint, {requested} requested")]
    MaxPerMintExceeded {
        /// Per-transaction limit.
        max: u64,
        /// Tokens requested.
        requested: u64,
    },

    /// The ledger-wide supply cap would be exceeded.
    #[error("max supply {max} exceeded: total would be {would_have}")]
    MaxSupplyExceeded {
        /// Ledger supply cap.
        max: u64,
        /// Supply after the rejected mint.
        would_have: u64,
    },

    /// No ledger or extension is deployed at the address.
    #[error("no {kind} deployed at {address}")]
    UnknownContract {
        /// What was expected at the address.
        kind: &'static str,
        /// The address looked up.
        address: Address,
    },
}

impl MintError {
    /// Stable machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::SaleNotStarted => "SALE_NOT_STARTED",
            Self::ZeroQuantity => "ZERO_QUANTITY",
            Self::IncorrectPayment { .. } => "INCORRECT_PAYMENT",
            Self::SupplyExhausted { .. } => "SUPPLY_EXHAUSTED",
            Self::PerAddressCapExceeded { .. } => "PER_ADDRESS_CAP_EXCEEDED",
            Self::ExtensionNotAllowed { .. } => "EXTENSION_NOT_ALLOWED",
            Self::CredentialInvalid { .. } => "CREDENTIAL_INVALID",
            Self::CredentialAlreadyRedeemed { .. } => "CREDENTIAL_ALREADY_REDEEMED",
            Self::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::MaxPerMintExceeded { .. } => "MAX_PER_MINT_EXCEEDED",
            Self::MaxSupplyExceeded { .. } => "MAX_SUPPLY_EXCEEDED",
            Self::UnknownContract { .. } => "UNKNOWN_CONTRACT",
        }
    }
}

/// Error parsing an [`Address`] from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAddressError {
    /// Addresses are written with a `0x` prefix.
    #[error("address must start with 0x: {0:?}")]
    MissingPrefix(String),

    /// Wrong number of hex digits.
    #[error("address must have {expected} hex digits, got {actual}")]
    InvalidLength {
        /// Required digit count.
        expected: usize,
        /// Digits supplied.
        actual: usize,
    },

    /// Non-hex characters.
    #[error("address contains non-hex characters: {0:?}")]
    InvalidHex(String),
}

/// Error parsing a [`Wei`] amount from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    /// Not a non-negative decimal number.
    #[error("invalid amount: {0:?}")]
    Invalid(String),

    /// Unit suffix other than wei, gwei, ether.
    #[error("unknown unit {0:?}; expected wei, gwei or ether")]
    UnknownUnit(String),

    /// The value does not resolve to a whole number of wei.
    #[error("amount {0:?} is not a whole number of wei")]
    FractionalWei(String),

    /// The value does not fit in 128 bits of wei.
    #[error("amount {0:?} overflows")]
    Overflow(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = MintError::PerAddressCapExceeded {
            minted: 1,
            requested: 1,
            cap: 1,
        };
        assert_eq!(
            err.to_string(),
            "per-address cap exceeded: 1 minted + 1 requested > cap 1"
        );

        let err = MintError::IncorrectPayment {
            expected: Wei(10),
            received: Wei(5),
        };
        assert_eq!(
            err.to_string(),
            "incorrect payment: expected 10 wei, received 5 wei"
        );
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            MintError::SaleNotStarted,
            MintError::ZeroQuantity,
            MintError::ArithmeticOverflow("x"),
            MintError::ExtensionNotAllowed {
                extension: Address::ZERO,
            },
            MintError::CredentialAlreadyRedeemed {
                ledger: Address::ZERO,
                pass: PassId(0),
            },
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(MintError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }
}
