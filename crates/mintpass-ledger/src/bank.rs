//! # Payment Bank
//!
//! Native-currency balances per address. Sale paths attach a payment to a
//! mint call; the bank moves the captured charge from the payer to the
//! proceeds recipient only once every other step of the call has succeeded.
//!
//! ## Two-Phase Transfers
//!
//! [`Bank::prepare_transfer`] validates the transfer and computes both
//! resulting balances without touching state. [`Bank::apply`] writes the
//! precomputed balances and cannot fail. A mint path prepares first, runs
//! its fallible steps, and applies last, so a rejected mint never captures
//! payment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mintpass_core::{Address, MintError, MintResult, Wei};

/// Balances of the native payment currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bank {
    balances: BTreeMap<Address, Wei>,
}

/// A validated transfer, ready to apply.
///
/// Only valid against the bank state it was prepared from; apply it before
/// any other mutation of the same bank.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a prepared transfer moves nothing until applied"]
pub struct PreparedTransfer {
    /// Payer.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount moved.
    pub amount: Wei,
    from_after: Wei,
    to_after: Wei,
}

impl Bank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account. Unknown accounts hold zero.
    pub fn balance_of(&self, account: &Address) -> Wei {
        self.balances.get(account).copied().unwrap_or(Wei::ZERO)
    }

    /// Credit new funds to an account. Returns the new balance.
    pub fn fund(&mut self, account: Address, amount: Wei) -> MintResult<Wei> {
        let updated = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(MintError::ArithmeticOverflow("bank balance"))?;
        self.balances.insert(account, updated);
        Ok(updated)
    }

    /// Validate a transfer and compute the resulting balances.
    pub fn prepare_transfer(
        &self,
        from: Address,
        to: Address,
        amount: Wei,
    ) -> MintResult<PreparedTransfer> {
        let available = self.balance_of(&from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(MintError::InsufficientFunds {
                account: from,
                available,
                required: amount,
            })?;
        if from == to {
            return Ok(PreparedTransfer {
                from,
                to,
                amount,
                from_after: available,
                to_after: available,
            });
        }
        let to_after = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(MintError::ArithmeticOverflow("bank balance"))?;
        Ok(PreparedTransfer {
            from,
            to,
            amount,
            from_after: remaining,
            to_after,
        })
    }

    /// Apply a prepared transfer.
    pub fn apply(&mut self, transfer: PreparedTransfer) {
        self.balances.insert(transfer.from, transfer.from_after);
        self.balances.insert(transfer.to, transfer.to_after);
    }

    /// Prepare and apply in one step.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Wei) -> MintResult<()> {
        let prepared = self.prepare_transfer(from, to, amount)?;
        self.apply(prepared);
        Ok(())
    }

    /// Accounts with a recorded balance, in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Wei)> {
        self.balances.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    #[test]
    fn test_unknown_account_is_empty() {
        assert_eq!(Bank::new().balance_of(&alice()), Wei::ZERO);
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut bank = Bank::new();
        bank.fund(alice(), Wei(100)).unwrap();
        bank.transfer(alice(), bob(), Wei(30)).unwrap();
        assert_eq!(bank.balance_of(&alice()), Wei(70));
        assert_eq!(bank.balance_of(&bob()), Wei(30));
    }

    #[test]
    fn test_insufficient_funds_leaves_state() {
        let mut bank = Bank::new();
        bank.fund(alice(), Wei(10)).unwrap();
        let before = bank.clone();
        let err = bank.transfer(alice(), bob(), Wei(11)).unwrap_err();
        assert!(matches!(err, MintError::InsufficientFunds { .. }));
        assert_eq!(bank, before);
    }

    #[test]
    fn test_prepare_does_not_mutate() {
        let mut bank = Bank::new();
        bank.fund(alice(), Wei(10)).unwrap();
        let prepared = bank.prepare_transfer(alice(), bob(), Wei(4)).unwrap();
        assert_eq!(bank.balance_of(&alice()), Wei(10));
        bank.apply(prepared);
        assert_eq!(bank.balance_of(&alice()), Wei(6));
        assert_eq!(bank.balance_of(&bob()), Wei(4));
    }

    #[test]
    fn test_self_transfer_is_balance_neutral() {
        let mut bank = Bank::new();
        bank.fund(alice(), Wei(10)).unwrap();
        bank.transfer(alice(), alice(), Wei(10)).unwrap();
        assert_eq!(bank.balance_of(&alice()), Wei(10));
    }

    #[test]
    fn test_fund_overflow() {
        let mut bank = Bank::new();
        bank.fund(alice(), Wei(u128::MAX)).unwrap();
        assert!(matches!(
            bank.fund(alice(), Wei(1)),
            Err(MintError::ArithmeticOverflow(_))
        ));
    }
}
