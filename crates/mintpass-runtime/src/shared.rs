//! # Shared Runtime Handle
//!
//! A cloneable, thread-safe handle to one [`Runtime`]. Every call takes
//! the single `parking_lot::Mutex` for its whole duration, so concurrent
//! callers are totally ordered: of N threads racing to redeem the same
//! pass, exactly one succeeds and the rest observe it as redeemed.
//!
//! The lock is never held across anything but the call itself.
//! `parking_lot::Mutex` does not poison, so a panicking caller does not
//! lock the runtime out for everyone else.

use std::sync::Arc;

use parking_lot::Mutex;

use mintpass_core::{Address, MintResult};
use mintpass_sale::{MintReceipt, MintRequest};

use crate::runtime::Runtime;

/// Thread-safe handle to a [`Runtime`].
#[derive(Debug, Default)]
pub struct SharedRuntime {
    inner: Arc<Mutex<Runtime>>,
}

impl Clone for SharedRuntime {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedRuntime {
    /// Wrap a runtime for shared use.
    pub fn new(runtime: Runtime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(runtime)),
        }
    }

    /// Run one indivisible call against the runtime.
    pub fn call<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Read the runtime without mutating it.
    pub fn read<R>(&self, f: impl FnOnce(&Runtime) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Mint through a sale extension.
    pub fn mint_via_sale(&self, extension: &Address, request: &MintRequest) -> MintResult<MintReceipt> {
        self.call(|runtime| runtime.mint_via_sale(extension, request))
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Runtime {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mintpass_core::Wei;
    use mintpass_ledger::LedgerConfig;

    #[test]
    fn test_clones_share_state() {
        let shared = SharedRuntime::default();
        let other = shared.clone();
        let deployer = Address::from_label("deployer");
        let ledger = shared.call(|rt| rt.deploy_ledger(deployer, LedgerConfig::default()));
        assert!(other.read(|rt| rt.ledger(&ledger).is_ok()));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let shared = SharedRuntime::new(Runtime::new());
        let before = shared.snapshot();
        shared
            .call(|rt| rt.fund(Address::from_label("alice"), Wei(5)))
            .unwrap();
        assert_ne!(shared.snapshot(), before);
        assert_eq!(before.balance(&Address::from_label("alice")), Wei::ZERO);
    }
}
