//! # Extension Registry
//!
//! The capability set of a ledger: the addresses allowed to call
//! [`Ledger::mint_via_extension`](crate::Ledger::mint_via_extension).
//! Membership is the only thing checked on that path. There is no trait
//! object per extension kind; any contract at a registered address may mint,
//! and any other address may not.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mintpass_core::Address;

/// Set of extension addresses allowed to mint on a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionRegistry {
    allowed: BTreeSet<Address>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow an extension. Returns `true` if it was not already allowed.
    pub fn allow(&mut self, extension: Address) -> bool {
        self.allowed.insert(extension)
    }

    /// Revoke an extension. Returns `true` if it was allowed.
    pub fn revoke(&mut self, extension: &Address) -> bool {
        self.allowed.remove(extension)
    }

    /// Whether the extension may mint.
    pub fn is_allowed(&self, extension: &Address) -> bool {
        self.allowed.contains(extension)
    }

    /// Allowed extensions in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.allowed.iter()
    }

    /// Number of allowed extensions.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Whether no extension is allowed.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_is_idempotent() {
        let mut registry = ExtensionRegistry::new();
        let ext = Address::from_label("ext");
        assert!(registry.allow(ext));
        assert!(!registry.allow(ext));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_allowed(&ext));
    }

    #[test]
    fn test_revoke_unknown_is_noop() {
        let mut registry = ExtensionRegistry::new();
        assert!(!registry.revoke(&Address::from_label("ext")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut registry = ExtensionRegistry::new();
        registry.allow(Address::ZERO);
        let json = serde_json::to_value(&registry).unwrap();
        assert!(json.is_array());
        let parsed: ExtensionRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, registry);
    }
}
