//! # Identity Newtypes
//!
//! Newtype wrappers for every identifier that crosses a component boundary.
//! You cannot pass a `PassId` where a `TokenId` is expected, even though a
//! mint pass is itself a token on some ledger: the credential check reads
//! the pass ledger, the mint writes the target ledger, and mixing the two
//! namespaces is exactly the confusion the types rule out.
//!
//! ## Address Derivation
//!
//! Addresses are 20 bytes. Externally owned accounts are derived from a
//! human label (`Address::from_label("user1")`) so scenarios and tests are
//! reproducible. Contract addresses are derived from the deployer and its
//! deployment nonce, mirroring how a hosting ledger assigns them:
//!
//! ```text
//! account  = sha256("mintpass:account:" ‖ label)[0..20]
//! contract = sha256("mintpass:contract:" ‖ deployer ‖ nonce_be)[0..20]
//! ```

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::ParseAddressError;

/// Byte length of an address.
pub const ADDRESS_LEN: usize = 20;

/// An account or contract address.
///
/// Serialized as a `0x`-prefixed lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Derive a deterministic account address from a label.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"mintpass:account:");
        hasher.update(label.as_bytes());
        Self::truncate(&hasher.finalize())
    }

    /// Derive the address of the contract that `deployer` creates with `nonce`.
    pub fn derive_contract(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"mintpass:contract:");
        hasher.update(deployer.0);
        hasher.update(nonce.to_be_bytes());
        Self::truncate(&hasher.finalize())
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Render as a `0x`-prefixed lowercase hex string.
    pub fn to_hex(&self) -> String {
        let hex: String = self.0.iter().map(|b| format!("{b:02x}")).collect();
        format!("0x{hex}")
    }

    fn truncate(digest: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseAddressError::MissingPrefix(s.to_string()))?;
        if !hex.is_ascii() {
            return Err(ParseAddressError::InvalidHex(s.to_string()));
        }
        if hex.len() != ADDRESS_LEN * 2 {
            return Err(ParseAddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: hex.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ParseAddressError::InvalidHex(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of a token on a ledger. Assigned sequentially from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

/// Identifier of a mint pass on the credential ledger.
///
/// Numerically this is the token id of the pass on the credential ledger,
/// but it is only ever interpreted against `mint_pass_address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PassId(pub u64);

impl PassId {
    /// The token id this pass occupies on its credential ledger.
    pub fn as_token(&self) -> TokenId {
        TokenId(self.0)
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "token:{}", self.0)
    }
}

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pass:{}", self.0)
    }
}
