//! `did:sage:<chain>:<address>` decentralized identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};

/// A SAGE-method DID: `did:sage:<chain>:<address>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    pub chain: String,
    pub address: String,
}

impl Did {
    pub fn new(chain: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            address: address.into(),
        }
    }

    pub fn parse(s: &str) -> IdentityResult<Self> {
        let mut parts = s.splitn(4, ':');
        let scheme = parts.next().unwrap_or("");
        let method = parts.next().unwrap_or("");
        let chain = parts.next().unwrap_or("");
        let address = parts.next().unwrap_or("");

        if scheme != "did" || method != "sage" || chain.is_empty() || address.is_empty() {
            return Err(IdentityError::InvalidDid(s.to_string()));
        }

        Ok(Self::new(chain, address))
    }

    /// Derive a deterministic, on-chain-looking address (0x-prefixed,
    /// lowercase hex of the last 20 bytes of SHA-256) from a public key's
    /// canonical bytes.
    pub fn derive_address(public_key_bytes: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(public_key_bytes);
        format!("0x{}", hex::encode(&digest[12..]))
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:sage:{}:{}", self.chain, self.address)
    }
}

impl TryFrom<String> for Did {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Did::parse(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let s = "did:sage:ethereum:0xabc123";
        let did = Did::parse(s).unwrap();
        assert_eq!(did.to_string(), s);
    }

    #[test]
    fn rejects_wrong_method() {
        assert!(Did::parse("did:key:z6Mk...").is_err());
    }

    #[test]
    fn rejects_missing_parts() {
        assert!(Did::parse("did:sage:ethereum").is_err());
    }
}
