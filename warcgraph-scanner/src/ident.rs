use crate::error::{Result, ScanError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Number of base64 characters kept from the digest (72 bits).
pub const NODE_ID_LEN: usize = 12;

/// Short identifier of a canonical URL: the first twelve base64 characters
/// of its SHA-1 digest. Distinct URLs may collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut encoded = STANDARD.encode(digest);
        encoded.truncate(NODE_ID_LEN);
        NodeId(encoded)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the identifier of `canonical` with a one-shot hash.
pub fn derive_id(canonical: &str) -> NodeId {
    NodeId::from_digest(&Sha1::digest(canonical.as_bytes()))
}

/// Reusable hasher for one worker.
///
/// Each worker owns its own deriver; `derive` takes `&mut self`, so a single
/// hash state can never be updated from two threads at once.
#[derive(Debug, Clone)]
pub struct IdDeriver {
    hasher: Sha1,
}

impl IdDeriver {
    /// Creates a deriver after checking the hash against a known answer.
    pub fn new() -> Result<Self> {
        let mut deriver = Self {
            hasher: Sha1::new(),
        };
        deriver.self_test()?;
        Ok(deriver)
    }

    pub fn derive(&mut self, canonical: &str) -> NodeId {
        self.hasher.update(canonical.as_bytes());
        NodeId::from_digest(&self.hasher.finalize_reset())
    }

    fn self_test(&mut self) -> Result<()> {
        // FIPS 180-1 test vector for "abc".
        const EXPECTED: [u8; 20] = [
            0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
            0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
        ];

        self.hasher.update(b"abc");
        let digest = self.hasher.finalize_reset();
        if digest.as_slice() != EXPECTED {
            return Err(ScanError::HashUnavailable(
                "SHA-1 known-answer test failed".to_string(),
            ));
        }
        Ok(())
    }
}
