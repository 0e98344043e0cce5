//! Incremental SHA-256 hasher

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("Hash finalization failed: no bytes were hashed")]
    Empty,
}

/// A finalized 256-bit digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// 64 lowercase hex characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Running digest fed one buffer at a time.
///
/// `finalize` consumes the hasher, so the state cannot be read early or
/// finalized twice.
pub struct IncrementalHasher {
    state: Sha256,
    bytes_hashed: u64,
}

impl IncrementalHasher {
    pub fn new() -> Self {
        Self {
            state: Sha256::new(),
            bytes_hashed: 0,
        }
    }

    /// Mix `buffer` into the digest
    pub fn update(&mut self, buffer: &[u8]) {
        self.state.update(buffer);
        self.bytes_hashed += buffer.len() as u64;
    }

    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    pub fn finalize(self) -> Result<Sha256Digest, HashError> {
        if self.bytes_hashed == 0 {
            return Err(HashError::Empty);
        }
        Ok(Sha256Digest(self.state.finalize().into()))
    }
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}
