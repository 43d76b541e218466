//! Streaming SHA-256 for diagnostic digests

use sha2::{Digest, Sha256};

/// Incremental SHA-256. Diagnostic only: nothing verifies these digests.
#[derive(Debug, Clone, Default)]
pub struct StreamingHash {
    inner: Sha256,
}

impl StreamingHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

/// Lowercase hex rendering of a digest or any other byte string.
pub fn digest_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
