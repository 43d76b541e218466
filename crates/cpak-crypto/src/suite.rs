//! Process-wide primitive selection
//!
//! Built once on first use and immutable afterwards. Sessions receive a
//! `&CryptoSuite` explicitly instead of looking primitives up on their own.

use std::io::{Read, Write};
use std::sync::OnceLock;

use crate::{
    decrypt_in_place, decrypt_section, CipherKey, CryptoError, InitVector, KeyUnwrapper, Padding,
    StreamingHash,
};

static GLOBAL: OnceLock<CryptoSuite> = OnceLock::new();

#[derive(Debug)]
pub struct CryptoSuite {
    key_padding: Padding,
}

impl CryptoSuite {
    pub fn global() -> &'static CryptoSuite {
        GLOBAL.get_or_init(|| {
            let suite = CryptoSuite {
                key_padding: Padding::OaepSha256,
            };
            tracing::debug!(
                key_padding = suite.key_padding.name(),
                cipher = "twofish-128-ctr-le",
                hash = "sha256",
                "crypto suite initialised"
            );
            suite
        })
    }

    /// Padding used for every wrapped block of the key table.
    pub fn key_padding(&self) -> Padding {
        self.key_padding
    }

    pub fn import_public_key(&self, blob: &[u8]) -> Result<KeyUnwrapper, CryptoError> {
        KeyUnwrapper::import(blob)
    }

    pub fn decrypt_in_place(
        &self,
        key: &CipherKey,
        iv: &InitVector,
        buf: &mut [u8],
    ) -> Result<(), CryptoError> {
        decrypt_in_place(key, iv, buf)
    }

    pub fn decrypt_section<R, W>(
        &self,
        input: &mut R,
        output: &mut W,
        len: u64,
        key: &CipherKey,
        iv: &InitVector,
    ) -> Result<u64, CryptoError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        decrypt_section(input, output, len, key, iv)
    }

    pub fn start_sha256(&self) -> StreamingHash {
        StreamingHash::new()
    }
}
