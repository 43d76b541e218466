//! RSA public-key unwrap of the archive key table

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use zeroize::Zeroizing;

use crate::{CryptoError, Padding};

/// An imported RSA public key, able to recover blocks that were wrapped with
/// the matching private key.
#[derive(Debug, Clone)]
pub struct KeyUnwrapper {
    key: RsaPublicKey,
}

impl KeyUnwrapper {
    /// Import a public key blob: PKCS#1 `RSAPublicKey` or SubjectPublicKeyInfo,
    /// DER or PEM.
    pub fn import(blob: &[u8]) -> Result<Self, CryptoError> {
        let key = match pem_text(blob) {
            Some(pem) => RsaPublicKey::from_pkcs1_pem(pem)
                .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
                .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?,
            None => RsaPublicKey::from_pkcs1_der(blob)
                .or_else(|_| RsaPublicKey::from_public_key_der(blob))
                .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?,
        };

        tracing::debug!(modulus_bits = key.n().bits(), "imported RSA public key");
        Ok(Self { key })
    }

    /// Modulus size in bytes; every wrapped block must be exactly this long.
    pub fn modulus_len(&self) -> usize {
        self.key.size()
    }

    /// Apply the public exponent to one wrapped block and strip its padding.
    pub fn unwrap_block(
        &self,
        wrapped: &[u8],
        padding: Padding,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let k = self.modulus_len();
        if wrapped.len() != k {
            return Err(CryptoError::BlockSize {
                expected: k,
                actual: wrapped.len(),
            });
        }

        let c = BigUint::from_bytes_be(wrapped);
        if &c >= self.key.n() {
            return Err(CryptoError::OutOfRange);
        }

        let m = c.modpow(self.key.e(), self.key.n());
        let em = Zeroizing::new(left_pad(&m.to_bytes_be(), k));

        padding.decode(&em).map(Zeroizing::new)
    }
}

fn pem_text(blob: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(blob).ok()?.trim();
    text.starts_with("-----BEGIN").then_some(text)
}

/// Big-endian integer bytes, zero-extended on the left to `len`.
pub(crate) fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(bytes);
    out
}
