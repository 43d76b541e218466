//! Message decoding after the raw RSA public-exponent operation
//!
//! The archive wraps its key table by running the *private* exponent over a
//! padded message, so recovering a key is the public operation followed by an
//! ordinary EME decode. The RSA crates only expose the decode half for the
//! private-key direction, which is why it lives here.
//!
//! ```text
//! OAEP:      0x00 || maskedSeed(32) || maskedDB       DB = SHA-256("") || 0x00.. || 0x01 || M
//! PKCS1 v1.5 0x00 || 0x02 || PS (>= 8 non-zero) || 0x00 || M
//! ```

use sha2::{Digest, Sha256};

use crate::CryptoError;

const HASH_LEN: usize = 32;
const PKCS1_MIN_PS: usize = 8;

/// Padding scheme applied to a wrapped block before the private-key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// EME-OAEP with SHA-256 for both the label hash and MGF1, empty label
    OaepSha256,
    /// EME-PKCS1-v1_5 (block type 2)
    Pkcs1v15,
}

impl Padding {
    pub fn decode(self, em: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            Padding::OaepSha256 => oaep_decode(em),
            Padding::Pkcs1v15 => pkcs1v15_decode(em),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Padding::OaepSha256 => "OAEP",
            Padding::Pkcs1v15 => "PKCS#1 v1.5",
        }
    }
}

fn oaep_decode(em: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let k = em.len();
    if k < 2 * HASH_LEN + 2 {
        return Err(CryptoError::Padding("OAEP"));
    }

    let (masked_seed, masked_db) = em[1..].split_at(HASH_LEN);

    let mut seed = masked_seed.to_vec();
    xor_in_place(&mut seed, &mgf1(masked_db, HASH_LEN));

    let mut db = masked_db.to_vec();
    let mask = mgf1(&seed, db.len());
    xor_in_place(&mut db, &mask);

    let label_hash = Sha256::digest(b"");
    if em[0] != 0 || db[..HASH_LEN] != label_hash[..] {
        return Err(CryptoError::Padding("OAEP"));
    }

    let rest = &db[HASH_LEN..];
    let separator = rest
        .iter()
        .position(|&b| b != 0)
        .ok_or(CryptoError::Padding("OAEP"))?;
    if rest[separator] != 0x01 {
        return Err(CryptoError::Padding("OAEP"));
    }

    Ok(rest[separator + 1..].to_vec())
}

fn pkcs1v15_decode(em: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if em.len() < 2 + PKCS1_MIN_PS + 1 || em[0] != 0x00 || em[1] != 0x02 {
        return Err(CryptoError::Padding("PKCS#1 v1.5"));
    }

    let body = &em[2..];
    let separator = body
        .iter()
        .position(|&b| b == 0)
        .ok_or(CryptoError::Padding("PKCS#1 v1.5"))?;
    if separator < PKCS1_MIN_PS {
        return Err(CryptoError::Padding("PKCS#1 v1.5"));
    }

    Ok(body[separator + 1..].to_vec())
}

/// MGF1 mask generation with SHA-256.
pub(crate) fn mgf1(seed: &[u8], len: usize) -> Vec<u8> {
    let mut mask = Vec::with_capacity(len + HASH_LEN);
    let mut counter: u32 = 0;
    while mask.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        mask.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    mask.truncate(len);
    mask
}

pub(crate) fn xor_in_place(target: &mut [u8], mask: &[u8]) {
    for (t, m) in target.iter_mut().zip(mask) {
        *t ^= m;
    }
}
