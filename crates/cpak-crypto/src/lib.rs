//! cpak-crypto: the crypto provider behind the pak decryption pipeline
//!
//! Primitives:
//! ```text
//! Key table unwrap: RSA public-exponent op on each 128-byte block → OAEP(SHA-256) decode
//! Section cipher:   Twofish-128 in CTR mode, 128-bit little-endian counter starting at the IV
//! Diagnostics:      streaming SHA-256
//! ```
//!
//! Every header, body and descriptor is an independent CTR invocation, so the
//! keystream always restarts at block 0 for a new section.

pub mod error;
pub mod hash;
pub mod keys;
pub mod padding;
pub mod provider;
pub mod stream;
pub mod suite;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::CryptoError;
pub use hash::{digest_to_hex, StreamingHash};
pub use keys::{CipherKey, InitVector, KeySet};
pub use padding::Padding;
pub use provider::KeyUnwrapper;
pub use stream::{decrypt_in_place, decrypt_section};
pub use suite::CryptoSuite;

/// Size of a wrapped key block, equal to the RSA modulus size (1024-bit)
pub const WRAPPED_BLOCK_SIZE: usize = 128;

/// Number of symmetric keys in the archive key table
pub const KEY_TABLE_SIZE: usize = 16;

/// Size of a Twofish key and of a CTR initial vector
pub const CIPHER_KEY_SIZE: usize = 16;
