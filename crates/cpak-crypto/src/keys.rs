//! Symmetric key material: Twofish keys, CTR initial vectors, and the per-archive key table

use zeroize::Zeroize;

use crate::{CIPHER_KEY_SIZE, KEY_TABLE_SIZE};

/// A 128-bit Twofish key. Zeroized on drop.
#[derive(Clone)]
pub struct CipherKey {
    bytes: [u8; CIPHER_KEY_SIZE],
}

impl CipherKey {
    pub fn from_bytes(bytes: [u8; CIPHER_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Take the first 16 bytes of an unwrapped message.
    pub fn from_prefix(message: &[u8]) -> Option<Self> {
        let mut bytes = [0u8; CIPHER_KEY_SIZE];
        bytes.copy_from_slice(message.get(..CIPHER_KEY_SIZE)?);
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; CIPHER_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 128-bit CTR initial vector (the starting counter block).
#[derive(Clone, PartialEq, Eq)]
pub struct InitVector {
    bytes: [u8; CIPHER_KEY_SIZE],
}

impl InitVector {
    pub fn from_bytes(bytes: [u8; CIPHER_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn from_prefix(message: &[u8]) -> Option<Self> {
        let mut bytes = [0u8; CIPHER_KEY_SIZE];
        bytes.copy_from_slice(message.get(..CIPHER_KEY_SIZE)?);
        Some(Self { bytes })
    }

    /// Build from four 32-bit words, each stored little-endian.
    pub fn from_words(words: [u32; 4]) -> Self {
        let mut bytes = [0u8; CIPHER_KEY_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; CIPHER_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for InitVector {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for InitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("InitVector")
            .field(&crate::digest_to_hex(&self.bytes))
            .finish()
    }
}

/// The unwrapped key table of one archive plus the IV of its central directory.
///
/// Lives for exactly one decryption session; every key is wiped when it drops.
#[derive(Debug)]
pub struct KeySet {
    keys: [CipherKey; KEY_TABLE_SIZE],
    directory_iv: InitVector,
}

impl KeySet {
    pub fn new(keys: [CipherKey; KEY_TABLE_SIZE], directory_iv: InitVector) -> Self {
        Self { keys, directory_iv }
    }

    /// Key for a table index. Indices are masked to 4 bits by the caller.
    pub fn key(&self, index: usize) -> Option<&CipherKey> {
        self.keys.get(index)
    }

    /// The central directory is always encrypted with the first table key.
    pub fn directory_key(&self) -> &CipherKey {
        &self.keys[0]
    }

    pub fn directory_iv(&self) -> &InitVector {
        &self.directory_iv
    }
}
