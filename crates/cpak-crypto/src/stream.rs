//! Twofish-CTR section decryption
//!
//! CTR is length-preserving and its own inverse: applying the keystream a
//! second time with the same key/IV restores the input.

use std::io::{Read, Write};

use cipher::{InnerIvInit, KeyInit, StreamCipher};
use ctr::Ctr128LE;
use twofish::Twofish;

use crate::{CipherKey, CryptoError, InitVector};

/// Read/decrypt/write buffer for streamed sections
pub const SECTION_CHUNK_SIZE: usize = 64 * 1024;

type TwofishCtr = Ctr128LE<Twofish>;

fn section_cipher(key: &CipherKey, iv: &InitVector) -> Result<TwofishCtr, CryptoError> {
    let block = Twofish::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    Ok(TwofishCtr::from_core(ctr::CtrCore::inner_iv_init(
        block,
        iv.as_bytes().into(),
    )))
}

/// Decrypt a buffer in place, keystream starting at block 0.
pub fn decrypt_in_place(
    key: &CipherKey,
    iv: &InitVector,
    buf: &mut [u8],
) -> Result<(), CryptoError> {
    let mut cipher = section_cipher(key, iv)?;
    cipher.apply_keystream(buf);
    Ok(())
}

/// Stream `len` bytes from `input` to `output` through one CTR keystream.
///
/// Chunking is invisible to the result: the keystream continues across
/// chunks exactly as if the whole section were decrypted at once.
pub fn decrypt_section<R, W>(
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
    let mut cipher = section_cipher(key, iv)?;
    let mut buf = vec![0u8; (len as usize).min(SECTION_CHUNK_SIZE)];
    let mut remaining = len;

    while remaining > 0 {
        let n = (remaining as usize).min(buf.len());
        input.read_exact(&mut buf[..n])?;
        cipher.apply_keystream(&mut buf[..n]);
        output.write_all(&buf[..n])?;
        remaining -= n as u64;
    }

    Ok(len)
}
