//! Proprietary trailer: extended header, signing header, wrapped key table
//!
//! The trailer is carried as the end record's comment. Its signing header is
//! always present in the supported variant and is skipped unread.

use cpak_core::{EncryptionType, PakError, PakResult};
use cpak_crypto::{
    CipherKey, CryptoError, CryptoSuite, InitVector, KeySet, KeyUnwrapper, CIPHER_KEY_SIZE,
    KEY_TABLE_SIZE,
};

use crate::format::{EncryptionHeader, ExtendedHeader, SIGNING_HEADER_SIZE};

#[derive(Debug, Clone)]
pub struct Trailer {
    pub extended: ExtendedHeader,
    pub encryption: EncryptionHeader,
}

/// Parse and validate the trailer bytes that follow the end record.
pub fn read_trailer(comment: &[u8]) -> PakResult<Trailer> {
    if comment.len() < ExtendedHeader::SIZE {
        return Err(PakError::NoExtendedHeader(format!(
            "trailer is {} bytes",
            comment.len()
        )));
    }

    let mut rest = comment;
    let extended = ExtendedHeader::read_from(&mut rest)?;
    if extended.header_size as usize != ExtendedHeader::SIZE {
        return Err(PakError::NoExtendedHeader(format!(
            "declared size {}",
            extended.header_size
        )));
    }

    match EncryptionType::from_code(extended.encryption_type) {
        Some(EncryptionType::StreamCipherKeytable) => {}
        known => {
            tracing::warn!(
                code = extended.encryption_type,
                kind = ?known,
                "archive uses an unsupported encryption type"
            );
            return Err(PakError::UnsupportedEncryption(extended.encryption_type));
        }
    }
    tracing::debug!(
        signature_type = extended.signature_type,
        "extended header ok; signature is not verified"
    );

    if rest.len() < SIGNING_HEADER_SIZE {
        return Err(PakError::decryption("signing header truncated"));
    }
    rest = &rest[SIGNING_HEADER_SIZE..];

    if rest.len() < EncryptionHeader::SIZE {
        return Err(PakError::decryption(format!(
            "encryption header truncated: {} of {} bytes",
            rest.len(),
            EncryptionHeader::SIZE
        )));
    }
    let encryption = EncryptionHeader::read_from(&mut rest)?;
    if encryption.header_size as usize != EncryptionHeader::SIZE {
        return Err(PakError::decryption(format!(
            "encryption header declares {} bytes",
            encryption.header_size
        )));
    }

    Ok(Trailer {
        extended,
        encryption,
    })
}

/// Unwrap the 16 keys, then the directory IV.
pub fn unwrap_key_set(
    suite: &CryptoSuite,
    unwrapper: &KeyUnwrapper,
    header: &EncryptionHeader,
) -> PakResult<KeySet> {
    let padding = suite.key_padding();

    let mut keys = Vec::with_capacity(KEY_TABLE_SIZE);
    for (index, block) in header.wrapped_keys.iter().enumerate() {
        let message = unwrapper
            .unwrap_block(block, padding)
            .map_err(|e| PakError::decryption(format!("key {index}: {e}")))?;
        keys.push(CipherKey::from_prefix(&message).ok_or_else(|| short(index, message.len()))?);
    }
    let keys: [CipherKey; KEY_TABLE_SIZE] = keys
        .try_into()
        .map_err(|_| PakError::decryption("key table is incomplete"))?;

    let message = unwrapper
        .unwrap_block(&header.wrapped_iv, padding)
        .map_err(|e| PakError::decryption(format!("directory IV: {e}")))?;
    let directory_iv = InitVector::from_prefix(&message).ok_or_else(|| {
        PakError::decryption(format!(
            "directory IV: {}",
            CryptoError::ShortMessage {
                needed: CIPHER_KEY_SIZE,
                actual: message.len(),
            }
        ))
    })?;

    tracing::debug!(keys = KEY_TABLE_SIZE, padding = padding.name(), "key table unwrapped");
    Ok(KeySet::new(keys, directory_iv))
}

fn short(index: usize, actual: usize) -> PakError {
    PakError::decryption(format!(
        "key {index}: {}",
        CryptoError::ShortMessage {
            needed: CIPHER_KEY_SIZE,
            actual,
        }
    ))
}
