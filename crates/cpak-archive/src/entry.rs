//! Per-entry decryption
//!
//! Every entry is encrypted with one key from the table and an IV derived
//! from its directory metadata. The local header, body and trailing
//! descriptor are separate CTR sections, each starting at keystream block 0.

use std::io::{Read, Seek, SeekFrom, Write};

use cpak_core::{PakError, PakResult};
use cpak_crypto::{CipherKey, CryptoSuite, InitVector, KeySet, KEY_TABLE_SIZE};

use crate::error::{read_failed, section_failed};
use crate::format::{
    DirectoryEntry, LocalHeader, DATA_DESCRIPTOR_SIZE, END_RECORD_SIGNATURE,
    SIGNED_DATA_DESCRIPTOR_SIZE,
};

/// IV words from the entry's sizes and CRC; shifts wrap at 32 bits.
pub fn entry_iv(crc32: u32, compressed_size: u32, uncompressed_size: u32) -> InitVector {
    let c = compressed_size;
    let u = uncompressed_size;
    InitVector::from_words([
        u ^ c.wrapping_shl(12),
        (c == 0) as u32,
        crc32 ^ c.wrapping_shl(12),
        ((u == 0) as u32) ^ c,
    ])
}

/// Index into the key table, always in `0..16`.
pub fn key_index(crc32: u32) -> usize {
    (!(crc32 >> 2) & 0x0F) as usize
}

pub fn entry_key<'k>(keys: &'k KeySet, header: &DirectoryEntry) -> PakResult<&'k CipherKey> {
    let index = key_index(header.crc32);
    keys.key(index).ok_or_else(|| {
        PakError::decryption(format!("key index {index} outside table of {KEY_TABLE_SIZE}"))
    })
}

/// Decrypts entries of one archive, writing each decrypted record to a sink.
pub struct EntryDecryptor<'s> {
    suite: &'s CryptoSuite,
    keys: &'s KeySet,
}

impl<'s> EntryDecryptor<'s> {
    pub fn new(suite: &'s CryptoSuite, keys: &'s KeySet) -> Self {
        Self { suite, keys }
    }

    /// Decrypt the entry described by `header` from `input` into `output`.
    ///
    /// Writes the local header with its name and extra field, the body, and
    /// the data descriptor when the local flags announce one. Returns the
    /// number of bytes written.
    pub fn decrypt_entry<R, W>(
        &self,
        input: &mut R,
        output: &mut W,
        header: &DirectoryEntry,
    ) -> PakResult<u64>
    where
        R: Read + Seek + ?Sized,
        W: Write + ?Sized,
    {
        let key = entry_key(self.keys, header)?;
        let iv = entry_iv(
            header.crc32,
            header.compressed_size,
            header.uncompressed_size,
        );
        let offset = header.local_header_offset as u64;

        // Probe the local header for its variable lengths and flags.
        input.seek(SeekFrom::Start(offset))?;
        let mut probe = [0u8; LocalHeader::SIZE];
        input
            .read_exact(&mut probe)
            .map_err(|e| read_failed(e, "local header"))?;
        self.suite
            .decrypt_in_place(key, &iv, &mut probe)
            .map_err(|e| section_failed(e, "local header"))?;
        let local = LocalHeader::read_from(&mut &probe[..])?;

        input.seek(SeekFrom::Start(offset))?;
        let mut written = self
            .suite
            .decrypt_section(input, output, local.total_length(), key, &iv)
            .map_err(|e| section_failed(e, "local header"))?;

        if header.compressed_size > 0 {
            written += self
                .suite
                .decrypt_section(input, output, header.compressed_size as u64, key, &iv)
                .map_err(|e| section_failed(e, "entry body"))?;
        }

        if local.has_data_descriptor() {
            let len = self.descriptor_length(input, key, &iv)?;
            written += self
                .suite
                .decrypt_section(input, output, len, key, &iv)
                .map_err(|e| section_failed(e, "data descriptor"))?;
        }

        tracing::trace!(offset, written, "entry decrypted");
        Ok(written)
    }

    /// Peek at the descriptor: 12 bytes if its first word decrypts to the
    /// end-record signature, 16 otherwise. Leaves the input where it was.
    fn descriptor_length<R>(
        &self,
        input: &mut R,
        key: &CipherKey,
        iv: &InitVector,
    ) -> PakResult<u64>
    where
        R: Read + Seek + ?Sized,
    {
        let mut peek = [0u8; 4];
        input
            .read_exact(&mut peek)
            .map_err(|e| read_failed(e, "data descriptor"))?;
        input.seek(SeekFrom::Current(-4))?;

        self.suite
            .decrypt_in_place(key, iv, &mut peek)
            .map_err(|e| section_failed(e, "data descriptor"))?;

        Ok(if u32::from_le_bytes(peek) == END_RECORD_SIGNATURE {
            DATA_DESCRIPTOR_SIZE
        } else {
            SIGNED_DATA_DESCRIPTOR_SIZE
        })
    }
}
