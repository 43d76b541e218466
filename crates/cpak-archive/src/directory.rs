//! Central directory decryption and parsing
//!
//! The directory is one CTR section under key[0] and the directory IV. Once
//! decrypted it is walked strictly in file order: each record is a 46-byte
//! fixed part followed by its name, extra field and comment.

use cpak_core::{CompressionMethod, PakError, PakResult};
use cpak_crypto::{CryptoSuite, KeySet};

use crate::error::section_failed;
use crate::format::DirectoryEntry;

/// One central directory record: the fixed part plus its variable bytes,
/// kept verbatim so reassembly can write them back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub header: DirectoryEntry,
    pub trailing: Vec<u8>,
}

impl DirectoryRecord {
    pub fn name_bytes(&self) -> &[u8] {
        &self.trailing[..self.header.name_length as usize]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn encoded_len(&self) -> usize {
        DirectoryEntry::SIZE + self.trailing.len()
    }
}

/// Decrypt the raw directory bytes in place.
pub fn decrypt_directory(suite: &CryptoSuite, keys: &KeySet, raw: &mut [u8]) -> PakResult<()> {
    suite
        .decrypt_in_place(keys.directory_key(), keys.directory_iv(), raw)
        .map_err(|e| section_failed(e, "central directory"))
}

/// Yields directory records one at a time by running offset.
///
/// Method codes of the key-table variants are remapped to their plain
/// equivalents as records are read. A record that would run past the end of
/// the buffer ends the walk with `CorruptDirectory`.
#[derive(Debug)]
pub struct DirectoryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u16,
}

impl<'a> DirectoryCursor<'a> {
    pub fn new(buf: &'a [u8], entries_total: u16) -> Self {
        Self {
            buf,
            pos: 0,
            remaining: entries_total,
        }
    }

    /// Bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn read_record(&mut self) -> PakResult<DirectoryRecord> {
        let fixed_end = self.pos + DirectoryEntry::SIZE;
        let fixed = self.buf.get(self.pos..fixed_end).ok_or_else(|| {
            PakError::CorruptDirectory(format!(
                "record at {} overruns {}-byte directory",
                self.pos,
                self.buf.len()
            ))
        })?;
        let mut header = DirectoryEntry::read_from(&mut &fixed[..])?;

        let plain = CompressionMethod::from_code(header.method).decrypted();
        if plain.code() != header.method {
            tracing::trace!(from = header.method, to = plain.code(), "method remapped");
            header.method = plain.code();
        }

        let end = fixed_end + header.variable_length();
        let trailing = self.buf.get(fixed_end..end).ok_or_else(|| {
            PakError::CorruptDirectory(format!(
                "variable fields of record at {} overrun the directory",
                self.pos
            ))
        })?;

        let record = DirectoryRecord {
            header,
            trailing: trailing.to_vec(),
        };
        self.pos = end;
        Ok(record)
    }
}

impl Iterator for DirectoryCursor<'_> {
    type Item = PakResult<DirectoryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.read_record() {
            Ok(record) => {
                self.remaining -= 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

/// Walk all `entries_total` records of a decrypted directory.
///
/// Consuming fewer bytes than `declared_size` is fatal when `strict` is set
/// and only logged otherwise.
pub fn parse_directory(
    buf: &[u8],
    entries_total: u16,
    declared_size: u32,
    strict: bool,
) -> PakResult<Vec<DirectoryRecord>> {
    let mut cursor = DirectoryCursor::new(buf, entries_total);
    let records = cursor.by_ref().collect::<PakResult<Vec<_>>>()?;

    let consumed = cursor.consumed();
    if consumed != declared_size as usize {
        if strict {
            return Err(PakError::CorruptDirectory(format!(
                "parsed {consumed} bytes, directory declares {declared_size}"
            )));
        }
        tracing::warn!(consumed, declared_size, "directory size mismatch ignored");
    }

    tracing::debug!(entries = records.len(), bytes = consumed, "directory parsed");
    Ok(records)
}
