//! One open encrypted archive
//!
//! Opening runs the front half of the pipeline: locate the end record, read
//! the trailer, unwrap the key table and decrypt the central directory. The
//! session then owns the input, the key set and the parsed directory until it
//! drops.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use cpak_core::config::DecryptConfig;
use cpak_core::{PakError, PakResult};
use cpak_crypto::{digest_to_hex, CryptoSuite, KeySet, StreamingHash};

use crate::directory::{decrypt_directory, parse_directory, DirectoryRecord};
use crate::entry::EntryDecryptor;
use crate::error::read_failed;
use crate::format::{DirectoryEntry, EndRecord};
use crate::locate::locate_end_record;
use crate::trailer::{read_trailer, unwrap_key_set};

/// Knobs for one decryption call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptOptions {
    /// Fail when the parsed directory is shorter than its declared size
    pub strict_directory_size: bool,
    /// Log a SHA-256 of the encrypted directory and output path at debug level
    pub directory_digest: bool,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        Self {
            strict_directory_size: true,
            directory_digest: true,
        }
    }
}

impl From<&DecryptConfig> for DecryptOptions {
    fn from(config: &DecryptConfig) -> Self {
        Self {
            strict_directory_size: config.strict_directory_size,
            directory_digest: config.directory_digest,
        }
    }
}

pub struct PakSession<'s, R = BufReader<File>> {
    suite: &'s CryptoSuite,
    input: R,
    keys: KeySet,
    end: EndRecord,
    records: Vec<DirectoryRecord>,
    directory_hash: Option<StreamingHash>,
}

impl<'s> PakSession<'s> {
    /// Open an archive on disk. A missing file is `FileNotFound`; an
    /// unparseable key blob is `ReadKey`.
    pub fn open(
        suite: &'s CryptoSuite,
        path: &Path,
        public_key: &[u8],
        options: &DecryptOptions,
    ) -> PakResult<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PakError::FileNotFound(path.to_path_buf()),
            _ => PakError::Io(e),
        })?;
        tracing::debug!(path = %path.display(), "opened archive");
        Self::from_reader(suite, BufReader::new(file), public_key, options)
    }
}

impl<'s, R: Read + Seek> PakSession<'s, R> {
    pub fn from_reader(
        suite: &'s CryptoSuite,
        mut input: R,
        public_key: &[u8],
        options: &DecryptOptions,
    ) -> PakResult<Self> {
        let unwrapper = suite
            .import_public_key(public_key)
            .map_err(|e| PakError::ReadKey(e.to_string()))?;

        let end_offset = locate_end_record(&mut input)?;
        input.seek(SeekFrom::Start(end_offset))?;
        let end = EndRecord::read_from(&mut input).map_err(|e| read_failed(e, "end record"))?;

        let mut comment = vec![0u8; end.comment_length as usize];
        input
            .read_exact(&mut comment)
            .map_err(|e| read_failed(e, "trailer"))?;
        let trailer = read_trailer(&comment)?;
        let keys = unwrap_key_set(suite, &unwrapper, &trailer.encryption)?;

        let directory_end = end.directory_offset as u64 + end.directory_size as u64;
        if directory_end > end_offset {
            return Err(PakError::CorruptDirectory(format!(
                "directory at {} of {} bytes runs past the end record at {end_offset}",
                end.directory_offset, end.directory_size
            )));
        }

        input.seek(SeekFrom::Start(end.directory_offset as u64))?;
        let mut directory = vec![0u8; end.directory_size as usize];
        input
            .read_exact(&mut directory)
            .map_err(|e| read_failed(e, "central directory"))?;

        let directory_hash = options.directory_digest.then(|| {
            let mut hash = suite.start_sha256();
            hash.update(&directory);
            hash
        });

        decrypt_directory(suite, &keys, &mut directory)?;
        let records = parse_directory(
            &directory,
            end.entries_total,
            end.directory_size,
            options.strict_directory_size,
        )?;

        Ok(Self {
            suite,
            input,
            keys,
            end,
            records,
            directory_hash,
        })
    }

    /// Directory records in file order
    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.records.iter().map(DirectoryRecord::name).collect()
    }

    /// Move the directory out, sorted by local-header offset so entries are
    /// read front to back.
    pub fn take_records(&mut self) -> Vec<DirectoryRecord> {
        let mut records = std::mem::take(&mut self.records);
        records.sort_by_key(|r| r.header.local_header_offset);
        records
    }

    /// Decrypt one entry's local header, body and descriptor into `output`.
    pub fn decrypt_entry<W: Write + ?Sized>(
        &mut self,
        header: &DirectoryEntry,
        output: &mut W,
    ) -> PakResult<u64> {
        EntryDecryptor::new(self.suite, &self.keys).decrypt_entry(&mut self.input, output, header)
    }

    /// Hex SHA-256 over the encrypted directory bytes followed by the output
    /// path. `None` when digests are switched off.
    pub fn directory_digest(&self, output: &Path) -> Option<String> {
        let mut hash = self.directory_hash.clone()?;
        hash.update(output.to_string_lossy().as_bytes());
        Some(digest_to_hex(&hash.finalize()))
    }
}

impl<R> std::fmt::Debug for PakSession<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakSession")
            .field("entries", &self.records.len())
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}
