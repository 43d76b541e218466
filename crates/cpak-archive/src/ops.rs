//! Whole-archive operations: decrypt, list, extract

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use cpak_core::PakResult;
use cpak_crypto::CryptoSuite;

use crate::reassemble::{Reassembler, ReassemblySummary};
use crate::session::{DecryptOptions, PakSession};

/// Decrypt `input` into a plain archive at `output`.
pub fn decrypt_archive(input: &Path, output: &Path, public_key: &[u8]) -> PakResult<()> {
    decrypt_archive_with(input, output, public_key, &DecryptOptions::default()).map(|_| ())
}

pub fn decrypt_archive_with(
    input: &Path,
    output: &Path,
    public_key: &[u8],
    options: &DecryptOptions,
) -> PakResult<ReassemblySummary> {
    let mut session = PakSession::open(CryptoSuite::global(), input, public_key, options)?;

    let mut reassembler = Reassembler::new(BufWriter::new(File::create(output)?));
    for record in session.take_records() {
        let header = record.header;
        reassembler.push_entry(record, |out| session.decrypt_entry(&header, out))?;
    }
    let (_, summary) = reassembler.finish()?;

    if let Some(digest) = session.directory_digest(output) {
        tracing::debug!(%digest, "directory digest");
    }
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        entries = summary.entries,
        bytes = summary.bytes_written,
        "archive decrypted"
    );
    Ok(summary)
}

/// Entry names in directory order.
pub fn list_entries(input: &Path, public_key: &[u8]) -> PakResult<Vec<String>> {
    list_entries_with(input, public_key, &DecryptOptions::default())
}

pub fn list_entries_with(
    input: &Path,
    public_key: &[u8],
    options: &DecryptOptions,
) -> PakResult<Vec<String>> {
    let session = PakSession::open(CryptoSuite::global(), input, public_key, options)?;
    let names = session.entry_names();
    tracing::debug!(entries = names.len(), "listed archive");
    Ok(names)
}

/// Decrypt only the named entries, each into its own buffer holding the
/// local header, body and descriptor. Names not in the archive are absent
/// from the result.
pub fn extract_entries<S: AsRef<str>>(
    input: &Path,
    public_key: &[u8],
    names: &[S],
) -> PakResult<HashMap<String, Vec<u8>>> {
    extract_entries_with(input, public_key, names, &DecryptOptions::default())
}

pub fn extract_entries_with<S: AsRef<str>>(
    input: &Path,
    public_key: &[u8],
    names: &[S],
    options: &DecryptOptions,
) -> PakResult<HashMap<String, Vec<u8>>> {
    let mut session = PakSession::open(CryptoSuite::global(), input, public_key, options)?;
    let wanted: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();

    let mut extracted = HashMap::with_capacity(wanted.len());
    for record in session.take_records() {
        let name = record.name();
        if !wanted.contains(name.as_str()) {
            continue;
        }
        let mut buf = Vec::new();
        session.decrypt_entry(&record.header, &mut buf)?;
        extracted.insert(name, buf);
    }

    tracing::info!(
        requested = wanted.len(),
        extracted = extracted.len(),
        "entries extracted"
    );
    Ok(extracted)
}
