//! Rebuilds a plain archive around decrypted entries
//!
//! Entries are written first, each record's local-header offset rewritten to
//! where it landed. `finish` then appends the directory and a fresh end
//! record with no comment.

use std::io::Write;

use anyhow::anyhow;
use cpak_core::PakResult;

use crate::directory::DirectoryRecord;
use crate::format::EndRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblySummary {
    pub entries: usize,
    pub directory_offset: u32,
    pub directory_size: u32,
    pub bytes_written: u64,
}

pub struct Reassembler<W> {
    output: W,
    position: u64,
    directory: Vec<DirectoryRecord>,
}

impl<W: Write> Reassembler<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            position: 0,
            directory: Vec::new(),
        }
    }

    /// Output position, i.e. where the next entry will start
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Record the current position as the entry's new offset, then let
    /// `write` emit the entry. `write` returns the number of bytes it wrote.
    pub fn push_entry<F>(&mut self, mut record: DirectoryRecord, write: F) -> PakResult<()>
    where
        F: FnOnce(&mut W) -> PakResult<u64>,
    {
        record.header.local_header_offset = offset32(self.position, "entry")?;
        self.position += write(&mut self.output)?;
        self.directory.push(record);
        Ok(())
    }

    /// Append the directory and end record, flush, and hand back the sink.
    pub fn finish(mut self) -> PakResult<(W, ReassemblySummary)> {
        let directory_offset = offset32(self.position, "directory")?;

        for record in &self.directory {
            record.header.write_to(&mut self.output)?;
            self.output.write_all(&record.trailing)?;
            self.position += record.encoded_len() as u64;
        }
        let directory_size = offset32(self.position - directory_offset as u64, "directory size")?;

        let entries = u16::try_from(self.directory.len())
            .map_err(|_| anyhow!("{} entries do not fit an end record", self.directory.len()))?;
        EndRecord {
            entries_on_disk: entries,
            entries_total: entries,
            directory_size,
            directory_offset,
            ..Default::default()
        }
        .write_to(&mut self.output)?;
        self.position += EndRecord::SIZE as u64;
        self.output.flush()?;

        let summary = ReassemblySummary {
            entries: self.directory.len(),
            directory_offset,
            directory_size,
            bytes_written: self.position,
        };
        Ok((self.output, summary))
    }
}

fn offset32(value: u64, what: &str) -> PakResult<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{what} offset {value} exceeds 4 GiB").into())
}
