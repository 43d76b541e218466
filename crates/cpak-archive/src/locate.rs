//! Backward scan for the end-of-directory record

use std::io::{Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};
use cpak_core::{PakError, PakResult};

use crate::error::read_failed;
use crate::format::{EndRecord, END_RECORD_SIGNATURE};

/// The end record plus its comment always fit in the last 64 KiB.
pub const MAX_SEARCH_WINDOW: u64 = 0xFFFF;

/// Absolute offset of the end record in `input`.
///
/// A signature only counts when the record's declared comment length reaches
/// exactly to the end of the stream, so signature bytes that happen to appear
/// inside the trailer are skipped.
pub fn locate_end_record<R: Read + Seek + ?Sized>(input: &mut R) -> PakResult<u64> {
    let file_size = input.seek(SeekFrom::End(0))?;
    if file_size < EndRecord::SIZE as u64 {
        return Err(PakError::CdrNotFound);
    }

    let window_len = file_size.min(MAX_SEARCH_WINDOW);
    let window_start = file_size - window_len;
    input.seek(SeekFrom::Start(window_start))?;

    let mut window = vec![0u8; window_len as usize];
    input
        .read_exact(&mut window)
        .map_err(|e| read_failed(e, "end-record search window"))?;

    let pos = find_in_window(&window).ok_or(PakError::CdrNotFound)?;
    let offset = window_start + pos as u64;
    tracing::debug!(offset, file_size, "located end record");
    Ok(offset)
}

/// Closest-to-end offset in `window` holding a self-consistent end record.
pub fn find_in_window(window: &[u8]) -> Option<usize> {
    let last = window.len().checked_sub(EndRecord::SIZE)?;
    let signature = END_RECORD_SIGNATURE.to_le_bytes();

    (0..=last).rev().find(|&pos| {
        window[pos..pos + 4] == signature
            && LittleEndian::read_u16(&window[pos + 20..pos + 22]) as usize
                == window.len() - (pos + EndRecord::SIZE)
    })
}
