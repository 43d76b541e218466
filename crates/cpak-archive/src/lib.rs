//! cpak-archive: decryption pipeline for key-table encrypted pak archives
//!
//! ```text
//! locate end record → read trailer → unwrap key table → decrypt directory
//!   → per entry: derive key/IV, decrypt header, body, descriptor
//!   → write directory with rewritten offsets + fresh end record
//! ```
//!
//! The entry points are [`decrypt_archive`], [`list_entries`] and
//! [`extract_entries`]; [`PakSession`] exposes the intermediate state.

pub mod directory;
pub mod entry;
mod error;
pub mod format;
pub mod locate;
mod ops;
pub mod reassemble;
pub mod session;
pub mod trailer;

pub use cpak_core::{ErrorCode, PakError, PakResult};
pub use ops::{
    decrypt_archive, decrypt_archive_with, extract_entries, extract_entries_with, list_entries,
    list_entries_with,
};
pub use reassemble::ReassemblySummary;
pub use session::{DecryptOptions, PakSession};
