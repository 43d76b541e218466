use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type PakResult<T> = Result<T, PakError>;

/// Boundary error code. Numeric values are stable and double as the CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    None = 0,
    Unknown = 1,
    FileNotFound = 2,
    CdrNotFound = 3,
    DecryptionFailed = 4,
    ReadKeyFailed = 5,
    NoExtendedHeader = 6,
    UnsupportedEncryption = 7,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::None,
        ErrorCode::Unknown,
        ErrorCode::FileNotFound,
        ErrorCode::CdrNotFound,
        ErrorCode::DecryptionFailed,
        ErrorCode::ReadKeyFailed,
        ErrorCode::NoExtendedHeader,
        ErrorCode::UnsupportedEncryption,
    ];

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a raw code back to its variant. Unrecognised values collapse to `Unknown`.
    pub fn from_i32(code: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_i32() == code)
            .unwrap_or(ErrorCode::Unknown)
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::None => "No error",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::FileNotFound => "File not found",
            ErrorCode::CdrNotFound => "CDR not found",
            ErrorCode::DecryptionFailed => "Decryption failed",
            ErrorCode::ReadKeyFailed => "Failed to read key file",
            ErrorCode::NoExtendedHeader => "No extended header",
            ErrorCode::UnsupportedEncryption => "Unsupported encryption",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Error)]
pub enum PakError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read public key: {0}")]
    ReadKey(String),

    #[error("central directory end record not found")]
    CdrNotFound,

    #[error("no extended header: {0}")]
    NoExtendedHeader(String),

    #[error("unsupported encryption type {0}")]
    UnsupportedEncryption(u16),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("corrupt central directory: {0}")]
    CorruptDirectory(String),

    #[error("archive truncated: {0}")]
    Truncated(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PakError {
    pub fn decryption(err: impl fmt::Display) -> Self {
        PakError::DecryptionFailed(err.to_string())
    }

    /// Collapse to the boundary code. A corrupt directory is almost always the
    /// product of a wrong key, so it reports as a decryption failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            PakError::FileNotFound(_) => ErrorCode::FileNotFound,
            PakError::ReadKey(_) => ErrorCode::ReadKeyFailed,
            PakError::CdrNotFound => ErrorCode::CdrNotFound,
            PakError::NoExtendedHeader(_) => ErrorCode::NoExtendedHeader,
            PakError::UnsupportedEncryption(_) => ErrorCode::UnsupportedEncryption,
            PakError::DecryptionFailed(_) | PakError::CorruptDirectory(_) => {
                ErrorCode::DecryptionFailed
            }
            PakError::Truncated(_) | PakError::Io(_) | PakError::Other(_) => ErrorCode::Unknown,
        }
    }
}

impl From<&PakError> for ErrorCode {
    fn from(err: &PakError) -> Self {
        err.code()
    }
}

impl<T> From<&PakResult<T>> for ErrorCode {
    fn from(result: &PakResult<T>) -> Self {
        match result {
            Ok(_) => ErrorCode::None,
            Err(e) => e.code(),
        }
    }
}
