//! Conversions from I/O and provider failures into `PakError`

use std::io;

use cpak_core::PakError;
use cpak_crypto::CryptoError;

/// A read against the archive. Running out of bytes means the archive is
/// truncated; anything else stays an I/O error.
pub(crate) fn read_failed(err: io::Error, what: &str) -> PakError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        PakError::Truncated(what.to_string())
    } else {
        PakError::Io(err)
    }
}

/// A streamed section. Provider failures become `DecryptionFailed`.
pub(crate) fn section_failed(err: CryptoError, what: &str) -> PakError {
    match err {
        CryptoError::Io(e) => read_failed(e, what),
        other => PakError::DecryptionFailed(format!("{what}: {other}")),
    }
}
