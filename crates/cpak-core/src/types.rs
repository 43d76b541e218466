//! Code tables used by the encrypted pak format

/// Encryption scheme declared in the extended header that trails the end record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    None,
    StreamCipher,
    Tea,
    /// Per-entry keys drawn from an RSA-wrapped table. The only supported variant.
    StreamCipherKeytable,
}

impl EncryptionType {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(EncryptionType::None),
            1 => Some(EncryptionType::StreamCipher),
            2 => Some(EncryptionType::Tea),
            3 => Some(EncryptionType::StreamCipherKeytable),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            EncryptionType::None => 0,
            EncryptionType::StreamCipher => 1,
            EncryptionType::Tea => 2,
            EncryptionType::StreamCipherKeytable => 3,
        }
    }
}

/// ZIP compression method codes, including the format's encrypted variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,
    Deflate,
    DeflateAndEncrypt,
    DeflateAndStreamcipher,
    StoreAndStreamcipherKeytable,
    DeflateAndStreamcipherKeytable,
    Other(u16),
}

impl CompressionMethod {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => CompressionMethod::Store,
            8 => CompressionMethod::Deflate,
            11 => CompressionMethod::DeflateAndEncrypt,
            12 => CompressionMethod::DeflateAndStreamcipher,
            13 => CompressionMethod::StoreAndStreamcipherKeytable,
            14 => CompressionMethod::DeflateAndStreamcipherKeytable,
            other => CompressionMethod::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::DeflateAndEncrypt => 11,
            CompressionMethod::DeflateAndStreamcipher => 12,
            CompressionMethod::StoreAndStreamcipherKeytable => 13,
            CompressionMethod::DeflateAndStreamcipherKeytable => 14,
            CompressionMethod::Other(code) => code,
        }
    }

    /// The plain method a key-table encrypted variant stands for.
    /// Every other method is returned unchanged.
    pub fn decrypted(self) -> Self {
        match self {
            CompressionMethod::StoreAndStreamcipherKeytable => CompressionMethod::Store,
            CompressionMethod::DeflateAndStreamcipherKeytable => CompressionMethod::Deflate,
            other => other,
        }
    }
}
