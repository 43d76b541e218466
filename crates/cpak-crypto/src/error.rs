use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("wrapped block is {actual} bytes, modulus is {expected} bytes")]
    BlockSize { expected: usize, actual: usize },

    #[error("wrapped block is not smaller than the modulus")]
    OutOfRange,

    #[error("invalid {0} padding")]
    Padding(&'static str),

    #[error("unwrapped message too short: {actual} bytes (need {needed})")]
    ShortMessage { needed: usize, actual: usize },

    #[error("cipher setup failed: {0}")]
    Cipher(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
