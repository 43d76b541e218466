pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorCode, PakError, PakResult};
pub use types::{CompressionMethod, EncryptionType};
