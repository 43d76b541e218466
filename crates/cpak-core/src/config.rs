use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration (loaded from cpak.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpakConfig {
    pub log: LogConfig,
    pub keys: KeyConfig,
    pub decrypt: DecryptConfig,
    pub extract: ExtractConfig,
}

impl CpakConfig {
    /// Read a config file. `None` when the file does not exist; the caller
    /// decides whether that is worth reporting.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content)
            .map(Some)
            .with_context(|| format!("parsing config: {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or EnvFilter directive (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// RSA public key used to unwrap the archive key table (DER or PEM)
    pub public_key: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptConfig {
    /// Treat a central directory whose parsed length differs from its declared size as fatal
    pub strict_directory_size: bool,
    /// Log a SHA-256 digest of the encrypted directory and output path
    pub directory_digest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Destination directory for `cpak extract`
    pub output_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            strict_directory_size: true,
            directory_digest: true,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}
