use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SesameError, SesameResult};

/// Top-level configuration (loaded from sesame.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SesameConfig {
    pub logging: LoggingConfig,
    pub envelope: EnvelopeConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info); RUST_LOG takes precedence
    pub level: String,
    /// Log format: "text" or "json"
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Envelope format written by new seals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvelopeFormat {
    /// Flag 0x01: AES-256-CBC, readable by every existing client
    LegacyCbc,
    /// Flag 0x02: AES-256-GCM
    Aead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Format for newly written envelopes (default: legacy-cbc)
    pub format: EnvelopeFormat,
    /// zlib level applied to the payload before encryption, 0 = off (default: 9)
    pub compression_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Persist the envelope to `sync_file`
    pub use_sync_file: bool,
    /// Envelope file path (default: ~/.local/share/sesame/sesame.bin)
    pub sync_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            format: EnvelopeFormat::LegacyCbc,
            compression_level: 9,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            use_sync_file: true,
            sync_file: PathBuf::from("~/.local/share/sesame/sesame.bin"),
        }
    }
}

impl SesameConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml(content: &str) -> SesameResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SesameError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> SesameResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| SesameError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> SesameResult<()> {
        if self.envelope.compression_level > 9 {
            return Err(SesameError::Config(format!(
                "envelope.compression_level must be 0-9, got {}",
                self.envelope.compression_level
            )));
        }
        if self.sync.use_sync_file && self.sync.sync_file.as_os_str().is_empty() {
            return Err(SesameError::Config(
                "sync.sync_file is empty but sync.use_sync_file is set".into(),
            ));
        }
        Ok(())
    }

    /// The sync file path with `~` expanded.
    pub fn sync_file(&self) -> PathBuf {
        expand_tilde(&self.sync.sync_file)
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}
