//! Configuration management
//!
//! Loads the anypath configuration file. anypath never writes it.
//! The configuration file is stored in TOML format at ~/.config/anypath/config.toml.
//! Set `ANYPATH_CONFIG_DIR` to use a different directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::traits::DEFAULT_CONCURRENCY;

/// Configuration schema version; files carrying any other version are rejected
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "ANYPATH_CONFIG_DIR";

/// Default S3 region when neither config nor environment names one
const DEFAULT_REGION: &str = "us-east-1";

/// Files above this size are uploaded in parts (64 MiB)
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Default multipart part size (8 MiB)
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version of the file
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Bucket store settings
    #[serde(default)]
    pub s3: S3Settings,

    /// Blob container store settings
    #[serde(default)]
    pub azure: AzureSettings,
}

/// Default settings for transfers and CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Root of the local cache (system temp dir + `AnyPath` when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<PathBuf>,

    /// Concurrent object transfers within one bulk operation
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Show progress spinners
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Settings for S3 and S3-compatible stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Settings {
    /// Custom endpoint URL (MinIO, RustFS, localstack...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Region
    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style addressing instead of virtual-hosted buckets
    #[serde(default)]
    pub force_path_style: bool,

    /// Static access key; the SDK credential chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Static secret key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Files larger than this are uploaded with multipart upload
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: u64,

    /// Size of each multipart part
    #[serde(default = "default_part_size")]
    pub part_size: u64,
}

/// Settings for Azure Blob Storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureSettings {
    /// Custom endpoint URL (Azurite)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Allow plain HTTP endpoints
    #[serde(default)]
    pub allow_http: bool,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_true() -> bool {
    true
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_multipart_threshold() -> u64 {
    DEFAULT_MULTIPART_THRESHOLD
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            cache_root: None,
            concurrency: DEFAULT_CONCURRENCY,
            progress: true,
        }
    }
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            force_path_style: false,
            access_key: None,
            secret_key: None,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            s3: S3Settings::default(),
            azure: AzureSettings::default(),
        }
    }
}

/// Locates and loads the configuration file
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("anypath"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content)?;

        if config.schema_version != SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is not supported (expected {}): {}",
                config.schema_version,
                SCHEMA_VERSION,
                self.config_path.display()
            )));
        }

        if config.defaults.concurrency == 0 {
            return Err(Error::Config(
                "defaults.concurrency must be at least 1".into(),
            ));
        }

        tracing::debug!(path = %self.config_path.display(), "Loaded configuration");
        Ok(config)
    }
}
