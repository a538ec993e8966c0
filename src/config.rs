// Typed configuration.
//
// A `DiffableConfig` is resolved once (defaults, an optional properties
// file, CLI flags) and handed to the store, codec and monitor by value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::hash::config::{DEFAULT_BLOCK_SIZE, DEFAULT_PRIME_BASE, DEFAULT_PRIME_MOD, HashParams};
use crate::properties::{self, PropertiesError};

/// Store folder name used when no location is configured.
pub const DEFAULT_STORE_DIR: &str = ".diffable";

/// Prefix marking a store location as a literal file-system path.
pub const FILE_URI_SCHEME_PREFIX: &str = "file://";

/// Default delay between two monitor passes.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(2000);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Syntax(#[from] PropertiesError),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("{0}")]
    Invalid(&'static str),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffableConfig {
    /// Store location: `file://` path, absolute path, or a path relative to
    /// the base directory. `None` means `<base>/.diffable`.
    pub store_location: Option<String>,
    /// Block width for the delta codec, in characters.
    pub block_size: usize,
    /// Serve current content from memory instead of re-reading the file.
    pub keep_in_memory: bool,
    /// Delay between monitor passes.
    pub monitor_interval: Duration,
    pub prime_base: u64,
    pub prime_mod: u64,
}

impl Default for DiffableConfig {
    fn default() -> Self {
        Self {
            store_location: None,
            block_size: DEFAULT_BLOCK_SIZE,
            keep_in_memory: true,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            prime_base: DEFAULT_PRIME_BASE,
            prime_mod: DEFAULT_PRIME_MOD,
        }
    }
}

impl DiffableConfig {
    /// Overlay settings from properties text onto the defaults.
    ///
    /// Recognized keys: `ResourceStorePath`, `BlockSize`,
    /// `KeepResourcesInMemory`, `ResourceMonitorInterval` (milliseconds),
    /// `PrimeBase`, `PrimeMod`.
    pub fn from_properties(text: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for (key, value) in properties::parse(text)? {
            let v = value.trim();
            match key.as_str() {
                "ResourceStorePath" => {
                    cfg.store_location = (!v.is_empty()).then(|| v.to_string());
                }
                "BlockSize" => cfg.block_size = parse_value(&key, v)?,
                "KeepResourcesInMemory" => cfg.keep_in_memory = parse_bool(&key, v)?,
                "ResourceMonitorInterval" => {
                    cfg.monitor_interval = Duration::from_millis(parse_value(&key, v)?);
                }
                "PrimeBase" => cfg.prime_base = parse_value(&key, v)?,
                "PrimeMod" => cfg.prime_mod = parse_value(&key, v)?,
                _ => log::warn!("ignoring unknown config key {key:?}"),
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a properties file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_properties(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block size must be at least 1"));
        }
        if self.prime_mod < 2 {
            return Err(ConfigError::Invalid("prime modulus must be at least 2"));
        }
        if self.monitor_interval.is_zero() {
            return Err(ConfigError::Invalid("monitor interval must be positive"));
        }
        Ok(())
    }

    pub fn hash_params(&self) -> HashParams {
        HashParams {
            prime_base: self.prime_base,
            prime_mod: self.prime_mod,
        }
    }

    /// Where the store lives for the given base directory.
    pub fn resolve_store_root(&self, base_dir: &Path) -> PathBuf {
        match self.store_location.as_deref() {
            None => base_dir.join(DEFAULT_STORE_DIR),
            Some(loc) => match loc.strip_prefix(FILE_URI_SCHEME_PREFIX) {
                Some(literal) => PathBuf::from(literal),
                None => {
                    let p = Path::new(loc);
                    if p.is_absolute() {
                        p.to_path_buf()
                    } else {
                        base_dir.join(p)
                    }
                }
            },
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
