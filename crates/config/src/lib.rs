//! Configuration for the drive metadata cache.
//!
//! Values are layered with `figment`, later sources overriding earlier ones:
//! 1. Built-in defaults ([`CacheConfig::default`]).
//! 2. An optional configuration file (TOML, YAML or JSON, picked by extension).
//! 3. Environment variables prefixed with `STRATUS_` (e.g. `STRATUS_WORKERS=8`).
//!
//! The data-source name is the only thing the cache strictly needs; the rest
//! are tuning knobs.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "STRATUS_";
const DEFAULT_WORKERS: usize = 5;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 1500;
const DEFAULT_FILENAME: &str = "cache.sqlite";

/// Settings consumed by the cache facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Data-source name: a filesystem path or an `sqlite:` URL.
    pub dsn: String,
    /// Upper bound on cache operations in flight at the same time.
    pub workers: usize,
    /// How long a connection waits on a locked database before giving up.
    pub busy_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn().to_string_lossy().into_owned(),
            workers: DEFAULT_WORKERS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

fn default_dsn() -> PathBuf {
    match directories::ProjectDirs::from("", "stratus", "stratus") {
        Some(dirs) => dirs.cache_dir().join(DEFAULT_FILENAME),
        // No home directory (containers, CI); fall back to the working directory.
        None => PathBuf::from(DEFAULT_FILENAME),
    }
}

impl CacheConfig {
    /// Create a config pointing at `dsn`, all other settings at their defaults.
    pub fn new(dsn: impl Into<String>) -> Self {
        Self { dsn: dsn.into(), ..Self::default() }
    }

    /// Load the layered configuration.
    ///
    /// A `file` that is given but doesn't exist is an error; pass `None` to
    /// use only defaults and the environment.
    #[instrument]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            if !path.is_file() {
                exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a config from an already-assembled figment.
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        tracing::debug!(dsn = %config.dsn, workers = config.workers, "Loaded cache configuration");
        Ok(config)
    }

    /// Check values that deserialize fine but can't be used.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers"));
        }
        let dsn = self.dsn.trim();
        if dsn.is_empty() {
            exn::bail!(ErrorKind::Invalid("dsn"));
        }
        // Every operation opens its own connection, and each in-memory
        // connection is its own (empty) database.
        if dsn == ":memory:" || dsn.starts_with("sqlite::memory:") || dsn.contains("mode=memory") {
            exn::bail!(ErrorKind::Invalid("dsn"));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
