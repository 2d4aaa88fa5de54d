//! Configuration Module
//!
//! Engine configuration plus the server settings loaded from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{EvictionStrategy, DEFAULT_COMPRESSION_THRESHOLD};
use crate::error::{CacheError, Result};
use crate::transform::CompressionAlgorithm;

// == Cache Config ==
/// Constructor options for the cache engine.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied when `set` gives none; zero means entries never expire
    pub default_ttl: Duration,
    /// Byte capacity
    pub max_size: usize,
    /// Optional cap on the number of entries
    pub max_entries: Option<usize>,
    pub strategy: EvictionStrategy,
    pub compression_enabled: bool,
    /// Values must be strictly larger than this to be compressed
    pub compression_threshold: usize,
    pub compression_algorithm: CompressionAlgorithm,
    /// Requires a cipher to be supplied to the builder
    pub encryption_enabled: bool,
    /// Requires a persistence adapter to be supplied to the builder
    pub persistence_enabled: bool,
    pub sweep_interval: Duration,
    pub warm_interval: Duration,
    /// Maximum warm items written per warming tick
    pub warm_batch_size: usize,
    pub invalidation_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_size: 100 * 1024 * 1024,
            max_entries: None,
            strategy: EvictionStrategy::Lru,
            compression_enabled: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            compression_algorithm: CompressionAlgorithm::Lz4,
            encryption_enabled: false,
            persistence_enabled: false,
            sweep_interval: Duration::from_secs(60),
            warm_interval: Duration::from_secs(5),
            warm_batch_size: 10,
            invalidation_interval: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::Config("max_size must be greater than zero".into()));
        }
        if self.max_entries == Some(0) {
            return Err(CacheError::Config("max_entries must be greater than zero".into()));
        }
        if self.warm_batch_size == 0 {
            return Err(CacheError::Config("warm_batch_size must be greater than zero".into()));
        }
        for (name, interval) in [
            ("sweep_interval", self.sweep_interval),
            ("warm_interval", self.warm_interval),
            ("invalidation_interval", self.invalidation_interval),
        ] {
            if interval.is_zero() {
                return Err(CacheError::Config(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Snapshot file; persistence is enabled when set
    pub persistence_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SIZE` - Byte capacity (default: 100 MiB)
    /// - `MAX_ENTRIES` - Optional entry cap (default: unset)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `EVICTION_STRATEGY` - `lru`, `lfu` or `fifo` (default: lru)
    /// - `COMPRESSION_ENABLED` - (default: true)
    /// - `COMPRESSION_THRESHOLD` - Bytes (default: 1024)
    /// - `COMPRESSION_ALGORITHM` - `lz4` or `zstd` (default: lz4)
    /// - `PERSISTENCE_PATH` - Snapshot file path (default: unset, no persistence)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `WARM_INTERVAL` - Warming frequency in seconds (default: 5)
    /// - `INVALIDATION_INTERVAL` - Invalidator frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        let persistence_path = env::var("PERSISTENCE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let cache = CacheConfig {
            default_ttl: env_secs("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            max_size: env_parse("MAX_SIZE").unwrap_or(defaults.max_size),
            max_entries: env_parse("MAX_ENTRIES").or(defaults.max_entries),
            strategy: env_parse("EVICTION_STRATEGY").unwrap_or(defaults.strategy),
            compression_enabled: env_parse("COMPRESSION_ENABLED")
                .unwrap_or(defaults.compression_enabled),
            compression_threshold: env_parse("COMPRESSION_THRESHOLD")
                .unwrap_or(defaults.compression_threshold),
            compression_algorithm: env_parse("COMPRESSION_ALGORITHM")
                .unwrap_or(defaults.compression_algorithm),
            encryption_enabled: false,
            persistence_enabled: persistence_path.is_some(),
            sweep_interval: env_secs("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            warm_interval: env_secs("WARM_INTERVAL").unwrap_or(defaults.warm_interval),
            warm_batch_size: defaults.warm_batch_size,
            invalidation_interval: env_secs("INVALIDATION_INTERVAL")
                .unwrap_or(defaults.invalidation_interval),
        };

        Self {
            cache,
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            persistence_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            persistence_path: None,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_secs)
}
