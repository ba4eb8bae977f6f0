//! Runtime configuration (`SPEC_FULL.md` §2a).
//!
//! A typed struct with a [`Default`], a [`RuntimeConfig::from_file`] TOML
//! loader, and environment-variable overrides applied on top — the shape
//! `toka-config-cli::config` and `runtime::config::RuntimeConfig::from_env`
//! use, minus the CRUD file-editing surface neither this engine nor its
//! integrators need.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors loading or validating a [`RuntimeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file's contents did not parse as valid TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path whose contents failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// An environment-variable override held a value of the wrong type.
    #[error("environment variable {var} holds an invalid value: {value}")]
    InvalidEnvOverride {
        /// The offending variable's name.
        var: &'static str,
        /// Its raw value.
        value: String,
    },
    /// A field failed validation after loading.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration: heartbeat bounds, sweep interval, event-log
/// buffer size, and cut retention (`SPEC_FULL.md` §2a, §4.4, §4.6, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Minimum `stream.open` heartbeat interval, in seconds. Requests below
    /// this are clamped up (`spec.md` §4.8).
    pub heartbeat_min_sec: u32,
    /// Maximum `stream.open` heartbeat interval, in seconds. Requests above
    /// this are clamped down.
    pub heartbeat_max_sec: u32,
    /// Interval between [`tap_engine::AllocationEngine::sweep_expired_holds`]
    /// runs, in seconds. Zero disables the background sweeper entirely,
    /// leaving expiry to lazy observation only (useful for deterministic
    /// tests that want to see pure lazy-expiry behavior).
    pub sweep_interval_sec: u64,
    /// Per-subscription catch-up/bootstrap channel buffer size
    /// (`tap_bus_core::StreamMultiplexer::open`'s `buffer` parameter
    /// default).
    pub stream_buffer_size: usize,
    /// How many [`tap_store_core::Cut`]s the Cut Manager retains before the
    /// oldest becomes eligible for eviction. `spec.md` §4.6 leaves retention
    /// "an integrator decision"; this reference runtime does not currently
    /// enforce eviction (`tap_engine::AllocationEngine`'s `CutManager` keeps
    /// every cut unboundedly — see `DESIGN.md`), but the config field is
    /// wired through so a future eviction pass has somewhere to read it
    /// from without another config-format migration.
    pub cut_retention: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_min_sec: 1,
            heartbeat_max_sec: 300,
            sweep_interval_sec: 30,
            stream_buffer_size: 256,
            cut_retention: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML file, falling back to [`Default`] for any field the
    /// file omits (`#[serde(default)]` above).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TAP_*` environment-variable overrides on top of the current
    /// values, then re-validate. Unset variables leave their field
    /// untouched; this mirrors `runtime::config::StripeConfig::from_env`'s
    /// one-variable-per-field style rather than pulling in a config crate.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_u32("TAP_HEARTBEAT_MIN_SEC")? {
            self.heartbeat_min_sec = v;
        }
        if let Some(v) = env_u32("TAP_HEARTBEAT_MAX_SEC")? {
            self.heartbeat_max_sec = v;
        }
        if let Some(v) = env_u64("TAP_SWEEP_INTERVAL_SEC")? {
            self.sweep_interval_sec = v;
        }
        if let Some(v) = env_usize("TAP_STREAM_BUFFER_SIZE")? {
            self.stream_buffer_size = v;
        }
        if let Some(v) = env_usize("TAP_CUT_RETENTION")? {
            self.cut_retention = v;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_min_sec == 0 {
            return Err(ConfigError::Invalid("heartbeat_min_sec must be at least 1".to_owned()));
        }
        if self.heartbeat_min_sec > self.heartbeat_max_sec {
            return Err(ConfigError::Invalid(
                "heartbeat_min_sec must not exceed heartbeat_max_sec".to_owned(),
            ));
        }
        if self.stream_buffer_size == 0 {
            return Err(ConfigError::Invalid("stream_buffer_size must be at least 1".to_owned()));
        }
        Ok(())
    }
}

fn env_u32(var: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvOverride { var, value }),
        Err(_) => Ok(None),
    }
}

fn env_u64(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvOverride { var, value }),
        Err(_) => Ok(None),
    }
}

fn env_usize(var: &'static str) -> Result<Option<usize>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvOverride { var, value }),
        Err(_) => Ok(None),
    }
}
