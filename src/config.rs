//! Bus configuration.
//!
//! Sources, lowest precedence first:
//! 1. `corebus.yaml` in the working directory (optional)
//! 2. the file passed to [`BusConfig::load`]
//! 3. the file named by `COREBUS_CONFIG`
//! 4. `COREBUS__*` environment variables, e.g. `COREBUS__RETRY__MAX_COUNT=5`

use serde::Deserialize;

use crate::error::{BusError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "corebus";
pub const CONFIG_ENV_VAR: &str = "COREBUS_CONFIG";
pub const CONFIG_ENV_PREFIX: &str = "COREBUS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub worker: WorkerConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Pause after an empty poll, in milliseconds.
    pub idle_sleep_ms: u64,
    /// Stop after this many handled messages. 0 means no limit.
    pub limit: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 1000,
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_count: u64,
    pub delay_ms: u64,
    /// Retry serialization failures in process before requeuing.
    pub retry_without_requeue_on_transaction_failure: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_count: crate::retry::DEFAULT_RETRY_MAX,
            delay_ms: crate::retry::DEFAULT_RETRY_DELAY,
            retry_without_requeue_on_transaction_failure: true,
        }
    }
}

impl BusConfig {
    pub fn load(path: Option<&str>) -> Result<Self> {
        use ::config::{Config, Environment, File, FileFormat};

        let mut builder = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&path, FileFormat::Yaml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(Config::try_deserialize::<BusConfig>)
            .map_err(|e| BusError::Configuration(e.to_string()))
    }
}
