//! # Configuration
//!
//! TOML configuration for the greeting text and the worker pool. Every field
//! has a default, so an empty or missing file is valid.
//!
//! Resolution order:
//! 1. An explicit path passed to [`HelloConfig::load`]
//! 2. The `HELLO_ASYNC_CONFIG` environment variable (a `.env` file is honored)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HelloError, HelloResult};
use crate::greeting::Greeting;

pub const CONFIG_PATH_ENV: &str = "HELLO_ASYNC_CONFIG";

/// libuv's default thread pool size
const DEFAULT_MAX_BLOCKING_THREADS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HelloConfig {
    pub greeting: Greeting,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PoolConfig {
    /// Async worker threads of an owned runtime
    pub worker_threads: usize,
    /// Upper bound on threads running task computations
    pub max_blocking_threads: usize,
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            max_blocking_threads: DEFAULT_MAX_BLOCKING_THREADS,
            thread_name: "hello-async-worker".to_string(),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> HelloResult<()> {
        if self.worker_threads == 0 {
            return Err(HelloError::config_error("pool.worker-threads must be at least 1"));
        }
        if self.max_blocking_threads == 0 {
            return Err(HelloError::config_error(
                "pool.max-blocking-threads must be at least 1",
            ));
        }
        Ok(())
    }
}

impl HelloConfig {
    /// Load configuration following the resolution order above.
    pub fn load(path: Option<&Path>) -> HelloResult<Self> {
        let _ = dotenvy::dotenv();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        match path {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> HelloResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HelloError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> HelloResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.pool.validate()?;
        Ok(config)
    }
}
