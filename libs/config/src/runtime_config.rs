//! Runtime Configuration Module
//!
//! Loads executor and logging settings from TOML with environment-specific
//! overlays and environment variable overrides.

use crate::logging::LoggingConfig;
use actor_dispatch::ExecutorConfig;

use anyhow::{Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location of the base configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/dispatch.toml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "ACTOR_DISPATCH";

/// Main runtime configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Executor thread settings
    pub executor: ExecutorConfig,

    /// Tracing subscriber settings
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Load configuration from files with environment overrides.
    ///
    /// An explicitly given `base_path` must exist; the default path is
    /// optional.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        Self::load_with_env_prefix(base_path, environment, ENV_PREFIX)
    }

    /// Same as [`RuntimeConfig::load`] with a custom environment prefix
    pub fn load_with_env_prefix(
        base_path: Option<&Path>,
        environment: Option<&str>,
        env_prefix: &str,
    ) -> Result<Self> {
        let (base, required) = match base_path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let mut builder = Config::builder().add_source(File::from(base.as_path()).required(required));

        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // e.g. ACTOR_DISPATCH__EXECUTOR__WAIT_STRATEGY=per_executor
        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let runtime: RuntimeConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        runtime.validate()?;

        debug!(
            executor = %runtime.executor.thread_name,
            wait_strategy = ?runtime.executor.wait_strategy,
            log_level = %runtime.logging.level,
            "Runtime configuration loaded"
        );
        Ok(runtime)
    }

    /// Parse a TOML document without consulting files or the environment
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()
            .context("Failed to parse configuration")?;

        let runtime: RuntimeConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        runtime.validate()?;
        Ok(runtime)
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Reject settings the executor cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.executor.thread_name.trim().is_empty() {
            anyhow::bail!("executor.thread_name must not be empty");
        }
        if self.executor.thread_name.contains('\0') {
            anyhow::bail!("executor.thread_name must not contain NUL bytes");
        }
        if let Some(stack_size) = self.executor.stack_size {
            if stack_size < 64 * 1024 {
                anyhow::bail!(
                    "executor.stack_size of {} bytes is below the 64 KiB minimum",
                    stack_size
                );
            }
        }
        Ok(())
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(environment: Option<&str>) -> Result<RuntimeConfig> {
    RuntimeConfig::load(None, environment)
}
