//! # Dispatch Runtime Configuration
//!
//! Configuration loading and logging setup shared by every binary and
//! service built on `actor-dispatch`.
//!
//! ## Sources, lowest to highest precedence
//!
//! 1. Built-in defaults
//! 2. Base TOML file (`config/dispatch.toml` unless a path is given)
//! 3. Environment overlay `environments/<env>.toml` next to the base file
//! 4. `ACTOR_DISPATCH__*` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dispatch_config::{init_logging, RuntimeConfig};
//!
//! let config = RuntimeConfig::load(None, Some("staging"))?;
//! init_logging(&config.logging)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod runtime_config;

pub use logging::{init_logging, LoggingConfig};
pub use runtime_config::{load_config, RuntimeConfig, DEFAULT_CONFIG_PATH, ENV_PREFIX};
