//! Configuration management module for the relay.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Optional `config/default.toml`
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides
//! - Component-wise validation
mod firebase;
mod retry;
mod server;
mod watcher;
pub use firebase::*;
pub use retry::*;
pub use server::*;
pub use watcher::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment prefix for relay settings, e.g. `FIREGUARD__SERVER__PORT`
pub const ENV_PREFIX: &str = "FIREGUARD";

/// Main configuration container for the relay
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. `config/default.toml` when present
/// 3. Configuration file specified by `CONFIG_PATH`
/// 4. Environment variables with `FIREGUARD__` prefix
/// 5. Hosting platform conventions `PORT` and `FIREBASE_DATABASE_URL` (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RelayConfig {
    /// HTTP surface and logging
    #[serde(default)]
    pub server: ServerConfig,
    /// Realtime database and messaging endpoints
    #[serde(default)]
    pub firebase: FirebaseConfig,
    /// Change subscription behaviour
    #[serde(default)]
    pub watcher: WatcherConfig,
}

impl RelayConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call `validate()` before using the configuration.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name("config/default").required(false));

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .set_override_option("server.port", non_empty_var("PORT"))?
            .set_override_option("firebase.database_url", non_empty_var("FIREBASE_DATABASE_URL"))?;

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.firebase.validate()?;
        self.watcher.validate()?;
        Ok(self)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
