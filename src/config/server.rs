use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Port of the health/metrics HTTP surface
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fallback log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Validates server configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` when the port is 0 or the log level is empty
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::InvalidConfig("server.port cannot be 0".into()));
        }

        if self.log_level.trim().is_empty() {
            return Err(Error::InvalidConfig("server.log_level cannot be empty".into()));
        }

        Ok(())
    }
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}
