use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Fire for users already present when the subscription first attaches
    #[serde(default = "default_notify_existing_on_start")]
    pub notify_existing_on_start: bool,

    /// Reconnect policy for the change stream
    #[serde(default)]
    pub reconnect: BackoffPolicy,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            notify_existing_on_start: default_notify_existing_on_start(),
            reconnect: BackoffPolicy::default(),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<()> {
        self.reconnect.validate()
    }
}

fn default_notify_existing_on_start() -> bool {
    true
}
