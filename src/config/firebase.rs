use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::Error;
use crate::Result;

/// Realtime Database and Cloud Messaging endpoints
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FirebaseConfig {
    /// Root of the realtime database, e.g. `https://<db>.firebaseio.com/`
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Top-level collection of per-user sensor logs
    #[serde(default = "default_logs_path")]
    pub logs_path: String,

    /// Collection mapping user ids to device tokens
    #[serde(default = "default_devices_path")]
    pub devices_path: String,

    /// Cloud Messaging API root
    #[serde(default = "default_fcm_endpoint")]
    pub fcm_endpoint: String,

    /// Overrides the service account's `project_id` for message sends
    #[serde(default)]
    pub project_id: Option<String>,

    /// Service account file, used when `FIREBASE_SERVICE_ACCOUNT` is unset
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Per-request timeout for point reads and sends (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            logs_path: default_logs_path(),
            devices_path: default_devices_path(),
            fcm_endpoint: default_fcm_endpoint(),
            project_id: None,
            credentials_path: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl FirebaseConfig {
    /// Validates endpoint configuration
    /// # Errors
    /// Returns `Error::InvalidConfig` when:
    /// - an endpoint is not an absolute http(s) URL
    /// - a collection path is empty
    /// - the request timeout is 0
    pub fn validate(&self) -> Result<()> {
        validate_http_url("firebase.database_url", &self.database_url)?;
        validate_http_url("firebase.fcm_endpoint", &self.fcm_endpoint)?;

        if self.logs_path.trim_matches('/').is_empty() {
            return Err(Error::InvalidConfig("firebase.logs_path cannot be empty".into()));
        }
        if self.devices_path.trim_matches('/').is_empty() {
            return Err(Error::InvalidConfig("firebase.devices_path cannot be empty".into()));
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("firebase.request_timeout_ms cannot be 0".into()));
        }

        Ok(())
    }
}

fn validate_http_url(
    field: &str,
    value: &str,
) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::InvalidConfig(format!("{field} {value:?} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidConfig(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

fn default_database_url() -> String {
    "https://smart-fireguard-default-rtdb.firebaseio.com/".to_string()
}

fn default_logs_path() -> String {
    "user_logs".to_string()
}

fn default_devices_path() -> String {
    "device_ids".to_string()
}

fn default_fcm_endpoint() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}
