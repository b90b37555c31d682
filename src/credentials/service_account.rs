use std::env;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::CredentialsError;
use crate::FirebaseConfig;
use crate::Result;

/// Environment variable carrying the raw service-account JSON
pub const SERVICE_ACCOUNT_ENV: &str = "FIREBASE_SERVICE_ACCOUNT";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google service-account key bundle
#[derive(Deserialize, Clone)]
pub struct ServiceAccount {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self> {
        let account: Self =
            serde_json::from_str(raw).map_err(|e| CredentialsError::Malformed(e.to_string()))?;

        if let Some(kind) = account.account_type.as_deref() {
            if kind != "service_account" {
                return Err(CredentialsError::Malformed(format!(
                    "expected type \"service_account\", got {kind:?}"
                ))
                .into());
            }
        }
        for (field, value) in [
            ("project_id", &account.project_id),
            ("private_key", &account.private_key),
            ("client_email", &account.client_email),
            ("token_uri", &account.token_uri),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialsError::Malformed(format!("{field} is empty")).into());
            }
        }

        Ok(account)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CredentialsError::Malformed(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Loads the bundle from `FIREBASE_SERVICE_ACCOUNT`, falling back to
    /// `firebase.credentials_path`.
    pub fn load(config: &FirebaseConfig) -> Result<Self> {
        if let Ok(raw) = env::var(SERVICE_ACCOUNT_ENV) {
            if !raw.trim().is_empty() {
                debug!("loading service account from {}", SERVICE_ACCOUNT_ENV);
                return Self::from_json(&raw);
            }
        }

        match &config.credentials_path {
            Some(path) => {
                debug!("loading service account from {}", path.display());
                Self::from_file(path)
            }
            None => Err(CredentialsError::Missing.into()),
        }
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}
