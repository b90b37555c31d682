//! Relay Error Hierarchy
//!
//! Defines the error types of the relay, categorized by the collaborator that
//! produced them. Only startup failures (configuration, credentials) are
//! fatal; everything raised on the event path is logged and dropped by the
//! relay.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration source or deserialization failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Semantically invalid configuration values
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Service-account bundle or OAuth token failures
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// Realtime database read or subscription failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Push gateway send failures
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    RetryTaskFailed(String),

    #[error("{0}")]
    SignalSenderClosed(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Bundle is not valid JSON or misses a required field
    #[error("Malformed service account: {0}")]
    Malformed(String),

    /// `private_key` is not a PEM encoded RSA key
    #[error("Invalid service account private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to sign token assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Token exchange with {uri} failed: {source}")]
    Exchange {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Token endpoint rejected the assertion ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("No credentials configured")]
    Missing,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid store URL {0}")]
    InvalidUrl(String),

    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Store responded {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("Undecodable {event} event: {source}")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// Server ended the subscription (`cancel` or `auth_revoked`)
    #[error("Subscription closed by server: {0}")]
    SubscriptionClosed(String),

    #[error("Change stream ended")]
    StreamEnded,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Gateway could not be reached or the response could not be read
    #[error("Gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Gateway answered with a non-success status
    #[error("Gateway rejected message ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
}
