use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::ServiceAccount;
use crate::CredentialsError;
use crate::Result;

/// Scopes needed for database streaming/reads and message sends
pub const FIREBASE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/firebase.messaging",
];

const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    /// Bearer token for the next request, `None` when requests go out
    /// unauthenticated (local emulators).
    async fn access_token(&self) -> Result<Option<String>>;
}

/// Fixed token, for emulators and tests
pub struct StaticToken(pub Option<String>);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub(crate) iss: String,
    pub(crate) scope: String,
    pub(crate) aud: String,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// OAuth2 JWT-bearer flow for a service account
pub struct ServiceAccountTokenProvider {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    key_id: Option<String>,
    encoding_key: EncodingKey,
    request_timeout: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    /// Parses the account's RSA key immediately; an invalid key is reported
    /// here rather than on the first token request. Each exchange is bounded
    /// by `request_timeout`.
    pub fn new(
        account: &ServiceAccount,
        http: reqwest::Client,
        request_timeout: Duration,
    ) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(CredentialsError::InvalidKey)?;

        Ok(Self {
            http,
            client_email: account.client_email.clone(),
            token_uri: account.token_uri.clone(),
            key_id: account.private_key_id.clone(),
            encoding_key,
            request_timeout,
            cached: Mutex::new(None),
        })
    }

    fn signed_assertion(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: FIREBASE_SCOPES.join(" "),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| CredentialsError::Signing(e).into())
    }

    async fn exchange(&self) -> Result<TokenResponse> {
        let assertion = self.signed_assertion()?;
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_uri)
            .timeout(self.request_timeout)
            .form(&params)
            .send()
            .await
            .map_err(|source| CredentialsError::Exchange {
                uri: self.token_uri.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|source| {
                CredentialsError::Exchange {
                    uri: self.token_uri.clone(),
                    source,
                }
                .into()
            })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<Option<String>> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(Some(token.token.clone()));
            }
        }

        let response = self.exchange().await?;
        debug!(
            "minted access token for {}, expires in {}s",
            self.client_email, response.expires_in
        );

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(REFRESH_MARGIN);
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(Some(response.access_token))
    }
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}
