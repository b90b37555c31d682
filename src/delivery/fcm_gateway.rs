use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::PushGateway;
use crate::DeliveryError;
use crate::Error;
use crate::FirebaseConfig;
use crate::NotificationPayload;
use crate::Result;
use crate::TokenProvider;

const FCM_ERROR_TYPE: &str = "type.googleapis.com/google.firebase.fcm.v1.FcmError";

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a NotificationPayload,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorStatus,
}

#[derive(Deserialize, Default)]
struct ErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "@type", default)]
    kind: String,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// Firebase Cloud Messaging HTTP v1 client
pub struct FcmGateway {
    http: reqwest::Client,
    send_url: Url,
    request_timeout: Duration,
    tokens: Arc<dyn TokenProvider>,
}

impl FcmGateway {
    pub fn new(
        http: reqwest::Client,
        config: &FirebaseConfig,
        project_id: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let endpoint = Url::parse(&config.fcm_endpoint)
            .map_err(|e| Error::InvalidConfig(format!("firebase.fcm_endpoint: {e}")))?;
        let send_url = send_url(&endpoint, project_id)?;
        debug!("fcm send url: {}", send_url);

        Ok(Self {
            http,
            send_url,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            tokens,
        })
    }
}

/// `{endpoint}/v1/projects/{project_id}/messages:send`
pub(crate) fn send_url(
    endpoint: &Url,
    project_id: &str,
) -> Result<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| Error::InvalidConfig(format!("firebase.fcm_endpoint {endpoint} is not a base")))?
        .pop_if_empty()
        .extend(["v1", "projects", project_id, "messages:send"]);
    Ok(url)
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(
        &self,
        payload: &NotificationPayload,
    ) -> Result<String> {
        let mut request = self
            .http
            .post(self.send_url.clone())
            .timeout(self.request_timeout)
            .json(&SendRequest { message: payload });
        if let Some(token) = self.tokens.access_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(DeliveryError::Transport)?;

        let status = response.status();
        if status.is_success() {
            let body: SendResponse = response.json().await.map_err(DeliveryError::Transport)?;
            return Ok(body.name);
        }

        let raw = response.text().await.unwrap_or_default();
        let envelope: ErrorEnvelope = serde_json::from_str(&raw).unwrap_or_default();
        let code = envelope
            .error
            .details
            .iter()
            .filter(|d| d.kind == FCM_ERROR_TYPE)
            .find_map(|d| d.error_code.clone())
            .or_else(|| Some(envelope.error.status.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let message = if envelope.error.message.is_empty() {
            raw
        } else {
            envelope.error.message
        };

        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            code,
            message,
        }
        .into())
    }
}
