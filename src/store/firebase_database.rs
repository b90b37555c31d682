use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use url::Url;

use super::ChangeFeed;
use super::DeviceRegistry;
use super::EventStream;
use super::SseDecoder;
use super::StreamEvent;
use crate::FirebaseConfig;
use crate::Result;
use crate::StoreError;
use crate::TokenProvider;

/// Realtime database REST client
pub struct FirebaseDatabase {
    http: reqwest::Client,
    base: Url,
    logs_path: Vec<String>,
    devices_path: Vec<String>,
    request_timeout: Duration,
    tokens: Arc<dyn TokenProvider>,
}

impl FirebaseDatabase {
    /// `http` must not carry a global timeout: it would cut the change stream.
    pub fn new(
        http: reqwest::Client,
        config: &FirebaseConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let base = Url::parse(&config.database_url)
            .map_err(|_| StoreError::InvalidUrl(config.database_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(config.database_url.clone()).into());
        }

        Ok(Self {
            http,
            base,
            logs_path: split_segments(&config.logs_path),
            devices_path: split_segments(&config.devices_path),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            tokens,
        })
    }

    /// `{base}/{segments..}.json`, each segment percent-encoded on its own
    pub(crate) fn json_url(
        &self,
        segments: &[&str],
    ) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let Some((last, parents)) = segments.split_last() else {
                return Err(StoreError::InvalidUrl(url.to_string()).into());
            };
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidUrl(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(parents.iter());
            path.push(&format!("{last}.json"));
        }
        Ok(url)
    }

    async fn authorize(
        &self,
        mut url: Url,
    ) -> Result<Url> {
        if let Some(token) = self.tokens.access_token().await? {
            url.query_pairs_mut().append_pair("access_token", &token);
        }
        Ok(url)
    }
}

#[async_trait]
impl DeviceRegistry for FirebaseDatabase {
    async fn device_token(
        &self,
        user_id: &str,
    ) -> Result<Option<String>> {
        let mut segments: Vec<&str> = self.devices_path.iter().map(String::as_str).collect();
        segments.push(user_id);
        let path = segments.join("/");
        let url = self.authorize(self.json_url(&segments)?).await?;

        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|source| StoreError::Request {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                path,
                status: status.as_u16(),
            }
            .into());
        }

        let value: Value = response
            .json()
            .await
            .map_err(|source| StoreError::Request { path: path.clone(), source })?;

        Ok(match value {
            Value::String(token) if !token.trim().is_empty() => Some(token),
            Value::Null | Value::String(_) => None,
            other => {
                debug!("ignoring non-string device registration at {}: {}", path, other);
                None
            }
        })
    }
}

#[async_trait]
impl ChangeFeed for FirebaseDatabase {
    async fn subscribe(&self) -> Result<EventStream> {
        let segments: Vec<&str> = self.logs_path.iter().map(String::as_str).collect();
        let path = segments.join("/");
        let url = self.authorize(self.json_url(&segments)?).await?;

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| StoreError::Request {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                path,
                status: status.as_u16(),
            }
            .into());
        }
        info!("subscribed to {}", path);

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| {
                let events: Vec<Result<StreamEvent>> = match chunk {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .iter()
                        .filter_map(|frame| StreamEvent::from_frame(frame).transpose())
                        .collect(),
                    Err(source) => vec![Err(StoreError::Request {
                        path: path.clone(),
                        source,
                    }
                    .into())],
                };
                stream::iter(events)
            })
            .flatten()
            .chain(stream::once(async { Err(StoreError::StreamEnded.into()) }));

        Ok(events.boxed())
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
