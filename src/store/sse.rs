//! Incremental `text/event-stream` decoding and the realtime database's
//! streaming event vocabulary.

use serde::Deserialize;
use serde_json::Value;

use crate::Result;
use crate::StoreError;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Splits a byte stream into [`SseFrame`]s. Chunks may end anywhere,
/// including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        chunk: &[u8],
    ) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if let Some(frame) = self.dispatch() {
                    frames.push(frame);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (&*line, ""),
            };
            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        frames
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let frame = SseFrame {
            event: std::mem::take(&mut self.event),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(frame)
    }
}

/// Realtime database streaming events
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// `data` replaces the value at `path`
    Put { path: String, data: Value },
    /// each key of `data` replaces the value at `path/key`
    Patch { path: String, data: Value },
    KeepAlive,
    /// Security rules no longer allow the read
    Cancel(String),
    /// Access token expired or was revoked
    AuthRevoked(String),
}

#[derive(Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

impl StreamEvent {
    /// Interprets a frame; `Ok(None)` for event names the database does not
    /// define.
    pub fn from_frame(frame: &SseFrame) -> Result<Option<Self>> {
        let event = match frame.event.as_str() {
            "put" | "patch" => {
                let PathData { path, data } =
                    serde_json::from_str(&frame.data).map_err(|source| StoreError::Decode {
                        event: frame.event.clone(),
                        source,
                    })?;
                if frame.event == "put" {
                    StreamEvent::Put { path, data }
                } else {
                    StreamEvent::Patch { path, data }
                }
            }
            "keep-alive" => StreamEvent::KeepAlive,
            "cancel" => StreamEvent::Cancel(frame.data.clone()),
            "auth_revoked" => StreamEvent::AuthRevoked(frame.data.clone()),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
