//! Maps a sensor log to the notification shown on the user's device.
//!
//! Pure: no I/O, deterministic for a given classification and log.


use serde::Serialize;

use crate::LogEntry;

/// Title used when a log carries no classification
pub const DEFAULT_TITLE: &str = "default";

/// Placeholder for an absent reading
pub const MISSING_READING: &str = "-";

pub const FLAME_DETECTED: &str = "FLAME DETECTED";
pub const SMOKE_DETECTED: &str = "SMOKE DETECTED";
pub const EMERGENCY: &str = "EMERGENCY";

const FLAME_BODY: &str = "Check for open flames or fire sources immediately.";
const SMOKE_BODY: &str = "Smoke levels are high, please investigate.";
const EMERGENCY_BODY: &str = "Immediate action required: high smoke and temperature detected.";
const DEFAULT_BODY: &str = "A new event has occurred.";

/// Human-visible part of the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationBlock {
    pub title: String,
    pub body: String,
}

/// Structured data delivered alongside the notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// `type:<title>`
    pub payload: String,
    pub smoke: String,
    pub temperature: String,
    /// `"true"` or `"false"`
    pub flame: String,
}

/// One addressed push message. Serializes to the gateway's message shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub notification: NotificationBlock,
    pub data: NotificationData,
    pub token: String,
}

impl NotificationPayload {
    /// Composes the message for `log` and addresses it to `token`.
    pub fn new(
        user_id: &str,
        token: impl Into<String>,
        log: &LogEntry,
    ) -> Self {
        let classification = log.classification();
        let (notification, data) = compose(user_id, classification.as_deref(), log);
        Self {
            notification,
            data,
            token: token.into(),
        }
    }
}

/// Body text for a classification; exact, case-sensitive match.
pub fn body_for(classification: Option<&str>) -> &'static str {
    match classification {
        Some(FLAME_DETECTED) => FLAME_BODY,
        Some(SMOKE_DETECTED) => SMOKE_BODY,
        Some(EMERGENCY) => EMERGENCY_BODY,
        _ => DEFAULT_BODY,
    }
}

/// Builds title, body and data for one log.
///
/// An empty classification is the same as none: the title becomes
/// [`DEFAULT_TITLE`] and `payload` carries `type:default`.
pub fn compose(
    user_id: &str,
    classification: Option<&str>,
    log: &LogEntry,
) -> (NotificationBlock, NotificationData) {
    let title = classification
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let notification = NotificationBlock {
        title: title.to_string(),
        body: body_for(classification).to_string(),
    };

    let data = NotificationData {
        user_id: user_id.to_string(),
        payload: format!("type:{title}"),
        smoke: reading_or_placeholder(log.smoke.as_ref()),
        temperature: reading_or_placeholder(log.temperature.as_ref()),
        flame: log
            .flame
            .as_ref()
            .is_some_and(|f| f.is_text("YES"))
            .to_string(),
    };

    (notification, data)
}

/// Absent and empty readings both render as the placeholder
fn reading_or_placeholder(reading: Option<&crate::Reading>) -> String {
    reading
        .map(ToString::to_string)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| MISSING_READING.to_string())
}
