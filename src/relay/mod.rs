//! One firing of the pipeline: latest log -> device token -> compose -> send.
//!
//! Every outcome, including failures, ends here. Nothing is returned as an
//! error so that one user's event can never disturb another's.


use std::sync::Arc;

use tracing::error;
use tracing::info;
use tracing::warn;

use crate::metrics::DELIVERY_FAILURES;
use crate::metrics::EVENTS_OBSERVED;
use crate::metrics::MISSING_TOKEN;
use crate::metrics::NOTIFICATIONS_SENT;
use crate::metrics::RESOLUTION_FAILURES;
use crate::ChildAdded;
use crate::DeviceRegistry;
use crate::NotificationPayload;
use crate::PushGateway;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Gateway acknowledged the message
    Delivered { message_id: String },
    /// User has no registered device
    NoDevice,
    /// Collection held no log record
    NoLogs,
    /// Device token could not be read
    ResolutionFailed,
    /// Gateway rejected or could not be reached
    DeliveryFailed,
}

pub struct Relay {
    registry: Arc<dyn DeviceRegistry>,
    gateway: Arc<dyn PushGateway>,
}

impl Relay {
    pub fn new(
        registry: Arc<dyn DeviceRegistry>,
        gateway: Arc<dyn PushGateway>,
    ) -> Self {
        Self { registry, gateway }
    }

    pub async fn handle(
        &self,
        event: ChildAdded,
    ) -> RelayOutcome {
        EVENTS_OBSERVED.inc();
        let user_id = event.user_id;

        let Some((key, log)) = event.logs.latest() else {
            warn!("No log records for user {}", user_id);
            return RelayOutcome::NoLogs;
        };
        info!("New log for user {}: {} {:?}", user_id, key, log);

        let token = match self.registry.device_token(&user_id).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No FCM token found for user {}", user_id);
                MISSING_TOKEN.inc();
                return RelayOutcome::NoDevice;
            }
            Err(e) => {
                error!("Error reading device token for user {}: {}", user_id, e);
                RESOLUTION_FAILURES.inc();
                return RelayOutcome::ResolutionFailed;
            }
        };

        let payload = NotificationPayload::new(&user_id, token, log);
        match self.gateway.send(&payload).await {
            Ok(message_id) => {
                info!("Notification sent to user {}: {:?}", user_id, payload);
                NOTIFICATIONS_SENT.inc();
                RelayOutcome::Delivered { message_id }
            }
            Err(e) => {
                error!("Error sending notification to user {}: {}", user_id, e);
                DELIVERY_FAILURES.inc();
                RelayOutcome::DeliveryFailed
            }
        }
    }
}
