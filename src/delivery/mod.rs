//! Push-notification gateway: one addressed send per call, no retry.

mod fcm_gateway;
pub use fcm_gateway::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::NotificationPayload;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushGateway: Send + Sync + 'static {
    /// Sends one message and returns the gateway's message id once it is
    /// acknowledged.
    async fn send(
        &self,
        payload: &NotificationPayload,
    ) -> Result<String>;
}
