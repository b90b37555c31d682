//! Realtime database collaborators: the change feed on the logs collection
//! and the device-token registry.

mod child_tracker;
mod firebase_database;
mod sse;
pub use child_tracker::*;
pub use firebase_database::*;
pub use sse::*;


use async_trait::async_trait;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Stream of events for one connection. It ends, or yields an error, when
/// the connection is lost.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Resolves the device a user's notifications go to
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceRegistry: Send + Sync + 'static {
    /// `Ok(None)` when the user has no registered device
    async fn device_token(
        &self,
        user_id: &str,
    ) -> Result<Option<String>>;
}

/// Opens change subscriptions on the logs collection
#[async_trait]
pub trait ChangeFeed: Send + Sync + 'static {
    async fn subscribe(&self) -> Result<EventStream>;
}
