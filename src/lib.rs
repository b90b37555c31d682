//! Relays new sensor-log entries from the Firebase Realtime Database to the
//! owning user's device as FCM push notifications.

mod composer;
mod config;
mod credentials;
mod delivery;
mod errors;
mod event;
mod relay;
mod store;
mod watcher;
pub mod health;
pub mod metrics;
pub(crate) mod utils;

pub use composer::*;
pub use config::*;
pub use credentials::*;
pub use delivery::*;
pub use errors::*;
pub use event::*;
pub use relay::*;
pub use store::*;
pub use watcher::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
