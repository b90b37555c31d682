//! Sensor-log records as observed in the realtime database.

mod log_entry;
mod log_key;
pub use log_entry::*;
pub use log_key::*;
