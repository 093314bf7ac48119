//! Sensor acquisition and polling layer for the garden irrigation dashboard.
//!
//! A [`store::SensorStore`] owns current readings and history. A
//! [`session::PollingSession`] wraps one, refreshes a [`domain::SensorSnapshot`]
//! on a fixed cadence, and tracks loading and error state for the ui.

pub mod assessment;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod store;

pub use domain::{SensorHistoryEntry, SensorId, SensorReading, SensorSnapshot};
pub use error::StoreError;
pub use session::{FetchOutcome, PollingSession, SessionOptions};
pub use store::{HttpSensorStore, MockSensorStore, SensorStore};
