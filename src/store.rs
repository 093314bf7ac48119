//! ==============================================================================
//! store.rs - sensor store capability
//! ==============================================================================
//!
//! purpose:
//!     one interface for "where sensor readings come from". the polling
//!     session only ever talks to `dyn SensorStore`, so the in-memory mock
//!     and the rest backend are interchangeable at startup.
//!
//! implementations:
//!     - mock.rs: volatile in-memory table with simulated network latency
//!     - http.rs: the same four operations as rest calls via reqwest
//!
//! invariant:
//!     reads never mutate. only `update_sensor_value` changes state.
//!
//! ==============================================================================

mod http;
mod mock;

pub use http::HttpSensorStore;
pub use mock::{LatencyProfile, MockSensorStore};

use async_trait::async_trait;

use crate::domain::{EnvironmentReadings, SensorHistoryEntry, SensorId, SensorReading};
use crate::error::Result;

/// history length used when the caller does not ask for one
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[async_trait]
pub trait SensorStore: Send + Sync {
    /// current reading of one sensor; `NotFound` for ids outside the known set
    async fn reading(&self, sensor_id: &str) -> Result<SensorReading>;

    /// current reading of every known sensor, in `SensorId::ALL` order
    async fn all_readings(&self) -> Result<Vec<SensorReading>>;

    /// most-recent-first history, truncated to `limit`
    ///
    /// a known sensor with nothing recorded yields an empty list, not an error.
    async fn history(&self, sensor_id: &str, limit: usize) -> Result<Vec<SensorHistoryEntry>>;

    /// set the current value, stamp it with now, and prepend it to history
    async fn update_sensor_value(&self, sensor_id: &str, value: f64) -> Result<SensorReading>;

    // --- convenience point reads used by individual dashboard cards ---

    /// temperature and humidity, fetched concurrently
    async fn environment(&self) -> Result<EnvironmentReadings> {
        let (temperature, humidity) = tokio::try_join!(
            self.reading(SensorId::EnvTemp.as_str()),
            self.reading(SensorId::EnvHum.as_str()),
        )?;
        Ok(EnvironmentReadings {
            temperature: Some(temperature),
            humidity: Some(humidity),
        })
    }

    async fn soil_humidity(&self) -> Result<SensorReading> {
        self.reading(SensorId::SoilHum.as_str()).await
    }

    async fn water_ph(&self) -> Result<SensorReading> {
        self.reading(SensorId::WaterPh.as_str()).await
    }

    async fn water_level(&self) -> Result<SensorReading> {
        self.reading(SensorId::WaterLevel.as_str()).await
    }
}
