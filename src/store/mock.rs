//! ==============================================================================
//! store/mock.rs - in-memory sensor store
//! ==============================================================================
//!
//! purpose:
//!     stands in for the garden backend during development and tests.
//!     holds the current value and the history of every sensor in memory,
//!     and sleeps before answering so callers see realistic latency.
//!
//! notes:
//!     - volatile: everything is lost when the process exits
//!     - one instance per owner (no globals), so tests can run side by side
//!     - `set_offline(true)` makes every call fail with a transport error
//!
//! ==============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SensorStore;
use crate::domain::{SensorHistoryEntry, SensorId, SensorReading, SensorStatus};
use crate::error::{Result, StoreError};

// ==============================================================================
// simulated latency
// ==============================================================================

/// artificial delay applied to each kind of store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub read: Duration,
    pub bulk: Duration,
    pub history: Duration,
    pub update: Duration,
}

impl LatencyProfile {
    /// no delay at all; handy for server tests that run on real time
    pub const fn instant() -> Self {
        Self {
            read: Duration::ZERO,
            bulk: Duration::ZERO,
            history: Duration::ZERO,
            update: Duration::ZERO,
        }
    }
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            read: Duration::from_millis(300),
            bulk: Duration::from_millis(500),
            history: Duration::from_millis(400),
            update: Duration::from_millis(300),
        }
    }
}

async fn simulate(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ==============================================================================
// store
// ==============================================================================

#[derive(Default)]
struct Tables {
    current: HashMap<SensorId, SensorReading>,
    history: HashMap<SensorId, Vec<SensorHistoryEntry>>,
}

impl Tables {
    fn with_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = SensorReading>,
    {
        Self {
            current: readings
                .into_iter()
                .map(|reading| (reading.sensor_id, reading))
                .collect(),
            history: HashMap::new(),
        }
    }
}

pub struct MockSensorStore {
    tables: RwLock<Tables>,
    latency: LatencyProfile,
    offline: AtomicBool,
}

impl MockSensorStore {
    /// the garden seed data with default latency
    pub fn new() -> Self {
        Self::seeded(LatencyProfile::default())
    }

    /// the garden seed data: five active sensors, four hourly history points each
    pub fn seeded(latency: LatencyProfile) -> Self {
        let seed_at = seed_time(12);
        let readings = [
            (SensorId::EnvTemp, 24.0, "°C", 15.0, 35.0),
            (SensorId::EnvHum, 65.0, "%", 40.0, 90.0),
            (SensorId::SoilHum, 65.0, "%", 30.0, 80.0),
            (SensorId::WaterPh, 6.8, "pH", 5.5, 7.5),
            (SensorId::WaterLevel, 85.0, "cm", 10.0, 100.0),
        ]
        .into_iter()
        .map(|(id, value, unit, min_value, max_value)| SensorReading {
            sensor_id: id,
            kind: id.kind(),
            value,
            unit: unit.to_string(),
            timestamp: seed_at,
            min_value,
            max_value,
            status: SensorStatus::Active,
        });

        let mut tables = Tables::with_readings(readings);
        for (id, values) in [
            (SensorId::EnvTemp, [23.5, 24.0, 24.5, 24.0]),
            (SensorId::EnvHum, [63.0, 64.0, 65.0, 66.0]),
            (SensorId::SoilHum, [62.0, 63.0, 65.0, 64.0]),
            (SensorId::WaterPh, [6.7, 6.8, 6.8, 6.9]),
            (SensorId::WaterLevel, [80.0, 82.0, 84.0, 85.0]),
        ] {
            // oldest first in the literal, stored most-recent-first
            let entries = values
                .iter()
                .enumerate()
                .rev()
                .map(|(i, value)| SensorHistoryEntry {
                    id: (i + 1).to_string(),
                    sensor_id: id,
                    value: *value,
                    timestamp: seed_time(9 + i as u32),
                })
                .collect();
            tables.history.insert(id, entries);
        }
        Self::from_tables(tables, latency)
    }

    /// a store holding exactly `readings` and no history
    pub fn with_readings<I>(readings: I, latency: LatencyProfile) -> Self
    where
        I: IntoIterator<Item = SensorReading>,
    {
        Self::from_tables(Tables::with_readings(readings), latency)
    }

    fn from_tables(tables: Tables, latency: LatencyProfile) -> Self {
        Self {
            tables: RwLock::new(tables),
            latency,
            offline: AtomicBool::new(false),
        }
    }

    /// simulate the backend going away (or coming back)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("sensor backend unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MockSensorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorStore for MockSensorStore {
    async fn reading(&self, sensor_id: &str) -> Result<SensorReading> {
        simulate(self.latency.read).await;
        self.ensure_online()?;

        let id: SensorId = sensor_id.parse()?;
        self.tables
            .read()
            .await
            .current
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(sensor_id.to_string()))
    }

    async fn all_readings(&self) -> Result<Vec<SensorReading>> {
        simulate(self.latency.bulk).await;
        self.ensure_online()?;

        let tables = self.tables.read().await;
        Ok(SensorId::ALL
            .iter()
            .filter_map(|id| tables.current.get(id).cloned())
            .collect())
    }

    async fn history(&self, sensor_id: &str, limit: usize) -> Result<Vec<SensorHistoryEntry>> {
        simulate(self.latency.history).await;
        self.ensure_online()?;

        let id: SensorId = sensor_id.parse()?;
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .get(&id)
            .map(|entries| entries.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn update_sensor_value(&self, sensor_id: &str, value: f64) -> Result<SensorReading> {
        simulate(self.latency.update).await;
        self.ensure_online()?;

        let id: SensorId = sensor_id.parse()?;
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let reading = tables
            .current
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(sensor_id.to_string()))?;
        reading.value = value;
        reading.timestamp = now;
        let updated = reading.clone();

        tables.history.entry(id).or_default().insert(
            0,
            SensorHistoryEntry {
                id: Uuid::new_v4().to_string(),
                sensor_id: id,
                value,
                timestamp: now,
            },
        );

        tracing::debug!(sensor = %id, value, "sensor value updated");
        Ok(updated)
    }
}

fn seed_time(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 29, hour, 0, 0)
        .single()
        .unwrap_or_default()
}
