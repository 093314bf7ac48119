//! ==============================================================================
//! domain.rs - sensor data model
//! ==============================================================================
//!
//! purpose:
//!     the shapes that flow between the sensor store and the dashboard:
//!     point-in-time readings, history entries, and the aggregated snapshot
//!     the ui renders on every refresh.
//!
//! relationships:
//!     - produced by: store.rs (fresh values on every read)
//!     - shaped by: session.rs (partitions bulk reads into a snapshot)
//!     - serialized by: server.rs (json api)
//!
//! ==============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ==============================================================================
// sensor identity
// ==============================================================================

/// the fixed, closed set of measurement channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorId {
    EnvTemp,
    EnvHum,
    SoilHum,
    WaterPh,
    WaterLevel,
}

impl SensorId {
    /// every known sensor, in the stable enumeration order used by bulk reads
    pub const ALL: [SensorId; 5] = [
        SensorId::EnvTemp,
        SensorId::EnvHum,
        SensorId::SoilHum,
        SensorId::WaterPh,
        SensorId::WaterLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorId::EnvTemp => "ENV_TEMP",
            SensorId::EnvHum => "ENV_HUM",
            SensorId::SoilHum => "SOIL_HUM",
            SensorId::WaterPh => "WATER_PH",
            SensorId::WaterLevel => "WATER_LEVEL",
        }
    }

    pub fn kind(&self) -> SensorKind {
        match self {
            SensorId::EnvTemp => SensorKind::Temperature,
            SensorId::EnvHum => SensorKind::Humidity,
            SensorId::SoilHum => SensorKind::SoilHumidity,
            SensorId::WaterPh => SensorKind::Ph,
            SensorId::WaterLevel => SensorKind::WaterLevel,
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| StoreError::NotFound(s.to_string()))
    }
}

/// what physical quantity a sensor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    SoilHumidity,
    Ph,
    WaterLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    #[default]
    Active,
    Inactive,
}

// ==============================================================================
// readings
// ==============================================================================

/// a point-in-time value for one sensor
///
/// created fresh on every store read; callers never observe it being
/// mutated. `min_value`/`max_value` bound the expected range and drive the
/// progress bars (see assessment.rs).
///
/// on the wire the sensor is named twice, as `id` and `sensorId`. either
/// key is enough on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReadingRecord", into = "ReadingRecord")]
pub struct SensorReading {
    pub sensor_id: SensorId,
    pub kind: SensorKind,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub min_value: f64,
    pub max_value: f64,
    pub status: SensorStatus,
}

impl SensorReading {
    pub fn is_within_range(&self) -> bool {
        self.min_value <= self.value && self.value <= self.max_value
    }
}

/// json form of `SensorReading`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingRecord {
    #[serde(default)]
    id: Option<SensorId>,
    #[serde(default, alias = "sensor_id")]
    sensor_id: Option<SensorId>,
    #[serde(rename = "type")]
    kind: SensorKind,
    value: f64,
    unit: String,
    timestamp: DateTime<Utc>,
    #[serde(alias = "min_value")]
    min_value: f64,
    #[serde(alias = "max_value")]
    max_value: f64,
    #[serde(default)]
    status: SensorStatus,
}

impl TryFrom<ReadingRecord> for SensorReading {
    type Error = String;

    fn try_from(record: ReadingRecord) -> Result<Self, Self::Error> {
        let sensor_id = match (record.id, record.sensor_id) {
            (Some(id), Some(sensor_id)) if id != sensor_id => {
                return Err(format!("reading names two sensors: id {id}, sensorId {sensor_id}"));
            }
            (_, Some(id)) | (Some(id), None) => id,
            (None, None) => return Err("reading carries neither id nor sensorId".to_string()),
        };
        Ok(Self {
            sensor_id,
            kind: record.kind,
            value: record.value,
            unit: record.unit,
            timestamp: record.timestamp,
            min_value: record.min_value,
            max_value: record.max_value,
            status: record.status,
        })
    }
}

impl From<SensorReading> for ReadingRecord {
    fn from(reading: SensorReading) -> Self {
        Self {
            id: Some(reading.sensor_id),
            sensor_id: Some(reading.sensor_id),
            kind: reading.kind,
            value: reading.value,
            unit: reading.unit,
            timestamp: reading.timestamp,
            min_value: reading.min_value,
            max_value: reading.max_value,
            status: reading.status,
        }
    }
}

/// one past value of a single sensor
///
/// no unit or range: the consumer re-associates those from the parent sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorHistoryEntry {
    pub id: String,
    #[serde(alias = "sensor_id")]
    pub sensor_id: SensorId,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

// ==============================================================================
// snapshot - what the dashboard renders
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReadings {
    pub temperature: Option<SensorReading>,
    pub humidity: Option<SensorReading>,
}

/// the aggregated "all sensors" view
///
/// every slot is independently nullable. the default value (all `None`) is
/// what the session exposes before its first successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub environment: EnvironmentReadings,
    pub soil_humidity: Option<SensorReading>,
    #[serde(rename = "waterPH")]
    pub water_ph: Option<SensorReading>,
    pub water_level: Option<SensorReading>,
}

impl SensorSnapshot {
    /// partition a bulk read by sensor id into the snapshot shape
    ///
    /// sensors missing from `readings` stay `None`. if an id appears more
    /// than once the first occurrence wins.
    pub fn from_readings<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = SensorReading>,
    {
        let mut snapshot = SensorSnapshot::default();
        for reading in readings {
            let slot = snapshot.slot_mut(reading.sensor_id);
            if slot.is_none() {
                *slot = Some(reading);
            }
        }
        snapshot
    }

    pub fn get(&self, id: SensorId) -> Option<&SensorReading> {
        match id {
            SensorId::EnvTemp => self.environment.temperature.as_ref(),
            SensorId::EnvHum => self.environment.humidity.as_ref(),
            SensorId::SoilHum => self.soil_humidity.as_ref(),
            SensorId::WaterPh => self.water_ph.as_ref(),
            SensorId::WaterLevel => self.water_level.as_ref(),
        }
    }

    fn slot_mut(&mut self, id: SensorId) -> &mut Option<SensorReading> {
        match id {
            SensorId::EnvTemp => &mut self.environment.temperature,
            SensorId::EnvHum => &mut self.environment.humidity,
            SensorId::SoilHum => &mut self.soil_humidity,
            SensorId::WaterPh => &mut self.water_ph,
            SensorId::WaterLevel => &mut self.water_level,
        }
    }

    /// true once every known sensor has a reading
    pub fn is_complete(&self) -> bool {
        SensorId::ALL.iter().all(|id| self.get(*id).is_some())
    }

    pub fn readings(&self) -> impl Iterator<Item = &SensorReading> {
        SensorId::ALL.into_iter().filter_map(move |id| self.get(id))
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn reading(id: SensorId, value: f64) -> SensorReading {
        SensorReading {
            sensor_id: id,
            kind: id.kind(),
            value,
            unit: "%".to_string(),
            timestamp: Utc::now(),
            min_value: 0.0,
            max_value: 100.0,
            status: SensorStatus::Active,
        }
    }

    #[test]
    fn test_sensor_id_round_trips_through_str() {
        for id in SensorId::ALL {
            assert_eq!(id.as_str().parse::<SensorId>().unwrap(), id);
        }
    }

    #[test]
    fn test_unknown_sensor_id_is_not_found() {
        let err = "BOGUS".parse::<SensorId>().unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "BOGUS"));
    }

    #[test]
    fn test_snapshot_partitions_by_id() {
        let snapshot = SensorSnapshot::from_readings(vec![
            reading(SensorId::WaterLevel, 85.0),
            reading(SensorId::EnvTemp, 24.0),
        ]);

        assert_eq!(snapshot.environment.temperature.as_ref().unwrap().value, 24.0);
        assert_eq!(snapshot.water_level.as_ref().unwrap().value, 85.0);
        assert!(snapshot.environment.humidity.is_none());
        assert!(snapshot.soil_humidity.is_none());
        assert!(!snapshot.is_complete());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = SensorSnapshot::from_readings(vec![reading(SensorId::WaterPh, 6.8)]);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json["environment"]["temperature"].is_null());
        assert!(json["soilHumidity"].is_null());
        assert_eq!(json["waterPH"]["value"], 6.8);
        assert_eq!(json["waterPH"]["sensorId"], "WATER_PH");
        assert_eq!(json["waterPH"]["id"], "WATER_PH");
        assert_eq!(json["waterPH"]["type"], "ph");
        assert_eq!(json["waterPH"]["status"], "active");
    }

    #[test]
    fn test_reading_accepts_snake_case_backend_fields() {
        let json = r#"{
            "id": "ENV_TEMP",
            "type": "temperature",
            "value": 24,
            "unit": "°C",
            "timestamp": "2025-03-29T12:00:00Z",
            "min_value": 15,
            "max_value": 35,
            "status": "active"
        }"#;
        let reading: SensorReading = serde_json::from_str(json).unwrap();

        assert_eq!(reading.sensor_id, SensorId::EnvTemp);
        assert_eq!(reading.min_value, 15.0);
        assert_eq!(reading.max_value, 35.0);
        assert!(reading.is_within_range());
    }

    #[test]
    fn test_reading_with_both_id_keys_round_trips() {
        let json = r#"{
            "id": "WATER_LEVEL",
            "sensorId": "WATER_LEVEL",
            "type": "water_level",
            "value": 85,
            "unit": "cm",
            "timestamp": "2025-03-29T12:00:00Z",
            "minValue": 10,
            "maxValue": 100
        }"#;
        let reading: SensorReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.sensor_id, SensorId::WaterLevel);
        assert_eq!(reading.status, SensorStatus::Active);

        let encoded = serde_json::to_string(&reading).unwrap();
        assert_eq!(serde_json::from_str::<SensorReading>(&encoded).unwrap(), reading);
    }

    #[test]
    fn test_reading_accepts_sensor_id_alone() {
        let mut json = serde_json::to_value(reading(SensorId::SoilHum, 65.0)).unwrap();
        json.as_object_mut().unwrap().remove("id");

        let decoded: SensorReading = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.sensor_id, SensorId::SoilHum);
    }

    #[test]
    fn test_reading_rejects_conflicting_or_missing_ids() {
        let mut json = serde_json::to_value(reading(SensorId::EnvHum, 60.0)).unwrap();
        json["id"] = "ENV_TEMP".into();
        assert!(serde_json::from_value::<SensorReading>(json.clone()).is_err());

        let fields = json.as_object_mut().unwrap();
        fields.remove("id");
        fields.remove("sensorId");
        assert!(serde_json::from_value::<SensorReading>(json).is_err());
    }
}
