//! ==============================================================================
//! assessment.rs - turning raw readings into dashboard indicators
//! ==============================================================================
//!
//! purpose:
//!     normalized progress for the range bars, tank fill for the ultrasonic
//!     level sensor, and the short qualitative labels shown under the soil
//!     moisture and water ph cards.
//!
//! ==============================================================================

use serde::Serialize;

use crate::domain::SensorReading;

/// position of `value` inside `[min_value, max_value]` as 0..=100
pub fn progress_percent(reading: &SensorReading) -> f64 {
    let span = reading.max_value - reading.min_value;
    if span <= 0.0 {
        return 0.0;
    }
    ((reading.value - reading.min_value) / span * 100.0).clamp(0.0, 100.0)
}

/// how full the water tank is, as 0..=100
///
/// the ultrasonic sensor measures the distance down to the water surface,
/// so a larger reading means less water.
pub fn tank_fill_percent(reading: &SensorReading) -> f64 {
    100.0 - progress_percent(reading).round()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilMoistureLevel {
    Low,
    Acceptable,
    Optimal,
}

impl SoilMoistureLevel {
    pub fn classify(value: f64) -> Self {
        if value < 40.0 {
            SoilMoistureLevel::Low
        } else if value < 60.0 {
            SoilMoistureLevel::Acceptable
        } else {
            SoilMoistureLevel::Optimal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SoilMoistureLevel::Low => "Low level",
            SoilMoistureLevel::Acceptable => "Acceptable level",
            SoilMoistureLevel::Optimal => "Optimal level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhBalance {
    Acidic,
    Optimal,
    Alkaline,
}

impl PhBalance {
    pub fn classify(value: f64) -> Self {
        if value < 6.0 {
            PhBalance::Acidic
        } else if value > 7.2 {
            PhBalance::Alkaline
        } else {
            PhBalance::Optimal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PhBalance::Acidic => "Acidic",
            PhBalance::Optimal => "Optimal",
            PhBalance::Alkaline => "Alkaline",
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SensorId, SensorStatus};
    use chrono::Utc;

    fn reading(id: SensorId, value: f64, min: f64, max: f64) -> SensorReading {
        SensorReading {
            sensor_id: id,
            kind: id.kind(),
            value,
            unit: String::new(),
            timestamp: Utc::now(),
            min_value: min,
            max_value: max,
            status: SensorStatus::Active,
        }
    }

    #[test]
    fn test_progress_is_normalized_and_clamped() {
        assert_eq!(progress_percent(&reading(SensorId::EnvTemp, 25.0, 15.0, 35.0)), 50.0);
        assert_eq!(progress_percent(&reading(SensorId::EnvTemp, 5.0, 15.0, 35.0)), 0.0);
        assert_eq!(progress_percent(&reading(SensorId::EnvTemp, 50.0, 15.0, 35.0)), 100.0);
    }

    #[test]
    fn test_degenerate_range_reports_zero() {
        assert_eq!(progress_percent(&reading(SensorId::WaterPh, 7.0, 7.0, 7.0)), 0.0);
    }

    #[test]
    fn test_tank_fill_is_inverted() {
        // 85cm to the surface on a 10..100cm tank
        let level = reading(SensorId::WaterLevel, 85.0, 10.0, 100.0);
        assert_eq!(tank_fill_percent(&level), 17.0);

        let full = reading(SensorId::WaterLevel, 10.0, 10.0, 100.0);
        assert_eq!(tank_fill_percent(&full), 100.0);
    }

    #[test]
    fn test_soil_moisture_thresholds() {
        assert_eq!(SoilMoistureLevel::classify(39.9), SoilMoistureLevel::Low);
        assert_eq!(SoilMoistureLevel::classify(40.0), SoilMoistureLevel::Acceptable);
        assert_eq!(SoilMoistureLevel::classify(60.0), SoilMoistureLevel::Optimal);
        assert_eq!(SoilMoistureLevel::classify(12.0).label(), "Low level");
    }

    #[test]
    fn test_ph_thresholds() {
        assert_eq!(PhBalance::classify(5.9), PhBalance::Acidic);
        assert_eq!(PhBalance::classify(6.8), PhBalance::Optimal);
        assert_eq!(PhBalance::classify(7.2), PhBalance::Optimal);
        assert_eq!(PhBalance::classify(7.3), PhBalance::Alkaline);
        assert_eq!(PhBalance::classify(5.0).label(), "Acidic");
    }
}
