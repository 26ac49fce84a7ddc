//! Sensor reading models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single temperature/humidity sample as stored
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SensorReading {
    pub id: i64,
    pub device: String,
    pub temperature: f64,
    pub humidity: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Ingestion payload posted by the firmware
#[derive(Debug, Clone, Deserialize)]
pub struct NewReading {
    pub device: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl NewReading {
    /// Validate presence and physical ranges; returns the usable triple
    pub fn validate(&self) -> Result<(&str, f64, f64), String> {
        let device = self
            .device
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| "device, temperature and humidity are required".to_string())?;
        let temperature = self
            .temperature
            .ok_or_else(|| "device, temperature and humidity are required".to_string())?;
        let humidity = self
            .humidity
            .ok_or_else(|| "device, temperature and humidity are required".to_string())?;

        if !(-50.0..=100.0).contains(&temperature) {
            return Err("temperature out of range (-50 to 100 C)".to_string());
        }

        if !(0.0..=100.0).contains(&humidity) {
            return Err("humidity out of range (0 to 100 %)".to_string());
        }

        Ok((device, temperature, humidity))
    }
}

/// Aggregate statistics over a trailing window
#[derive(Debug, Clone, Serialize)]
pub struct ReadingStats {
    pub total_readings: i64,
    pub temperature_avg: Option<f64>,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub humidity_avg: Option<f64>,
    pub humidity_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub first_reading: Option<DateTime<Utc>>,
    pub last_reading: Option<DateTime<Utc>>,
}

/// Query parameters for the recent-readings endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Query parameters for the latest-reading endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LatestQuery {
    pub device: Option<String>,
}

/// Query parameters for the statistics endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StatsQuery {
    pub hours: Option<i64>,
}

/// Query parameters for the date-range endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Query parameters for the cleanup endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupQuery {
    pub days: Option<i64>,
}
