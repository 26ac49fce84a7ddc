//! Sensor reading repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::models::{ReadingStats, SensorReading};

/// Sensor reading repository
#[derive(Clone)]
pub struct ReadingRepository {
    pool: PgPool,
}

impl ReadingRepository {
    /// Create a new reading repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store one sample
    pub async fn insert(&self, device: &str, temperature: f64, humidity: f64) -> Result<SensorReading> {
        let reading = sqlx::query_as::<_, SensorReading>(
            r#"
            INSERT INTO sensor_readings (device, temperature, humidity)
            VALUES ($1, $2, $3)
            RETURNING id, device, temperature, humidity, recorded_at
            "#,
        )
        .bind(device)
        .bind(temperature)
        .bind(humidity)
        .fetch_one(&self.pool)
        .await?;

        Ok(reading)
    }

    /// Latest N samples across all devices
    pub async fn recent(&self, limit: i64) -> Result<Vec<SensorReading>> {
        let readings = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device, temperature, humidity, recorded_at
            FROM sensor_readings
            ORDER BY recorded_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(readings)
    }

    /// Most recent sample, optionally for one device
    pub async fn latest(&self, device: Option<&str>) -> Result<Option<SensorReading>> {
        let reading = match device {
            Some(device) => {
                sqlx::query_as::<_, SensorReading>(
                    r#"
                    SELECT id, device, temperature, humidity, recorded_at
                    FROM sensor_readings
                    WHERE device = $1
                    ORDER BY recorded_at DESC
                    LIMIT 1
                    "#,
                )
                .bind(device)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SensorReading>(
                    r#"
                    SELECT id, device, temperature, humidity, recorded_at
                    FROM sensor_readings
                    ORDER BY recorded_at DESC
                    LIMIT 1
                    "#,
                )
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(reading)
    }

    /// Aggregate statistics over the trailing window
    pub async fn stats(&self, hours: i64) -> Result<ReadingStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_readings,
                AVG(temperature) AS temperature_avg,
                MAX(temperature) AS temperature_max,
                MIN(temperature) AS temperature_min,
                AVG(humidity) AS humidity_avg,
                MAX(humidity) AS humidity_max,
                MIN(humidity) AS humidity_min,
                MIN(recorded_at) AS first_reading,
                MAX(recorded_at) AS last_reading
            FROM sensor_readings
            WHERE recorded_at > now() - ($1 * INTERVAL '1 hour')
            "#,
        )
        .bind(hours)
        .fetch_one(&self.pool)
        .await?;

        Ok(ReadingStats {
            total_readings: row.get("total_readings"),
            temperature_avg: round2(row.get("temperature_avg")),
            temperature_max: round2(row.get("temperature_max")),
            temperature_min: round2(row.get("temperature_min")),
            humidity_avg: round2(row.get("humidity_avg")),
            humidity_max: round2(row.get("humidity_max")),
            humidity_min: round2(row.get("humidity_min")),
            first_reading: row.get("first_reading"),
            last_reading: row.get("last_reading"),
        })
    }

    /// Samples between two instants, oldest first
    pub async fn range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>> {
        let readings = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device, temperature, humidity, recorded_at
            FROM sensor_readings
            WHERE recorded_at BETWEEN $1 AND $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(readings)
    }

    /// Delete samples older than the retention window, returning the count
    pub async fn delete_older_than(&self, days: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM sensor_readings WHERE recorded_at < now() - ($1 * INTERVAL '1 day')")
                .bind(days)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

fn round2(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round2(Some(21.456)), Some(21.46));
        assert_eq!(round2(Some(-0.004)), Some(-0.0));
        assert_eq!(round2(None), None);
    }
}
