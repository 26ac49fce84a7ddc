//! Device registry models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Device status as reported by, or about, the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Inactive,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
            DeviceStatus::Error => "error",
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DeviceStatus::Active),
            "inactive" => Ok(DeviceStatus::Inactive),
            "error" => Ok(DeviceStatus::Error),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

/// Device entity, owned by exactly one user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: String,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub config: Option<serde_json::Value>,
    pub status: DeviceStatus,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Request for device creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub config: Option<serde_json::Value>,
}

fn default_kind() -> String {
    "ESP32".to_string()
}

/// Field-wise device update
///
/// An omitted field leaves the column untouched; nullable columns accept
/// an explicit null to clear the value, which the double-option fields
/// keep distinguishable from omission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub external_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub config: Option<Option<serde_json::Value>>,
    pub status: Option<DeviceStatus>,
}

impl DevicePatch {
    /// True when no field was supplied at all
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.external_id.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.config.is_none()
            && self.status.is_none()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Request for the device status endpoint; the raw string is validated
/// against the enum so an unknown value becomes a 400, not a 422
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}
