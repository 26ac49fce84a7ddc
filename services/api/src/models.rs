//! API models for request and response payloads

pub mod device;
pub mod reading;

pub use device::{Device, DevicePatch, DeviceStatus, NewDevice, StatusUpdateRequest};
pub use reading::{
    CleanupQuery, LatestQuery, NewReading, RangeQuery, ReadingStats, RecentQuery, SensorReading,
    StatsQuery,
};
