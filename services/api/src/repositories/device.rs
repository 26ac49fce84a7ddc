//! Device repository for database operations
//!
//! Every query is scoped by the owning user; a device belonging to
//! someone else is indistinguishable from a missing one. Deletion is a
//! soft delete via the `active` flag.

use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Device, DevicePatch, DeviceStatus, NewDevice};

const DEVICE_COLUMNS: &str = "id, user_id, name, kind, external_id, description, location, \
                              config, status, active, registered_at, last_seen";

/// Device repository
#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Create a new device repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List a user's devices, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(&format!(
            r#"
            SELECT {DEVICE_COLUMNS}
            FROM devices
            WHERE user_id = $1 AND active = TRUE
            ORDER BY registered_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(devices)
    }

    /// Find one of a user's devices by ID
    pub async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(&format!(
            r#"
            SELECT {DEVICE_COLUMNS}
            FROM devices
            WHERE id = $1 AND user_id = $2 AND active = TRUE
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    /// Check whether an external identifier is already registered
    pub async fn external_id_exists(&self, external_id: &str) -> Result<bool> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM devices WHERE external_id = $1 LIMIT 1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Register a new device for a user
    pub async fn create(&self, user_id: Uuid, name: &str, device: &NewDevice) -> Result<Device> {
        let created = sqlx::query_as::<_, Device>(&format!(
            r#"
            INSERT INTO devices
                (user_id, name, kind, external_id, description, location, config, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(name)
        .bind(&device.kind)
        .bind(&device.external_id)
        .bind(&device.description)
        .bind(&device.location)
        .bind(&device.config)
        .bind(DeviceStatus::Inactive)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Apply a field-wise patch to one of a user's devices
    ///
    /// Returns false when no live device matched (absent, soft-deleted,
    /// or owned by someone else).
    pub async fn update(&self, id: Uuid, user_id: Uuid, patch: &DevicePatch) -> Result<bool> {
        let mut query = patch_query(id, user_id, patch);
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete one of a user's devices
    pub async fn soft_delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE devices SET active = FALSE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a connection-state change reported by the device
    pub async fn set_status(&self, id: Uuid, user_id: Uuid, status: DeviceStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE devices SET status = $1, last_seen = now() WHERE id = $2 AND user_id = $3",
        )
        .bind(status)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Render a patch as an UPDATE statement; only supplied fields become SET
/// clauses, and a double-option None binds SQL NULL.
fn patch_query(id: Uuid, user_id: Uuid, patch: &DevicePatch) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE devices SET ");

    {
        let mut set = query.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ");
            set.push_bind_unseparated(name.clone());
        }
        if let Some(kind) = &patch.kind {
            set.push("kind = ");
            set.push_bind_unseparated(kind.clone());
        }
        if let Some(external_id) = &patch.external_id {
            set.push("external_id = ");
            set.push_bind_unseparated(external_id.clone());
        }
        if let Some(description) = &patch.description {
            set.push("description = ");
            set.push_bind_unseparated(description.clone());
        }
        if let Some(location) = &patch.location {
            set.push("location = ");
            set.push_bind_unseparated(location.clone());
        }
        if let Some(config) = &patch.config {
            set.push("config = ");
            set.push_bind_unseparated(config.clone());
        }
        if let Some(status) = patch.status {
            set.push("status = ");
            set.push_bind_unseparated(status);
        }
    }

    query.push(" WHERE id = ");
    query.push_bind(id);
    query.push(" AND user_id = ");
    query.push_bind(user_id);
    query.push(" AND active = TRUE");

    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_renders_only_supplied_fields() {
        let patch = DevicePatch {
            name: Some("garage".to_string()),
            status: Some(DeviceStatus::Active),
            ..Default::default()
        };

        let query = patch_query(Uuid::new_v4(), Uuid::new_v4(), &patch);
        assert_eq!(
            query.sql(),
            "UPDATE devices SET name = $1, status = $2 \
             WHERE id = $3 AND user_id = $4 AND active = TRUE"
        );
    }

    #[test]
    fn explicit_null_becomes_a_set_clause() {
        let patch = DevicePatch {
            external_id: Some(None),
            ..Default::default()
        };

        let query = patch_query(Uuid::new_v4(), Uuid::new_v4(), &patch);
        assert_eq!(
            query.sql(),
            "UPDATE devices SET external_id = $1 \
             WHERE id = $2 AND user_id = $3 AND active = TRUE"
        );
    }

    #[test]
    fn full_patch_renders_every_column() {
        let patch: DevicePatch = serde_json::from_str(
            r#"{
                "name": "garage",
                "kind": "ESP8266",
                "external_id": "esp-07",
                "description": null,
                "location": "north wall",
                "config": {"interval_s": 30},
                "status": "active"
            }"#,
        )
        .unwrap();

        let query = patch_query(Uuid::new_v4(), Uuid::new_v4(), &patch);
        assert_eq!(
            query.sql(),
            "UPDATE devices SET name = $1, kind = $2, external_id = $3, description = $4, \
             location = $5, config = $6, status = $7 \
             WHERE id = $8 AND user_id = $9 AND active = TRUE"
        );
    }
}
