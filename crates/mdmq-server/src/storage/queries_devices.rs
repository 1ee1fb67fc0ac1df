//! Device registry queries.

use mdmq_core::db::unix_timestamp;

use super::db::{DatabaseError, MdmDatabase};
use super::models::Device;

impl MdmDatabase {
    /// Record a newly enrolled device.
    pub async fn enroll_device(
        &self,
        udid: &str,
        serial_number: Option<&str>,
        awaiting_configuration: bool,
    ) -> Result<Device, DatabaseError> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO devices (uuid, udid, serial_number, awaiting_configuration, enrolled_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(udid)
        .bind(serial_number)
        .bind(awaiting_configuration)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_device(udid).await
    }

    /// Get a device by UDID.
    pub async fn get_device(&self, udid: &str) -> Result<Device, DatabaseError> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE udid = ?")
            .bind(udid)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {udid}")))
    }

    /// Get only the surrogate key of a device.
    pub async fn get_device_uuid(&self, udid: &str) -> Result<String, DatabaseError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT uuid FROM devices WHERE udid = ?")
            .bind(udid)
            .fetch_optional(self.pool())
            .await?;

        row.map(|(uuid,)| uuid)
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {udid}")))
    }

    /// Get only the awaiting-configuration flag of a device.
    pub async fn get_awaiting_configuration(&self, udid: &str) -> Result<bool, DatabaseError> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT awaiting_configuration FROM devices WHERE udid = ?")
                .bind(udid)
                .fetch_optional(self.pool())
                .await?;

        row.map(|(awaiting,)| awaiting)
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {udid}")))
    }

    /// Every device claiming either this UDID or this serial number.
    ///
    /// More than one row means two records disagree about which physical
    /// device they describe.
    pub async fn find_devices(
        &self,
        udid: &str,
        serial_number: Option<&str>,
    ) -> Result<Vec<Device>, DatabaseError> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE udid = ? OR serial_number = ? ORDER BY enrolled_at ASC",
        )
        .bind(udid)
        .bind(serial_number)
        .fetch_all(self.pool())
        .await?;

        Ok(devices)
    }

    /// Overwrite a device's reported attributes and check-in snapshot.
    pub async fn update_device_attributes(&self, device: &Device) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE devices SET serial_number = ?, product_name = ?, build_version = ?, device_name = ?, imei = ?, meid = ?, model = ?, os_version = ?, last_query_response = ?, last_checkin = ? WHERE uuid = ?",
        )
        .bind(&device.serial_number)
        .bind(&device.product_name)
        .bind(&device.build_version)
        .bind(&device.device_name)
        .bind(&device.imei)
        .bind(&device.meid)
        .bind(&device.model)
        .bind(&device.os_version)
        .bind(&device.last_query_response)
        .bind(device.last_checkin)
        .bind(&device.uuid)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Device {}", device.udid)));
        }
        Ok(())
    }

    /// Set or clear the awaiting-configuration flag.
    pub async fn set_awaiting_configuration(
        &self,
        udid: &str,
        awaiting: bool,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE devices SET awaiting_configuration = ? WHERE udid = ?")
            .bind(awaiting)
            .bind(udid)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
