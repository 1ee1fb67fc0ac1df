//! Application and certificate inventory queries.
//!
//! Replaces delete and re-insert inside one transaction. Readers on other
//! connections keep seeing the previous snapshot until commit.

use super::db::{DatabaseError, MdmDatabase};
use super::models::{
    DeviceApplication, DeviceCertificate, NewDeviceApplication, NewDeviceCertificate,
};

impl MdmDatabase {
    // =========================================================================
    // Applications
    // =========================================================================

    /// Replace a device's application inventory with `apps`.
    pub async fn replace_device_applications(
        &self,
        device_uuid: &str,
        apps: &[NewDeviceApplication],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM device_applications WHERE device_uuid = ?")
            .bind(device_uuid)
            .execute(&mut *tx)
            .await?;

        for app in apps {
            sqlx::query(
                "INSERT INTO device_applications (device_uuid, name, identifier, short_version, version, bundle_size, dynamic_size) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(device_uuid)
            .bind(&app.name)
            .bind(&app.identifier)
            .bind(&app.short_version)
            .bind(&app.version)
            .bind(app.bundle_size)
            .bind(app.dynamic_size)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// A device's applications in reported order.
    pub async fn device_applications(
        &self,
        device_uuid: &str,
    ) -> Result<Vec<DeviceApplication>, DatabaseError> {
        let apps = sqlx::query_as::<_, DeviceApplication>(
            "SELECT * FROM device_applications WHERE device_uuid = ? ORDER BY id ASC",
        )
        .bind(device_uuid)
        .fetch_all(self.pool())
        .await?;

        Ok(apps)
    }

    // =========================================================================
    // Certificates
    // =========================================================================

    /// Replace a device's certificate inventory with `certs`.
    pub async fn replace_device_certificates(
        &self,
        device_uuid: &str,
        certs: &[NewDeviceCertificate],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM device_certificates WHERE device_uuid = ?")
            .bind(device_uuid)
            .execute(&mut *tx)
            .await?;

        for cert in certs {
            sqlx::query(
                "INSERT INTO device_certificates (device_uuid, common_name, is_identity, data) VALUES (?, ?, ?, ?)",
            )
            .bind(device_uuid)
            .bind(&cert.common_name)
            .bind(cert.is_identity)
            .bind(&cert.data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// A device's certificates in reported order.
    pub async fn device_certificates(
        &self,
        device_uuid: &str,
    ) -> Result<Vec<DeviceCertificate>, DatabaseError> {
        let certs = sqlx::query_as::<_, DeviceCertificate>(
            "SELECT * FROM device_certificates WHERE device_uuid = ? ORDER BY id ASC",
        )
        .bind(device_uuid)
        .fetch_all(self.pool())
        .await?;

        Ok(certs)
    }
}
