//! Monitoring device database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, text_column, Database, DbResult};
use crate::models::Device;

const DEVICE_COLUMNS: &str =
    "id, patient_id, device_type, serial_number, status, last_reading_at, created_at";

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        device_type: row.get(2)?,
        serial_number: row.get(3)?,
        status: text_column(row, 4)?,
        last_reading_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    /// Register a device. Serial numbers must be unique.
    pub fn insert_device(&self, device: &Device) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO devices (
                    id, patient_id, device_type, serial_number, status, last_reading_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    device.id,
                    device.patient_id,
                    device.device_type,
                    device.serial_number,
                    device.status.as_str(),
                    device.last_reading_at,
                    device.created_at,
                ],
            )
            .map_err(|e| constraint_error(e, "device"))?;
        Ok(())
    }

    /// Update assignment, type and status of a device.
    pub fn update_device(&self, device: &Device) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE devices SET
                    patient_id = ?2,
                    device_type = ?3,
                    serial_number = ?4,
                    status = ?5
                WHERE id = ?1
                "#,
                params![
                    device.id,
                    device.patient_id,
                    device.device_type,
                    device.serial_number,
                    device.status.as_str(),
                ],
            )
            .map_err(|e| constraint_error(e, "device"))?;
        Ok(rows_affected > 0)
    }

    pub fn get_device(&self, id: &str) -> DbResult<Option<Device>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM devices WHERE id = ?", DEVICE_COLUMNS),
                [id],
                device_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List devices, optionally only those assigned to one patient.
    pub fn list_devices(&self, patient_id: Option<&str>) -> DbResult<Vec<Device>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM devices WHERE (?1 IS NULL OR patient_id = ?1) ORDER BY serial_number",
            DEVICE_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], device_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_device(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM devices WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use crate::models::{DeviceStatus, Patient};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Ada".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    #[test]
    fn test_insert_and_list_by_patient() {
        let (db, patient) = setup_db();

        let mut cuff = Device::new("blood_pressure_cuff".into(), "BP-001".into());
        cuff.patient_id = Some(patient.id.clone());
        db.insert_device(&cuff).unwrap();

        let spare = Device::new("glucometer".into(), "GL-001".into());
        db.insert_device(&spare).unwrap();

        assert_eq!(db.list_devices(None).unwrap().len(), 2);

        let assigned = db.list_devices(Some(&patient.id)).unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].serial_number, "BP-001");
        assert!(assigned[0].is_assigned());
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let (db, _) = setup_db();
        db.insert_device(&Device::new("scale".into(), "SC-1".into())).unwrap();

        let result = db.insert_device(&Device::new("scale".into(), "SC-1".into()));
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_update_status() {
        let (db, _) = setup_db();
        let mut device = Device::new("pulse_oximeter".into(), "OX-9".into());
        db.insert_device(&device).unwrap();

        device.status = DeviceStatus::Maintenance;
        assert!(db.update_device(&device).unwrap());

        let retrieved = db.get_device(&device.id).unwrap().unwrap();
        assert_eq!(retrieved.status, DeviceStatus::Maintenance);
    }

    #[test]
    fn test_deleting_patient_unassigns_device() {
        let (db, patient) = setup_db();
        let mut device = Device::new("scale".into(), "SC-2".into());
        device.patient_id = Some(patient.id.clone());
        db.insert_device(&device).unwrap();

        db.delete_patient(&patient.id).unwrap();

        let retrieved = db.get_device(&device.id).unwrap().unwrap();
        assert!(retrieved.patient_id.is_none());
    }
}
