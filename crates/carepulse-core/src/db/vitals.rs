//! Vital reading database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, text_column, Database, DbError, DbResult};
use crate::models::{VitalKind, VitalReading};

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<VitalReading> {
    Ok(VitalReading {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        device_id: row.get(2)?,
        kind: text_column(row, 3)?,
        value: row.get(4)?,
        secondary_value: row.get(5)?,
        unit: row.get(6)?,
        recorded_at: row.get(7)?,
    })
}

impl Database {
    /// Store a reading and bump the producing device's `last_reading_at`.
    pub fn record_vital(&self, reading: &VitalReading) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        if let Some(device_id) = &reading.device_id {
            let owner: Option<Option<String>> = tx
                .query_row(
                    "SELECT patient_id FROM devices WHERE id = ?",
                    [device_id],
                    |row| row.get(0),
                )
                .optional()?;

            match owner {
                None => return Err(DbError::NotFound(format!("device {}", device_id))),
                Some(Some(patient_id)) if patient_id != reading.patient_id => {
                    return Err(DbError::Constraint(format!(
                        "device {} is assigned to another patient",
                        device_id
                    )))
                }
                Some(_) => {}
            }

            tx.execute(
                r#"
                UPDATE devices SET last_reading_at = ?2
                WHERE id = ?1 AND (last_reading_at IS NULL OR last_reading_at < ?2)
                "#,
                params![device_id, reading.recorded_at],
            )?;
        }

        tx.execute(
            r#"
            INSERT INTO vital_readings (
                id, patient_id, device_id, kind, value, secondary_value, unit, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                reading.id,
                reading.patient_id,
                reading.device_id,
                reading.kind.as_str(),
                reading.value,
                reading.secondary_value,
                reading.unit,
                reading.recorded_at,
            ],
        )
        .map_err(|e| constraint_error(e, "vital reading"))?;

        tx.commit()?;
        Ok(())
    }

    /// Most recent readings for a patient, newest first.
    pub fn list_vitals(
        &self,
        patient_id: &str,
        kind: Option<VitalKind>,
        limit: usize,
    ) -> DbResult<Vec<VitalReading>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_id, device_id, kind, value, secondary_value, unit, recorded_at
            FROM vital_readings
            WHERE patient_id = ?1 AND (?2 IS NULL OR kind = ?2)
            ORDER BY recorded_at DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(
            params![patient_id, kind.map(|k| k.as_str()), limit as i64],
            reading_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
