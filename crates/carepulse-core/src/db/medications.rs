//! Medication session and dose tracking database operations.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, text_column, Database, DbError, DbResult};
use crate::models::{MedicationSession, MedicationTrackingRecord};

const SESSION_COLUMNS: &str = "id, patient_id, medication_name, dosage, frequency, times_of_day, \
                               start_date, end_date, active, created_at, updated_at";

const TRACKING_COLUMNS: &str = "id, session_id, scheduled_date, scheduled_time, status, taken_at, \
                                dose_count, notes, recorded_by, created_at, updated_at";

impl Database {
    // =========================================================================
    // Sessions
    // =========================================================================

    /// Insert a new medication session.
    pub fn insert_session(&self, session: &MedicationSession) -> DbResult<()> {
        let times_json = serde_json::to_string(&session.times_of_day)?;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO medication_sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    SESSION_COLUMNS
                ),
                params![
                    session.id,
                    session.patient_id,
                    session.medication_name,
                    session.dosage,
                    session.frequency,
                    times_json,
                    session.start_date,
                    session.end_date,
                    session.active,
                    session.created_at,
                    session.updated_at,
                ],
            )
            .map_err(|e| constraint_error(e, "medication session"))?;
        Ok(())
    }

    /// Get a session by ID.
    pub fn get_session(&self, id: &str) -> DbResult<Option<MedicationSession>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM medication_sessions WHERE id = ?", SESSION_COLUMNS),
                [id],
                SessionRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List sessions, optionally for one patient and/or only active ones.
    pub fn list_sessions(
        &self,
        patient_id: Option<&str>,
        active_only: bool,
    ) -> DbResult<Vec<MedicationSession>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM medication_sessions
            WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 = 0 OR active = 1)
            ORDER BY start_date, medication_name
            "#,
            SESSION_COLUMNS
        ))?;

        let rows = stmt.query_map(params![patient_id, active_only], SessionRow::from_row)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.try_into()?);
        }
        Ok(sessions)
    }

    /// Deactivate a session. Its tracking records are kept.
    pub fn deactivate_session(&self, id: &str, end_date: Option<NaiveDate>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medication_sessions SET
                active = 0,
                end_date = COALESCE(?2, end_date),
                updated_at = ?3
            WHERE id = ?1
            "#,
            params![id, end_date, Utc::now()],
        )?;
        Ok(rows_affected > 0)
    }

    // =========================================================================
    // Tracking records
    // =========================================================================

    /// Insert dose slots, skipping any slot that already exists.
    ///
    /// Returns the number of slots actually created.
    pub fn insert_tracking_records(&self, records: &[MedicationTrackingRecord]) -> DbResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut created = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO medication_tracking ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                TRACKING_COLUMNS
            ))?;
            for record in records {
                created += stmt
                    .execute(params![
                        record.id,
                        record.session_id,
                        record.scheduled_date,
                        record.scheduled_time,
                        record.status.as_str(),
                        record.taken_at,
                        record.dose_count,
                        record.notes,
                        record.recorded_by,
                        record.created_at,
                        record.updated_at,
                    ])
                    .map_err(|e| constraint_error(e, "tracking record"))?;
            }
        }
        tx.commit()?;
        Ok(created)
    }

    /// Get a tracking record by ID.
    pub fn get_tracking_record(&self, id: &str) -> DbResult<Option<MedicationTrackingRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM medication_tracking WHERE id = ?", TRACKING_COLUMNS),
                [id],
                tracking_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Write back the mutable fields of a tracking record.
    pub fn update_tracking_record(&self, record: &MedicationTrackingRecord) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medication_tracking SET
                status = ?2,
                taken_at = ?3,
                dose_count = ?4,
                notes = ?5,
                recorded_by = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.status.as_str(),
                record.taken_at,
                record.dose_count,
                record.notes,
                record.recorded_by,
                record.updated_at,
            ],
        )?;

        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("tracking record {}", record.id)));
        }
        Ok(())
    }

    /// Tracking records of a session within an inclusive date range.
    pub fn list_tracking_for_session(
        &self,
        session_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<MedicationTrackingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM medication_tracking
            WHERE session_id = ?1
              AND (?2 IS NULL OR scheduled_date >= ?2)
              AND (?3 IS NULL OR scheduled_date <= ?3)
            ORDER BY scheduled_date, scheduled_time
            "#,
            TRACKING_COLUMNS
        ))?;

        let rows = stmt.query_map(params![session_id, from, to], tracking_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Pending records scheduled on or before `through`.
    pub fn list_pending_through(&self, through: NaiveDate) -> DbResult<Vec<MedicationTrackingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM medication_tracking
            WHERE status = 'pending' AND scheduled_date <= ?1
            ORDER BY scheduled_date, scheduled_time
            "#,
            TRACKING_COLUMNS
        ))?;

        let rows = stmt.query_map([through], tracking_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Move a record to missed only if nobody has acted on it yet.
    pub fn mark_missed_if_pending(&self, id: &str, at: DateTime<Utc>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE medication_tracking SET status = 'missed', taken_at = NULL, updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
            params![id, at],
        )?;
        Ok(rows_affected > 0)
    }

    /// Latest scheduled date already expanded for a session.
    pub fn last_scheduled_date(&self, session_id: &str) -> DbResult<Option<NaiveDate>> {
        let last: Option<NaiveDate> = self.conn.query_row(
            "SELECT MAX(scheduled_date) FROM medication_tracking WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(last)
    }

    /// Tracking records joined with their session, for reporting.
    pub fn list_tracking_with_sessions(
        &self,
        patient_id: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<(MedicationSession, MedicationTrackingRecord)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.patient_id, s.medication_name, s.dosage, s.frequency, s.times_of_day,
                   s.start_date, s.end_date, s.active, s.created_at, s.updated_at,
                   t.id, t.session_id, t.scheduled_date, t.scheduled_time, t.status, t.taken_at,
                   t.dose_count, t.notes, t.recorded_by, t.created_at, t.updated_at
            FROM medication_tracking t
            JOIN medication_sessions s ON s.id = t.session_id
            WHERE (?1 IS NULL OR s.patient_id = ?1)
              AND t.scheduled_date >= ?2 AND t.scheduled_date <= ?3
            ORDER BY s.patient_id, s.medication_name, s.id, t.scheduled_date, t.scheduled_time
            "#,
        )?;

        let rows = stmt.query_map(params![patient_id, from, to], |row| {
            let session = SessionRow::from_row(row)?;
            let record = tracking_from_row_at(row, 11)?;
            Ok((session, record))
        })?;

        let mut joined = Vec::new();
        for row in rows {
            let (session, record) = row?;
            joined.push((session.try_into()?, record));
        }
        Ok(joined)
    }
}

fn tracking_from_row(row: &Row<'_>) -> rusqlite::Result<MedicationTrackingRecord> {
    tracking_from_row_at(row, 0)
}

fn tracking_from_row_at(row: &Row<'_>, base: usize) -> rusqlite::Result<MedicationTrackingRecord> {
    Ok(MedicationTrackingRecord {
        id: row.get(base)?,
        session_id: row.get(base + 1)?,
        scheduled_date: row.get(base + 2)?,
        scheduled_time: row.get(base + 3)?,
        status: text_column(row, base + 4)?,
        taken_at: row.get(base + 5)?,
        dose_count: row.get(base + 6)?,
        notes: row.get(base + 7)?,
        recorded_by: row.get(base + 8)?,
        created_at: row.get(base + 9)?,
        updated_at: row.get(base + 10)?,
    })
}

/// Intermediate row struct for database mapping.
struct SessionRow {
    id: String,
    patient_id: String,
    medication_name: String,
    dosage: String,
    frequency: String,
    times_of_day: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            medication_name: row.get(2)?,
            dosage: row.get(3)?,
            frequency: row.get(4)?,
            times_of_day: row.get(5)?,
            start_date: row.get(6)?,
            end_date: row.get(7)?,
            active: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl TryFrom<SessionRow> for MedicationSession {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let times_of_day: Vec<NaiveTime> = serde_json::from_str(&row.times_of_day)?;

        Ok(MedicationSession {
            id: row.id,
            patient_id: row.patient_id,
            medication_name: row.medication_name,
            dosage: row.dosage,
            frequency: row.frequency,
            times_of_day,
            start_date: row.start_date,
            end_date: row.end_date,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
