//! Telehealth queue database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_error, text_column, Database, DbResult};
use crate::models::{TelehealthVisit, VisitStatus};

const VISIT_COLUMNS: &str = "id, patient_id, reason, priority, status, requested_at, \
                             started_at, completed_at, assigned_to";

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<TelehealthVisit> {
    Ok(TelehealthVisit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        reason: row.get(2)?,
        priority: text_column(row, 3)?,
        status: text_column(row, 4)?,
        requested_at: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
        assigned_to: row.get(8)?,
    })
}

impl Database {
    pub fn insert_visit(&self, visit: &TelehealthVisit) -> DbResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO telehealth_visits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    VISIT_COLUMNS
                ),
                params![
                    visit.id,
                    visit.patient_id,
                    visit.reason,
                    visit.priority.as_str(),
                    visit.status.as_str(),
                    visit.requested_at,
                    visit.started_at,
                    visit.completed_at,
                    visit.assigned_to,
                ],
            )
            .map_err(|e| constraint_error(e, "telehealth visit"))?;
        Ok(())
    }

    pub fn get_visit(&self, id: &str) -> DbResult<Option<TelehealthVisit>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM telehealth_visits WHERE id = ?", VISIT_COLUMNS),
                [id],
                visit_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Waiting visits: urgent first, then oldest request first.
    pub fn list_waiting_visits(&self) -> DbResult<Vec<TelehealthVisit>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM telehealth_visits
            WHERE status = 'waiting'
            ORDER BY CASE priority WHEN 'urgent' THEN 0 ELSE 1 END, requested_at
            "#,
            VISIT_COLUMNS
        ))?;

        let rows = stmt.query_map([], visit_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Move a visit to `status` if it is currently in `from`.
    ///
    /// Returns false when the visit does not exist or is in another state.
    pub fn transition_visit(
        &self,
        id: &str,
        from: VisitStatus,
        to: VisitStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE telehealth_visits SET
                status = ?3,
                started_at = CASE WHEN ?3 = 'in_progress' THEN ?5 ELSE started_at END,
                completed_at = CASE WHEN ?3 IN ('completed', 'cancelled') THEN ?5 ELSE completed_at END,
                assigned_to = CASE WHEN ?3 = 'in_progress' THEN ?4 ELSE assigned_to END
            WHERE id = ?1 AND status = ?2
            "#,
            params![id, from.as_str(), to.as_str(), actor, at],
        )?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, VisitPriority};
    use chrono::Duration;

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Ada".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    #[test]
    fn test_queue_order() {
        let (db, patient) = setup_db();
        let now = Utc::now();

        let mut oldest = TelehealthVisit::new(patient.id.clone(), "refill".into(), VisitPriority::Routine);
        oldest.requested_at = now - Duration::minutes(30);
        let mut newer = TelehealthVisit::new(patient.id.clone(), "follow-up".into(), VisitPriority::Routine);
        newer.requested_at = now - Duration::minutes(10);
        let mut urgent = TelehealthVisit::new(patient.id.clone(), "chest pain".into(), VisitPriority::Urgent);
        urgent.requested_at = now;

        for visit in [&newer, &urgent, &oldest] {
            db.insert_visit(visit).unwrap();
        }

        let queue = db.list_waiting_visits().unwrap();
        let ids: Vec<_> = queue.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec![urgent.id.as_str(), oldest.id.as_str(), newer.id.as_str()]);
    }

    #[test]
    fn test_transition_lifecycle() {
        let (db, patient) = setup_db();
        let visit = TelehealthVisit::new(patient.id.clone(), "bp review".into(), VisitPriority::Routine);
        db.insert_visit(&visit).unwrap();

        let started = Utc::now();
        assert!(db
            .transition_visit(&visit.id, VisitStatus::Waiting, VisitStatus::InProgress, "dr-lee", started)
            .unwrap());
        // Already in progress: cannot start again
        assert!(!db
            .transition_visit(&visit.id, VisitStatus::Waiting, VisitStatus::InProgress, "dr-kim", started)
            .unwrap());

        assert!(db
            .transition_visit(&visit.id, VisitStatus::InProgress, VisitStatus::Completed, "dr-lee", Utc::now())
            .unwrap());

        let stored = db.get_visit(&visit.id).unwrap().unwrap();
        assert_eq!(stored.status, VisitStatus::Completed);
        assert_eq!(stored.assigned_to.as_deref(), Some("dr-lee"));
        assert_eq!(stored.started_at, Some(started));
        assert!(stored.completed_at.is_some());
        assert!(db.list_waiting_visits().unwrap().is_empty());
    }
}
