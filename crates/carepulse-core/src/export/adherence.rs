//! Medication adherence report.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::{DoseStatus, MedicationSession, MedicationTrackingRecord};

/// Adherence report over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdherenceReport {
    /// Restricted to one patient, if requested
    pub patient_id: Option<String>,
    /// First scheduled date included
    pub from: NaiveDate,
    /// Last scheduled date included
    pub to: NaiveDate,
    /// Export timestamp
    pub generated_at: String,
    /// One row per session with slots in range
    pub sessions: Vec<SessionAdherence>,
}

/// Status counts for a single medication session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionAdherence {
    pub session_id: String,
    pub patient_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub pending: u32,
    pub taken: u32,
    pub late: u32,
    pub missed: u32,
    pub overtaken: u32,
    /// Sum of dose counts across slots
    pub total_doses: u32,
    /// Recorded-intake slots over resolved slots; None when nothing resolved yet
    pub adherence_rate: Option<f64>,
}

impl SessionAdherence {
    fn new(session: &MedicationSession) -> Self {
        Self {
            session_id: session.id.clone(),
            patient_id: session.patient_id.clone(),
            medication_name: session.medication_name.clone(),
            dosage: session.dosage.clone(),
            pending: 0,
            taken: 0,
            late: 0,
            missed: 0,
            overtaken: 0,
            total_doses: 0,
            adherence_rate: None,
        }
    }

    fn count(&mut self, record: &MedicationTrackingRecord) {
        match record.status {
            DoseStatus::Pending => self.pending += 1,
            DoseStatus::Taken => self.taken += 1,
            DoseStatus::Late => self.late += 1,
            DoseStatus::Missed => self.missed += 1,
            DoseStatus::Overtaken => self.overtaken += 1,
        }
        self.total_doses += record.dose_count;
    }

    fn finish(&mut self) {
        let intake = self.taken + self.late + self.overtaken;
        let resolved = intake + self.missed;
        self.adherence_rate = (resolved > 0).then(|| f64::from(intake) / f64::from(resolved));
    }
}

impl AdherenceReport {
    /// Build a report from tracking rows joined with their sessions.
    ///
    /// Rows must be grouped by session, as returned by
    /// [`Database::list_tracking_with_sessions`].
    pub fn from_rows(
        patient_id: Option<String>,
        from: NaiveDate,
        to: NaiveDate,
        rows: &[(MedicationSession, MedicationTrackingRecord)],
    ) -> Self {
        let mut sessions: Vec<SessionAdherence> = Vec::new();

        for (session, record) in rows {
            match sessions.last_mut() {
                Some(current) if current.session_id == session.id => current.count(record),
                _ => {
                    let mut entry = SessionAdherence::new(session);
                    entry.count(record);
                    sessions.push(entry);
                }
            }
        }
        sessions.iter_mut().for_each(SessionAdherence::finish);

        Self {
            patient_id,
            from,
            to,
            generated_at: Utc::now().to_rfc3339(),
            sessions,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("session_id,patient_id,medication_name,dosage,pending,taken,late,missed,overtaken,total_doses,adherence_rate\n");

        for row in &self.sessions {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&row.session_id),
                escape_csv(&row.patient_id),
                escape_csv(&row.medication_name),
                escape_csv(&row.dosage),
                row.pending,
                row.taken,
                row.late,
                row.missed,
                row.overtaken,
                row.total_doses,
                row.adherence_rate.map(|r| format!("{:.4}", r)).unwrap_or_default(),
            ));
        }

        csv
    }
}

/// Adherence exporter.
pub struct AdherenceExporter<'a> {
    db: &'a Database,
}

impl<'a> AdherenceExporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Summarise tracking records scheduled between `from` and `to` inclusive.
    pub fn export(&self, patient_id: Option<&str>, from: NaiveDate, to: NaiveDate) -> DbResult<AdherenceReport> {
        let rows = self.db.list_tracking_with_sessions(patient_id, from, to)?;
        Ok(AdherenceReport::from_rows(
            patient_id.map(str::to_string),
            from,
            to,
            &rows,
        ))
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
