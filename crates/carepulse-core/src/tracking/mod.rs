//! Medication dose tracking.
//!
//! Pipeline: Session → Expansion (pending slots) → Patient action → Resolver
//!
//! The correction sweep moves elapsed pending slots to missed. It runs before
//! every tracking write, so a stale pending slot is never observed by a caller
//! that records an action.

mod resolver;
mod schedule;

pub use resolver::*;
pub use schedule::*;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{DoseStatus, MedicationSession, MedicationTrackingRecord, UnknownValue};

/// Dose tracking errors.
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store failure: {0}")]
    Store(#[from] DbError),
}

pub type TrackingResult<T> = Result<T, TrackingError>;

/// Records patient actions against dose slots.
pub struct DoseTracker<'a> {
    db: &'a Database,
    zone: FixedOffset,
}

impl<'a> DoseTracker<'a> {
    /// Create a tracker interpreting schedules in `zone`.
    pub fn new(db: &'a Database, zone: FixedOffset) -> Self {
        Self { db, zone }
    }

    /// Mark a dose taken now; late if past the grace window.
    ///
    /// The dose count grows on every call, including repeats for the same slot.
    pub fn take(
        &self,
        record_id: &str,
        caller: &str,
        now: DateTime<Utc>,
    ) -> TrackingResult<MedicationTrackingRecord> {
        let record = self.load_for_write(record_id, now)?;

        if record.status.records_intake() {
            tracing::warn!(
                record_id,
                status = %record.status,
                dose_count = record.dose_count,
                "Dose already recorded for slot; counting another intake"
            );
        }

        self.store(&record, DoseAction::MarkTaken, caller, now)
    }

    /// Set an explicit status on a dose slot.
    pub fn track(
        &self,
        record_id: &str,
        status: &str,
        notes: Option<String>,
        caller: &str,
        now: DateTime<Utc>,
    ) -> TrackingResult<MedicationTrackingRecord> {
        let status: DoseStatus = status
            .parse()
            .map_err(|e: UnknownValue| TrackingError::InvalidInput(e.to_string()))?;
        let record = self.load_for_write(record_id, now)?;

        self.store(&record, DoseAction::Explicit { status, notes }, caller, now)
    }

    /// Move every elapsed pending slot to missed. Returns how many moved.
    pub fn sweep_missed(&self, now: DateTime<Utc>) -> TrackingResult<usize> {
        let today = now.with_timezone(&self.zone).date_naive();

        let mut swept = 0;
        for record in self.db.list_pending_through(today)? {
            if is_overdue(&record, now, &self.zone) && self.db.mark_missed_if_pending(&record.id, now)? {
                swept += 1;
            }
        }

        if swept > 0 {
            tracing::info!(swept, "Marked elapsed doses as missed");
        }
        Ok(swept)
    }

    /// Create pending slots for a session through `through`. Returns how many were created.
    pub fn expand_session(&self, session: &MedicationSession, through: NaiveDate) -> TrackingResult<usize> {
        if !session.active {
            tracing::debug!(session_id = %session.id, "Skipping inactive session");
            return Ok(0);
        }

        let last = self.db.last_scheduled_date(&session.id)?;
        let slots = expansion_slots(session, last, through);
        let created = self.db.insert_tracking_records(&slots)?;

        tracing::info!(session_id = %session.id, %through, created, "Expanded medication session");
        Ok(created)
    }

    /// Expand every active session through `through`.
    pub fn expand_all(&self, through: NaiveDate) -> TrackingResult<usize> {
        let mut created = 0;
        for session in self.db.list_sessions(None, true)? {
            created += self.expand_session(&session, through)?;
        }
        Ok(created)
    }

    fn load_for_write(&self, record_id: &str, now: DateTime<Utc>) -> TrackingResult<MedicationTrackingRecord> {
        if record_id.trim().is_empty() {
            return Err(TrackingError::InvalidInput("tracking record id is required".into()));
        }

        self.sweep_missed(now)?;

        self.db
            .get_tracking_record(record_id)?
            .ok_or_else(|| TrackingError::NotFound(format!("tracking record {}", record_id)))
    }

    fn store(
        &self,
        record: &MedicationTrackingRecord,
        action: DoseAction,
        caller: &str,
        now: DateTime<Utc>,
    ) -> TrackingResult<MedicationTrackingRecord> {
        let mut next = resolve(record, action, now, &self.zone);
        next.recorded_by = Some(caller.to_string());
        next.updated_at = now;

        self.db.update_tracking_record(&next)?;

        tracing::debug!(
            record_id = %next.id,
            from = %record.status,
            to = %next.status,
            dose_count = next.dose_count,
            "Recorded dose action"
        );
        Ok(next)
    }
}
