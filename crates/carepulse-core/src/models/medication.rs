//! Medication sessions and per-slot dose tracking.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::UnknownValue;

/// Status of a single dose slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DoseStatus {
    /// Scheduled moment not reached, no action recorded
    Pending,
    /// Recorded within the grace window
    Taken,
    /// Scheduled moment passed without an action
    Missed,
    /// Recorded after the grace window
    Late,
    /// An additional dose recorded for an already-recorded slot
    Overtaken,
}

impl DoseStatus {
    pub const ALL: [DoseStatus; 5] = [
        DoseStatus::Pending,
        DoseStatus::Taken,
        DoseStatus::Missed,
        DoseStatus::Late,
        DoseStatus::Overtaken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DoseStatus::Pending => "pending",
            DoseStatus::Taken => "taken",
            DoseStatus::Missed => "missed",
            DoseStatus::Late => "late",
            DoseStatus::Overtaken => "overtaken",
        }
    }

    /// Whether a dose was actually administered in this state.
    pub fn records_intake(&self) -> bool {
        matches!(
            self,
            DoseStatus::Taken | DoseStatus::Late | DoseStatus::Overtaken
        )
    }
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DoseStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownValue::new("dose status", s))
    }
}

/// An active medication schedule for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationSession {
    /// Unique session ID
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Medication display name
    pub medication_name: String,
    /// Dosage label (e.g., "10 mg")
    pub dosage: String,
    /// Frequency label (e.g., "twice daily")
    pub frequency: String,
    /// Times of day a dose is due, in the reference zone
    pub times_of_day: Vec<NaiveTime>,
    /// First day of the schedule
    pub start_date: NaiveDate,
    /// Last day of the schedule (open-ended if None)
    pub end_date: Option<NaiveDate>,
    /// Inactive sessions are never expanded
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicationSession {
    /// Create a new active session.
    pub fn new(
        patient_id: String,
        medication_name: String,
        dosage: String,
        frequency: String,
        times_of_day: Vec<NaiveTime>,
        start_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        let mut times_of_day = times_of_day;
        times_of_day.sort();
        times_of_day.dedup();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            medication_name,
            dosage,
            frequency,
            times_of_day,
            start_date,
            end_date: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the schedule covers a given date.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// One scheduled administration of a medication (a dose slot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationTrackingRecord {
    /// Unique record ID
    pub id: String,
    /// Owning medication session
    pub session_id: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: DoseStatus,
    /// When the dose was recorded as administered
    pub taken_at: Option<DateTime<Utc>>,
    /// Cumulative doses recorded against this slot
    pub dose_count: u32,
    pub notes: Option<String>,
    /// Caller who performed the last action
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicationTrackingRecord {
    /// Create a pending slot.
    pub fn pending(session_id: String, scheduled_date: NaiveDate, scheduled_time: NaiveTime) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            scheduled_date,
            scheduled_time,
            status: DoseStatus::Pending,
            taken_at: None,
            dose_count: 0,
            notes: None,
            recorded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The scheduled moment, interpreting date and time in the reference zone.
    pub fn scheduled_at(&self, zone: &FixedOffset) -> DateTime<Utc> {
        let local = self.scheduled_date.and_time(self.scheduled_time);
        let utc = local - Duration::seconds(i64::from(zone.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("late".parse::<DoseStatus>().unwrap(), DoseStatus::Late);
        assert_eq!("overtaken".parse::<DoseStatus>().unwrap(), DoseStatus::Overtaken);
        assert!("Taken".parse::<DoseStatus>().is_err());
        assert!("skipped".parse::<DoseStatus>().is_err());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&DoseStatus::Overtaken).unwrap();
        assert_eq!(json, "\"overtaken\"");
    }

    #[test]
    fn test_records_intake() {
        assert!(DoseStatus::Taken.records_intake());
        assert!(DoseStatus::Late.records_intake());
        assert!(DoseStatus::Overtaken.records_intake());
        assert!(!DoseStatus::Missed.records_intake());
        assert!(!DoseStatus::Pending.records_intake());
    }

    #[test]
    fn test_session_sorts_times() {
        let session = MedicationSession::new(
            "patient-1".into(),
            "Lisinopril".into(),
            "10 mg".into(),
            "twice daily".into(),
            vec![time(20, 0), time(8, 0), time(20, 0)],
            date(2024, 1, 1),
        );
        assert_eq!(session.times_of_day, vec![time(8, 0), time(20, 0)]);
        assert!(session.active);
    }

    #[test]
    fn test_session_covers() {
        let mut session = MedicationSession::new(
            "patient-1".into(),
            "Metformin".into(),
            "500 mg".into(),
            "daily".into(),
            vec![time(8, 0)],
            date(2024, 1, 10),
        );
        assert!(!session.covers(date(2024, 1, 9)));
        assert!(session.covers(date(2030, 1, 1)));

        session.end_date = Some(date(2024, 1, 12));
        assert!(session.covers(date(2024, 1, 12)));
        assert!(!session.covers(date(2024, 1, 13)));
    }

    #[test]
    fn test_scheduled_at_with_offset() {
        let record = MedicationTrackingRecord::pending("s".into(), date(2024, 1, 1), time(8, 0));

        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(record.scheduled_at(&utc).to_rfc3339(), "2024-01-01T08:00:00+00:00");

        // 08:00 at UTC-05:00 is 13:00 UTC
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(record.scheduled_at(&eastern).to_rfc3339(), "2024-01-01T13:00:00+00:00");
    }
}
