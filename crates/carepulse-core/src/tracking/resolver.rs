//! Dose-status resolution.
//!
//! Pure functions: they take a record, an action and the current time and
//! return the record as it should be stored. Persistence lives in
//! [`DoseTracker`](super::DoseTracker).

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::models::{DoseStatus, MedicationTrackingRecord};

/// Minutes after the scheduled moment within which a dose still counts as on time.
pub const GRACE_WINDOW_MINUTES: i64 = 30;

/// Tolerance after the scheduled moment before a dose is late.
pub fn grace_window() -> Duration {
    Duration::minutes(GRACE_WINDOW_MINUTES)
}

/// An action recorded against a dose slot.
#[derive(Debug, Clone, PartialEq)]
pub enum DoseAction {
    /// Record that the dose was taken now; timing decides taken vs late.
    MarkTaken,
    /// Force a status, optionally replacing the notes.
    Explicit {
        status: DoseStatus,
        notes: Option<String>,
    },
}

/// Status a dose taken at `now` gets for a slot due at `scheduled_at`.
pub fn status_for_intake(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> DoseStatus {
    if now > scheduled_at + grace_window() {
        DoseStatus::Late
    } else {
        DoseStatus::Taken
    }
}

/// Apply an action to a record.
///
/// Does not touch `recorded_by` or `updated_at`; the caller stamps those.
pub fn resolve(
    record: &MedicationTrackingRecord,
    action: DoseAction,
    now: DateTime<Utc>,
    zone: &FixedOffset,
) -> MedicationTrackingRecord {
    let mut next = record.clone();

    match action {
        DoseAction::MarkTaken => {
            next.status = status_for_intake(record.scheduled_at(zone), now);
            next.taken_at = Some(now);
            next.dose_count = record.dose_count.saturating_add(1);
        }
        DoseAction::Explicit { status, notes } => {
            next.status = status;
            next.taken_at = status.records_intake().then_some(now);
            if status == DoseStatus::Overtaken {
                next.dose_count = record.dose_count.saturating_add(1);
            }
            if notes.is_some() {
                next.notes = notes;
            }
        }
    }

    next
}

/// Whether the correction sweep should move this record to missed.
pub fn is_overdue(record: &MedicationTrackingRecord, now: DateTime<Utc>, zone: &FixedOffset) -> bool {
    record.status == DoseStatus::Pending && record.scheduled_at(zone) < now
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use proptest::prelude::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn slot(dose_count: u32) -> MedicationTrackingRecord {
        let mut record = MedicationTrackingRecord::pending(
            "session-1".into(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        );
        record.dose_count = dose_count;
        record
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn any_status() -> impl Strategy<Value = DoseStatus> {
        prop::sample::select(DoseStatus::ALL.to_vec())
    }

    #[test]
    fn test_mark_taken_late_example() {
        let record = slot(2);
        let now = at(8, 45);

        let next = resolve(&record, DoseAction::MarkTaken, now, &utc());
        assert_eq!(next.status, DoseStatus::Late);
        assert_eq!(next.taken_at.unwrap().to_rfc3339(), "2024-01-01T08:45:00+00:00");
        assert_eq!(next.dose_count, 3);

        let later = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let overtaken = resolve(
            &next,
            DoseAction::Explicit {
                status: DoseStatus::Overtaken,
                notes: None,
            },
            later,
            &utc(),
        );
        assert_eq!(overtaken.status, DoseStatus::Overtaken);
        assert_eq!(overtaken.dose_count, 4);
        assert_eq!(overtaken.taken_at, Some(later));
    }

    #[test]
    fn test_grace_window_boundary_is_on_time() {
        let next = resolve(&slot(0), DoseAction::MarkTaken, at(8, 30), &utc());
        assert_eq!(next.status, DoseStatus::Taken);

        let next = resolve(&slot(0), DoseAction::MarkTaken, at(8, 31), &utc());
        assert_eq!(next.status, DoseStatus::Late);
    }

    #[test]
    fn test_early_dose_is_taken() {
        let next = resolve(&slot(0), DoseAction::MarkTaken, at(7, 15), &utc());
        assert_eq!(next.status, DoseStatus::Taken);
    }

    #[test]
    fn test_reference_zone_shifts_scheduled_moment() {
        // 08:00 at UTC-05:00 is 13:00 UTC; 13:20 UTC is within the window
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let next = resolve(&slot(0), DoseAction::MarkTaken, at(13, 20), &eastern);
        assert_eq!(next.status, DoseStatus::Taken);

        // The same instant is late against a UTC schedule
        let next = resolve(&slot(0), DoseAction::MarkTaken, at(13, 20), &utc());
        assert_eq!(next.status, DoseStatus::Late);
    }

    #[test]
    fn test_explicit_late_is_verbatim() {
        // Explicit statuses ignore timing
        let next = resolve(
            &slot(1),
            DoseAction::Explicit {
                status: DoseStatus::Late,
                notes: Some("patient called in".into()),
            },
            at(8, 5),
            &utc(),
        );
        assert_eq!(next.status, DoseStatus::Late);
        assert_eq!(next.dose_count, 1);
        assert_eq!(next.notes.as_deref(), Some("patient called in"));
    }

    #[test]
    fn test_explicit_without_notes_keeps_existing() {
        let mut record = slot(0);
        record.notes = Some("with food".into());

        let next = resolve(
            &record,
            DoseAction::Explicit {
                status: DoseStatus::Taken,
                notes: None,
            },
            at(8, 0),
            &utc(),
        );
        assert_eq!(next.notes.as_deref(), Some("with food"));
    }

    #[test]
    fn test_is_overdue() {
        let record = slot(0);
        assert!(!is_overdue(&record, at(8, 0), &utc()));
        assert!(is_overdue(&record, at(8, 1), &utc()));

        let mut taken = slot(1);
        taken.status = DoseStatus::Taken;
        assert!(!is_overdue(&taken, at(12, 0), &utc()));
    }

    proptest! {
        #[test]
        fn prop_mark_taken_respects_grace_window(minutes in -600i64..600, count in 0u32..1000) {
            let record = slot(count);
            let scheduled = record.scheduled_at(&utc());
            let now = scheduled + Duration::minutes(minutes);

            let next = resolve(&record, DoseAction::MarkTaken, now, &utc());
            let expected = if minutes <= GRACE_WINDOW_MINUTES { DoseStatus::Taken } else { DoseStatus::Late };
            prop_assert_eq!(next.status, expected);
            prop_assert_eq!(next.taken_at, Some(now));
            prop_assert_eq!(next.dose_count, count + 1);
        }

        #[test]
        fn prop_overtaken_increments_once(status in any_status(), count in 0u32..1000) {
            let mut record = slot(count);
            record.status = status;

            let next = resolve(
                &record,
                DoseAction::Explicit { status: DoseStatus::Overtaken, notes: None },
                at(10, 0),
                &utc(),
            );
            prop_assert_eq!(next.dose_count, count + 1);
            prop_assert_eq!(next.taken_at, Some(at(10, 0)));
        }

        #[test]
        fn prop_missed_and_pending_clear_taken_at(
            target in prop::sample::select(vec![DoseStatus::Missed, DoseStatus::Pending]),
            count in 0u32..1000,
        ) {
            let mut record = slot(count);
            record.status = DoseStatus::Taken;
            record.taken_at = Some(at(8, 0));

            let next = resolve(
                &record,
                DoseAction::Explicit { status: target, notes: None },
                at(10, 0),
                &utc(),
            );
            prop_assert_eq!(next.status, target);
            prop_assert!(next.taken_at.is_none());
            prop_assert_eq!(next.dose_count, count);
        }
    }
}
