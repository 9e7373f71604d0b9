//! Expansion of medication sessions into dose slots.

use chrono::NaiveDate;

use crate::models::{MedicationSession, MedicationTrackingRecord};

/// Pending slots for `session` that follow `last_expanded`, up to `through`.
///
/// Starts at the later of the session start and the day after
/// `last_expanded`; stops at the earlier of the session end and `through`.
/// Inactive sessions yield nothing.
pub fn expansion_slots(
    session: &MedicationSession,
    last_expanded: Option<NaiveDate>,
    through: NaiveDate,
) -> Vec<MedicationTrackingRecord> {
    if !session.active || session.times_of_day.is_empty() {
        return Vec::new();
    }

    let first = match last_expanded.and_then(|d| d.succ_opt()) {
        Some(next) if next > session.start_date => next,
        _ => session.start_date,
    };
    let last = session.end_date.map_or(through, |end| end.min(through));

    first
        .iter_days()
        .take_while(|date| *date <= last)
        .flat_map(|date| {
            session.times_of_day.iter().map(move |time| {
                MedicationTrackingRecord::pending(session.id.clone(), date, *time)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn session() -> MedicationSession {
        MedicationSession::new(
            "patient-1".into(),
            "Metformin".into(),
            "500 mg".into(),
            "twice daily".into(),
            vec![
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            ],
            date(10),
        )
    }

    #[test]
    fn test_fresh_session() {
        let slots = expansion_slots(&session(), None, date(12));
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[0].scheduled_date, date(10));
        assert_eq!(slots[0].scheduled_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(slots[5].scheduled_date, date(12));
    }

    #[test]
    fn test_continues_after_last_expanded() {
        let slots = expansion_slots(&session(), Some(date(11)), date(13));
        let dates: Vec<_> = slots.iter().map(|s| s.scheduled_date).collect();
        assert_eq!(dates, vec![date(12), date(12), date(13), date(13)]);
    }

    #[test]
    fn test_respects_end_date() {
        let mut session = session();
        session.end_date = Some(date(11));
        assert_eq!(expansion_slots(&session, None, date(20)).len(), 4);
        assert!(expansion_slots(&session, Some(date(11)), date(20)).is_empty());
    }

    #[test]
    fn test_through_before_start() {
        assert!(expansion_slots(&session(), None, date(9)).is_empty());
    }

    #[test]
    fn test_inactive_session_skipped() {
        let mut session = session();
        session.active = false;
        assert!(expansion_slots(&session, None, date(20)).is_empty());
    }
}
