//! Periodic missed-dose sweep.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::types::ApiContext;

/// Spawn a task that marks overdue pending doses as missed every `period`.
pub fn spawn_sweeper(ctx: ApiContext, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let ctx = ctx.clone();
            match tokio::task::spawn_blocking(move || ctx.sweep_missed()).await {
                Ok(Ok(0)) => tracing::debug!("Missed-dose sweep found nothing"),
                Ok(Ok(count)) => tracing::info!(count, "Missed-dose sweep"),
                Ok(Err(e)) => tracing::error!(error = %e, "Missed-dose sweep failed"),
                Err(e) => tracing::error!(error = %e, "Missed-dose sweep task panicked"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use carepulse_content::MockCompleter;
    use carepulse_core::{Database, DoseStatus, MedicationSession, MedicationTrackingRecord, Patient};
    use chrono::{Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};

    #[tokio::test]
    async fn sweeper_marks_overdue_doses() {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Ada Lovelace".into());
        db.insert_patient(&patient).unwrap();

        let yesterday = Utc::now().date_naive() - ChronoDuration::days(1);
        let session = MedicationSession::new(
            patient.id.clone(),
            "Metformin".into(),
            "500mg".into(),
            "daily".into(),
            vec![NaiveTime::from_hms_opt(8, 0, 0).unwrap()],
            yesterday,
        );
        db.insert_session(&session).unwrap();
        let record = MedicationTrackingRecord::pending(session.id.clone(), yesterday, session.times_of_day[0]);
        db.insert_tracking_records(std::slice::from_ref(&record)).unwrap();

        let ctx = ApiContext::new(db, FixedOffset::east_opt(0).unwrap(), Arc::new(MockCompleter));
        let handle = spawn_sweeper(ctx.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let stored = ctx.lock_db().unwrap().get_tracking_record(&record.id).unwrap().unwrap();
        assert_eq!(stored.status, DoseStatus::Missed);
    }
}
