//! Telehealth visit queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitPriority {
    Routine,
    Urgent,
}

text_enum!(VisitPriority, "visit priority", {
    Routine => "routine",
    Urgent => "urgent",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    /// In the queue
    Waiting,
    /// Picked up by a clinician
    InProgress,
    Completed,
    Cancelled,
}

text_enum!(VisitStatus, "visit status", {
    Waiting => "waiting",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// A patient's request for a telehealth visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelehealthVisit {
    pub id: String,
    pub patient_id: String,
    pub reason: String,
    pub priority: VisitPriority,
    pub status: VisitStatus,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Clinician who picked the visit up
    pub assigned_to: Option<String>,
}

impl TelehealthVisit {
    pub fn new(patient_id: String, reason: String, priority: VisitPriority) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            reason,
            priority,
            status: VisitStatus::Waiting,
            requested_at: Utc::now(),
            started_at: None,
            completed_at: None,
            assigned_to: None,
        }
    }

    /// Waiting or in progress.
    pub fn is_open(&self) -> bool {
        matches!(self.status, VisitStatus::Waiting | VisitStatus::InProgress)
    }
}
