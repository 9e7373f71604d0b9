//! CarePulse Core Library
//!
//! Remote patient monitoring back-office: patients, devices, vitals,
//! telehealth queue, medication schedules and dose tracking, articles.
//!
//! # Architecture
//!
//! ```text
//!   MedicationSession (times of day, start/end)
//!           │
//!           ▼  expand (cron / CLI / API)
//!   [medication_tracking: pending slots]
//!           │
//!           ├──── sweep: elapsed pending ──► missed
//!           │
//!           ▼  patient or caregiver action
//!   ┌───────────────────────────────────────┐
//!   │          Dose-Status Resolver         │
//!   │  take: taken / late (30 min grace)    │
//!   │  track: explicit status, counters     │
//!   └───────────────────┬───────────────────┘
//!                       │
//!                       ▼
//!               Adherence export
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite layer with versioned, checksummed migrations
//! - [`models`]: Domain types (Patient, Device, MedicationSession, etc.)
//! - [`tracking`]: Dose-status resolver, schedule expansion, missed-dose sweep
//! - [`export`]: Adherence export (JSON, CSV)

pub mod db;
pub mod export;
pub mod models;
pub mod tracking;

// Re-export commonly used types
pub use db::{Database, DbError, DbResult};
pub use export::{AdherenceExporter, AdherenceReport};
pub use models::{
    Device, DeviceStatus, DoseStatus, MedicationSession, MedicationTrackingRecord, Patient,
    PatientStatus, Post, PostStatus, TelehealthVisit, VisitPriority, VisitStatus, VitalKind,
    VitalReading,
};
pub use tracking::{DoseAction, DoseTracker, TrackingError, TrackingResult, GRACE_WINDOW_MINUTES};
