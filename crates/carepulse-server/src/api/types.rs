//! Shared types for the API layer.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{FixedOffset, Utc};

use carepulse_content::Completer;
use carepulse_core::{Database, DoseTracker};

use crate::api::error::ApiError;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Database>>,
    /// Reference zone for scheduled dose times
    pub zone: FixedOffset,
    pub completer: Arc<dyn Completer>,
}

impl ApiContext {
    pub fn new(db: Database, zone: FixedOffset, completer: Arc<dyn Completer>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            zone,
            completer,
        }
    }

    /// Lock the database for one read-modify-write.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, Database>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }

    /// Run the missed-dose sweep once.
    pub fn sweep_missed(&self) -> Result<usize, ApiError> {
        let db = self.lock_db()?;
        Ok(DoseTracker::new(&db, self.zone).sweep_missed(Utc::now())?)
    }
}

/// Caller identity, injected into request extensions by the caller middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub caller_id: String,
}
