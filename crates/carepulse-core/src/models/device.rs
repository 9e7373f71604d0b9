//! Remote monitoring devices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational state of a device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Active,
    Inactive,
    Maintenance,
}

text_enum!(DeviceStatus, "device status", {
    Active => "active",
    Inactive => "inactive",
    Maintenance => "maintenance",
});

/// A device shipped to (or held for) a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub id: String,
    /// Assigned patient, None while in stock
    pub patient_id: Option<String>,
    /// Device category (e.g., "blood_pressure_cuff", "glucometer")
    pub device_type: String,
    /// Manufacturer serial number, unique across the fleet
    pub serial_number: String,
    pub status: DeviceStatus,
    /// Time of the most recent vital recorded through this device
    pub last_reading_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn new(device_type: String, serial_number: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: None,
            device_type,
            serial_number,
            status: DeviceStatus::Active,
            last_reading_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.patient_id.is_some()
    }
}
