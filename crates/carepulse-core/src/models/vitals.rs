//! Vital sign readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of measurement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    /// Systolic in `value`, diastolic in `secondary_value`
    BloodPressure,
    HeartRate,
    Glucose,
    Spo2,
    Weight,
    Temperature,
}

text_enum!(VitalKind, "vital kind", {
    BloodPressure => "blood_pressure",
    HeartRate => "heart_rate",
    Glucose => "glucose",
    Spo2 => "spo2",
    Weight => "weight",
    Temperature => "temperature",
});

impl VitalKind {
    /// Conventional unit when the caller does not supply one.
    pub fn default_unit(&self) -> &'static str {
        match self {
            VitalKind::BloodPressure => "mmHg",
            VitalKind::HeartRate => "bpm",
            VitalKind::Glucose => "mg/dL",
            VitalKind::Spo2 => "%",
            VitalKind::Weight => "kg",
            VitalKind::Temperature => "°C",
        }
    }
}

/// A single vital reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalReading {
    pub id: String,
    pub patient_id: String,
    /// Device that produced the reading, None for manual entry
    pub device_id: Option<String>,
    pub kind: VitalKind,
    pub value: f64,
    pub secondary_value: Option<f64>,
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
}

impl VitalReading {
    pub fn new(patient_id: String, kind: VitalKind, value: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            device_id: None,
            kind,
            value,
            secondary_value: None,
            unit: kind.default_unit().to_string(),
            recorded_at: Utc::now(),
        }
    }
}
