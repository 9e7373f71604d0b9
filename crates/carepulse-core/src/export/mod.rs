//! Export of tracking data for reporting.

mod adherence;

pub use adherence::*;
