//! HTTP API for the CarePulse back-office.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use types::{ApiContext, CallerContext};
