//! CarePulse server: HTTP API, configuration and background maintenance.

pub mod api;
pub mod config;
pub mod sweeper;

pub use api::{api_router, ApiContext, ApiError};
pub use config::{Config, ConfigError, ServeArgs};
