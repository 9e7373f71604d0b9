//! Configuration from command-line flags with environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use clap::Args;

use carepulse_content::{Completer, HttpCompleter, MockCompleter};

/// Log filter used when neither `RUST_LOG` nor `CAREPULSE_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "carepulse=info,carepulse_server=info,carepulse_core=info,tower_http=info";

/// Days ahead expanded when the request does not say.
pub const DEFAULT_EXPAND_DAYS: u32 = 7;
/// Furthest ahead a session may be expanded, in days.
pub const MAX_EXPAND_DAYS: u32 = 366;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("UTC offset of {0} minutes is out of range")]
    InvalidOffset(i32),

    #[error("Completion client error: {0}")]
    Completion(String),
}

/// Options shared by every command.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// SQLite database file
    #[arg(long = "db", env = "CAREPULSE_DB", default_value = "carepulse.db", global = true)]
    pub database: PathBuf,

    /// Offset of the reference time zone for dose schedules, in minutes east of UTC
    #[arg(
        long,
        env = "CAREPULSE_UTC_OFFSET_MINUTES",
        default_value_t = 0,
        allow_negative_numbers = true,
        global = true
    )]
    pub utc_offset_minutes: i32,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, env = "CAREPULSE_LOG", default_value = DEFAULT_LOG_FILTER, global = true)]
    pub log: String,
}

impl Config {
    /// Reference time zone for scheduled dose times.
    pub fn reference_zone(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_minutes))
    }
}

/// Options for `carepulse serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "CAREPULSE_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Seconds between missed-dose sweeps (0 disables the background sweep)
    #[arg(long, env = "CAREPULSE_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// Chat-completion endpoint for article drafting; drafts offline when unset
    #[arg(long, env = "CAREPULSE_COMPLETION_URL")]
    pub completion_url: Option<String>,

    /// Bearer key for the completion endpoint
    #[arg(long, env = "CAREPULSE_COMPLETION_API_KEY", hide_env_values = true)]
    pub completion_api_key: Option<String>,

    /// Model name sent with completion requests
    #[arg(long, env = "CAREPULSE_COMPLETION_MODEL", default_value = "gpt-4o-mini")]
    pub completion_model: String,

    /// Completion request timeout in seconds
    #[arg(long, env = "CAREPULSE_COMPLETION_TIMEOUT_SECS", default_value_t = 60)]
    pub completion_timeout_secs: u64,
}

impl ServeArgs {
    /// Background sweep period, if enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Completion backend: HTTP when a URL is configured, offline otherwise.
    ///
    /// Builds a blocking HTTP client; call outside the async runtime's workers.
    pub fn completer(&self) -> Result<Arc<dyn Completer>, ConfigError> {
        match self.completion_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => {
                let completer = HttpCompleter::new(
                    url,
                    self.completion_api_key.clone(),
                    &self.completion_model,
                    self.completion_timeout_secs,
                )
                .map_err(|e| ConfigError::Completion(e.to_string()))?;
                tracing::info!(url, model = %self.completion_model, "Drafting with completion service");
                Ok(Arc::new(completer))
            }
            None => {
                tracing::info!("No completion service configured; drafting offline");
                Ok(Arc::new(MockCompleter))
            }
        }
    }
}
