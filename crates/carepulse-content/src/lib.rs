//! Article drafting for the CarePulse content site.
//!
//! Builds chat prompts for a health-education writer, sends them to a
//! text-completion backend and parses the reply into a titled draft.
//! The HTTP backend is behind the `http` feature; [`MockCompleter`] works offline.

pub mod drafting;
#[cfg(feature = "http")]
pub mod http;
pub mod prompts;

pub use drafting::*;
#[cfg(feature = "http")]
pub use http::HttpCompleter;
pub use prompts::*;
