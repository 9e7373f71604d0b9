//! Request middleware.

pub mod caller;
