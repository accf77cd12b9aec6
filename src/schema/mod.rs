//! Raw session input schema
//!
//! This module defines the loosely populated session record handed over by
//! ingestion collaborators, and helpers for reading batches of them from JSON.
//! Records become [`SwimmingSession`](crate::types::SwimmingSession) values only
//! after structural checks.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
