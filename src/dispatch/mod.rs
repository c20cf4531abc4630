//! # Dataset Dispatcher Module
//!
//! Decides which decoded meter values are worth transmitting.
//!
//! This module handles:
//! - Decoding bounded numeric prefixes from raw group data
//! - Routing labels to a fixed set of tracked fields
//! - Per-field publish policies (once, increasing, changed)
//! - Advancing remembered state only when the transport accepts a value

pub mod digits;
pub mod field;
pub mod dispatcher;

pub use dispatcher::{BaselinePolicy, DispatchOutcome, Dispatcher};
pub use field::{Field, FieldState, PublishPolicy};
