//! # TIC Protocol Module
//!
//! Implementation of the Enedis teleinformation (TIC) customer stream.
//!
//! This module handles:
//! - Byte-level framing (STX/ETX frames, LF..CR information groups)
//! - Historic and standard mode separators
//! - Information group checksum verification
//! - Producing one [`protocol::TelemetryRecord`] per decoded group

pub mod protocol;
pub mod checksum;
pub mod decoder;
