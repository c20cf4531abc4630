//! # TIC Bridge Library
//!
//! Forward electricity meter teleinformation (TIC) to a MySensors gateway.
//!
//! This library provides the core functionality for decoding the meter's
//! serial stream, deciding which values are worth transmitting, and driving
//! a two-color link health indicator.

pub mod config;
pub mod error;
pub mod tic;
pub mod dispatch;
pub mod status;
pub mod transport;
pub mod serial;
pub mod bridge;
