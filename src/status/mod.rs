//! # Status Module
//!
//! Two-color link health indicator.
//!
//! This module handles:
//! - A wrapping millisecond clock abstraction
//! - The non-blocking blink state machine sampling link validity once per cycle
//! - Driving the green and red outputs (log-only or sysfs LEDs)

pub mod clock;
pub mod annunciator;
pub mod indicator;

pub use annunciator::{Annunciator, AnnunciatorTiming, LedCommand, Phase};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use indicator::{Indicator, LogIndicator, SysfsLedIndicator};
