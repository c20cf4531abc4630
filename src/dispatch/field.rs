//! # Tracked Fields
//!
//! The closed set of meter labels the bridge forwards, and how each one is
//! decoded and gated.
//!
//! | Label(s) | Channel | Kind | Bound | Policy |
//! |----------|---------|------|-------|--------|
//! | ADCO, ADSC | 0 | Text | 12 chars | Once |
//! | BASE | 1 | Energy (kWh) | 9 digits | Increasing |
//! | PAPP | 2 | Power | 5 digits | Changed |
//! | IINST, IINST1, IRMS1 | 3 | Current | 3 digits | Changed |
//! | URMS1 | 3 | Voltage | 3 digits | Changed |
//! | IINST2, IRMS2 | 4 | Current | 3 digits | Changed |
//! | URMS2 | 4 | Voltage | 3 digits | Changed |
//! | IINST3, IRMS3 | 5 | Current | 3 digits | Changed |
//! | URMS3 | 5 | Voltage | 3 digits | Changed |

use super::digits::{accumulate_digits, copy_text};
use crate::transport::{Value, ValueKind};

/// Longest serial number copied from ADCO/ADSC
pub const SERIAL_NUMBER_LEN: usize = 12;

/// Digits read from the base energy index (Wh)
pub const BASE_INDEX_DIGITS: usize = 9;

/// Digits read from the apparent power (VA)
pub const APPARENT_POWER_DIGITS: usize = 5;

/// Digits read from phase currents and voltages
pub const PHASE_DIGITS: usize = 3;

/// A measurement tracked independently for publish decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SerialNumber,
    BaseIndex,
    ApparentPower,
    CurrentPhase1,
    VoltagePhase1,
    CurrentPhase2,
    VoltagePhase2,
    CurrentPhase3,
    VoltagePhase3,
}

/// When a freshly decoded value is worth transmitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPolicy {
    /// Only the first value is ever sent
    Once,
    /// First value, then only values strictly above the last one sent
    Increasing,
    /// First value, then any value different from the last one sent
    Changed,
}

impl Field {
    /// Number of tracked fields
    pub const COUNT: usize = 9;

    /// Every tracked field, in table order
    pub const ALL: [Field; Field::COUNT] = [
        Field::SerialNumber,
        Field::BaseIndex,
        Field::ApparentPower,
        Field::CurrentPhase1,
        Field::VoltagePhase1,
        Field::CurrentPhase2,
        Field::VoltagePhase2,
        Field::CurrentPhase3,
        Field::VoltagePhase3,
    ];

    /// Route a group label to its field (exact match)
    pub fn from_label(label: &str) -> Option<Field> {
        let field = match label {
            "ADCO" | "ADSC" => Field::SerialNumber,
            "BASE" => Field::BaseIndex,
            "PAPP" => Field::ApparentPower,
            "IINST" | "IINST1" | "IRMS1" => Field::CurrentPhase1,
            "URMS1" => Field::VoltagePhase1,
            "IINST2" | "IRMS2" => Field::CurrentPhase2,
            "URMS2" => Field::VoltagePhase2,
            "IINST3" | "IRMS3" => Field::CurrentPhase3,
            "URMS3" => Field::VoltagePhase3,
            _ => return None,
        };
        Some(field)
    }

    /// Position in the state table
    pub fn index(self) -> usize {
        self as usize
    }

    /// Logical channel the value is published on
    pub fn channel(self) -> u8 {
        match self {
            Field::SerialNumber => 0,
            Field::BaseIndex => 1,
            Field::ApparentPower => 2,
            Field::CurrentPhase1 | Field::VoltagePhase1 => 3,
            Field::CurrentPhase2 | Field::VoltagePhase2 => 4,
            Field::CurrentPhase3 | Field::VoltagePhase3 => 5,
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Field::SerialNumber => ValueKind::Text,
            Field::BaseIndex => ValueKind::Energy,
            Field::ApparentPower => ValueKind::Power,
            Field::CurrentPhase1 | Field::CurrentPhase2 | Field::CurrentPhase3 => {
                ValueKind::Current
            }
            Field::VoltagePhase1 | Field::VoltagePhase2 | Field::VoltagePhase3 => {
                ValueKind::Voltage
            }
        }
    }

    pub fn policy(self) -> PublishPolicy {
        match self {
            Field::SerialNumber => PublishPolicy::Once,
            Field::BaseIndex => PublishPolicy::Increasing,
            _ => PublishPolicy::Changed,
        }
    }

    /// Maximum number of characters read from the raw data
    pub fn bound(self) -> usize {
        match self {
            Field::SerialNumber => SERIAL_NUMBER_LEN,
            Field::BaseIndex => BASE_INDEX_DIGITS,
            Field::ApparentPower => APPARENT_POWER_DIGITS,
            _ => PHASE_DIGITS,
        }
    }

    /// Convert raw group data into this field's typed value
    pub fn decode(self, data: &str) -> Value {
        match self {
            Field::SerialNumber => Value::Text(copy_text(data, self.bound())),
            Field::BaseIndex => Value::Kilo(accumulate_digits(data, self.bound())),
            _ => Value::Count(accumulate_digits(data, self.bound())),
        }
    }
}

/// Remembered publish state of one field
///
/// No last value means nothing was ever accepted by the transport, so the
/// next decoded value is always eligible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldState {
    last_published: Option<Value>,
}

impl FieldState {
    pub fn has_published(&self) -> bool {
        self.last_published.is_some()
    }

    pub fn last_published(&self) -> Option<&Value> {
        self.last_published.as_ref()
    }

    /// Remember a value the transport accepted
    pub fn record(&mut self, value: Value) {
        self.last_published = Some(value);
    }

    /// Forget the baseline; the next value is treated as the first
    pub fn clear(&mut self) {
        self.last_published = None;
    }
}

impl PublishPolicy {
    /// Whether `candidate` should be published given the field's state
    pub fn should_publish(self, state: &FieldState, candidate: &Value) -> bool {
        let last = match state.last_published() {
            None => return true,
            Some(last) => last,
        };

        match self {
            PublishPolicy::Once => false,
            PublishPolicy::Increasing => matches!(
                (candidate.as_u32(), last.as_u32()),
                (Some(new), Some(old)) if new > old
            ),
            PublishPolicy::Changed => candidate != last,
        }
    }
}
