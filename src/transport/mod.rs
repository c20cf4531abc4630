//! # Transport Module
//!
//! Types handed from the dispatcher to the radio side, and the seam the
//! dispatcher publishes through.
//!
//! This module handles:
//! - Publish events (channel, value kind, value)
//! - The [`Transport`] trait whose acknowledgement gates field state
//! - MySensors serial-protocol encoding ([`mysensors`])
//! - A bounded outbound queue feeding the gateway port ([`gateway`])

use std::fmt;

pub mod mysensors;
pub mod gateway;

/// Kind of measurement carried by a publish event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Free text (meter serial number)
    Text,
    /// Accumulated energy, in kWh
    Energy,
    /// Instantaneous power
    Power,
    /// Phase voltage
    Voltage,
    /// Phase current
    Current,
}

/// Value carried by a publish event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Verbatim text
    Text(String),
    /// Plain unsigned reading
    Count(u32),
    /// Base-unit counter shown in thousands with three decimals (Wh → kWh)
    Kilo(u32),
}

impl Value {
    /// Numeric reading, if this value has one
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Text(_) => None,
            Value::Count(v) | Value::Kilo(v) => Some(*v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Count(v) => write!(f, "{}", v),
            Value::Kilo(v) => write!(f, "{}.{:03}", v / 1000, v % 1000),
        }
    }
}

/// One request to transmit a field's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishEvent {
    /// Logical destination (sensor child id)
    pub channel: u8,
    /// Measurement kind
    pub kind: ValueKind,
    /// Value to transmit
    pub value: Value,
}

/// Outbound side of the bridge
///
/// `publish` returns `true` once the event has been delivered or accepted for
/// delivery. A `false` return leaves the caller's state untouched so the value
/// is offered again later.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Hand one event to the transport
    fn publish(&mut self, event: &PublishEvent) -> bool;
}
