//! # MySensors Serial Protocol
//!
//! Encodes publish events and node presentation as MySensors serial gateway
//! lines:
//!
//! ```text
//! node-id;child-sensor-id;command;ack;type;payload\n
//! ```
//!
//! ## Children
//!
//! | Child | Sensor | Description | Values |
//! |-------|--------|-------------|--------|
//! | 0 | S_INFO | Serial Number | V_TEXT |
//! | 1 | S_POWER | Base Index | V_KWH |
//! | 2 | S_POWER | Apparent Power | V_WATT |
//! | 3 | S_MULTIMETER | Phase 1 | V_CURRENT, V_VOLTAGE |
//! | 4 | S_MULTIMETER | Phase 2 | V_CURRENT, V_VOLTAGE |
//! | 5 | S_MULTIMETER | Phase 3 | V_CURRENT, V_VOLTAGE |

use super::{PublishEvent, ValueKind};

/// Child id addressing the node itself
pub const NODE_SENSOR_ID: u8 = 255;

/// Largest payload the radio layer carries
pub const MAX_PAYLOAD_SIZE: usize = 25;

/// Message commands
pub const C_PRESENTATION: u8 = 0;
pub const C_SET: u8 = 1;
pub const C_INTERNAL: u8 = 3;

/// Value types
pub const V_WATT: u8 = 17;
pub const V_KWH: u8 = 18;
pub const V_VOLTAGE: u8 = 38;
pub const V_CURRENT: u8 = 39;
pub const V_TEXT: u8 = 47;

/// Sensor types
pub const S_POWER: u8 = 13;
pub const S_MULTIMETER: u8 = 30;
pub const S_INFO: u8 = 36;

/// Internal message types
pub const I_SKETCH_NAME: u8 = 11;
pub const I_SKETCH_VERSION: u8 = 12;

/// Children presented at startup: (child id, sensor type, description)
pub const CHILDREN: [(u8, u8, &str); 6] = [
    (0, S_INFO, "Serial Number"),
    (1, S_POWER, "Base Index"),
    (2, S_POWER, "Apparent Power"),
    (3, S_MULTIMETER, "Phase 1"),
    (4, S_MULTIMETER, "Phase 2"),
    (5, S_MULTIMETER, "Phase 3"),
];

/// MySensors value type for a measurement kind
pub fn value_type(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Text => V_TEXT,
        ValueKind::Energy => V_KWH,
        ValueKind::Power => V_WATT,
        ValueKind::Voltage => V_VOLTAGE,
        ValueKind::Current => V_CURRENT,
    }
}

/// Encode one protocol line, newline included
///
/// The payload is truncated to [`MAX_PAYLOAD_SIZE`] characters and field or
/// line separators inside it are replaced by spaces.
pub fn encode_line(node_id: u8, child_id: u8, command: u8, msg_type: u8, payload: &str) -> String {
    let payload: String = payload
        .chars()
        .take(MAX_PAYLOAD_SIZE)
        .map(|c| if matches!(c, ';' | '\n' | '\r') { ' ' } else { c })
        .collect();

    format!("{};{};{};0;{};{}\n", node_id, child_id, command, msg_type, payload)
}

/// Encode a publish event as a set message
///
/// # Examples
///
/// ```
/// use tic_bridge::transport::{PublishEvent, Value, ValueKind};
/// use tic_bridge::transport::mysensors::encode_set;
///
/// let event = PublishEvent { channel: 1, kind: ValueKind::Energy, value: Value::Kilo(12_345_678) };
/// assert_eq!(encode_set(0, &event), "0;1;1;0;18;12345.678\n");
/// ```
pub fn encode_set(node_id: u8, event: &PublishEvent) -> String {
    encode_line(
        node_id,
        event.channel,
        C_SET,
        value_type(event.kind),
        &event.value.to_string(),
    )
}

/// Encode the node presentation sequence: sketch name, version, then children
pub fn encode_presentation(node_id: u8, sketch_name: &str, sketch_version: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(2 + CHILDREN.len());
    lines.push(encode_line(node_id, NODE_SENSOR_ID, C_INTERNAL, I_SKETCH_NAME, sketch_name));
    lines.push(encode_line(node_id, NODE_SENSOR_ID, C_INTERNAL, I_SKETCH_VERSION, sketch_version));
    for (child, sensor, description) in CHILDREN {
        lines.push(encode_line(node_id, child, C_PRESENTATION, sensor, description));
    }
    lines
}
