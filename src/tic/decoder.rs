//! # TIC Frame Decoder
//!
//! Turns the raw byte stream from the meter into discrete information groups.
//!
//! Bytes are pushed in as they arrive from the serial port and [`FrameDecoder::poll`]
//! hands back at most one decoded group per call, so the caller's loop stays
//! non-blocking and bounded per iteration.

use bytes::{Buf, BytesMut};

use super::checksum::group_checksum;
use super::protocol::*;
use crate::error::BridgeError;

/// Upper bound on bytes waiting to be decoded before the backlog is dropped
pub const MAX_PENDING_BYTES: usize = 4096;

/// Result of one decoder poll
#[derive(Debug)]
pub enum Poll {
    /// No complete group available yet
    NoData,
    /// One information group decoded and verified
    Record(TelemetryRecord),
    /// The stream was corrupt; the offending group has been discarded
    Error(BridgeError),
}

/// Incremental TIC stream decoder
#[derive(Debug)]
pub struct FrameDecoder {
    mode: TicMode,
    pending: BytesMut,
    group: BytesMut,
    collecting: bool,
    overflowed: bool,
}

impl FrameDecoder {
    /// Create a decoder for the given teleinformation mode
    pub fn new(mode: TicMode) -> Self {
        Self {
            mode,
            pending: BytesMut::with_capacity(256),
            group: BytesMut::with_capacity(TIC_MAX_GROUP_SIZE),
            collecting: false,
            overflowed: false,
        }
    }

    /// Number of received bytes not yet consumed by [`poll`](Self::poll)
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue bytes read from the serial port
    ///
    /// If the backlog would exceed [`MAX_PENDING_BYTES`] it is dropped and the
    /// next poll reports an error.
    pub fn push(&mut self, data: &[u8]) {
        if self.pending.len() + data.len() > MAX_PENDING_BYTES {
            self.pending.clear();
            self.group.clear();
            self.collecting = false;
            self.overflowed = true;
            return;
        }
        self.pending.extend_from_slice(data);
    }

    /// Decode the next information group, if a complete one is buffered
    ///
    /// # Returns
    ///
    /// * `Poll::Record` - a checksum-verified group
    /// * `Poll::Error` - a corrupt group, an aborted frame or a dropped backlog
    /// * `Poll::NoData` - more bytes are needed
    pub fn poll(&mut self) -> Poll {
        if self.overflowed {
            self.overflowed = false;
            return Poll::Error(BridgeError::Tic(format!(
                "receive backlog exceeded {} bytes, data dropped",
                MAX_PENDING_BYTES
            )));
        }

        while self.pending.has_remaining() {
            let byte = self.pending.get_u8() & 0x7F;

            match byte {
                TIC_STX | TIC_ETX => {
                    if self.collecting {
                        self.collecting = false;
                        self.group.clear();
                        return Poll::Error(BridgeError::Tic(
                            "frame boundary inside information group".to_string(),
                        ));
                    }
                }
                TIC_EOT => {
                    if self.collecting {
                        self.collecting = false;
                        self.group.clear();
                        return Poll::Error(BridgeError::Tic(
                            "frame interrupted by meter (EOT)".to_string(),
                        ));
                    }
                }
                TIC_LF => {
                    let unterminated = self.collecting;
                    self.group.clear();
                    self.collecting = true;
                    if unterminated {
                        return Poll::Error(BridgeError::Tic(
                            "information group missing CR".to_string(),
                        ));
                    }
                }
                TIC_CR => {
                    if self.collecting {
                        self.collecting = false;
                        let result = parse_group(&self.group, self.mode);
                        self.group.clear();
                        return match result {
                            Ok(record) => Poll::Record(record),
                            Err(e) => Poll::Error(e),
                        };
                    }
                }
                _ => {
                    if self.collecting {
                        if self.group.len() >= TIC_MAX_GROUP_SIZE {
                            self.collecting = false;
                            self.group.clear();
                            return Poll::Error(BridgeError::Tic(format!(
                                "information group longer than {} bytes",
                                TIC_MAX_GROUP_SIZE
                            )));
                        }
                        self.group.extend_from_slice(&[byte]);
                    }
                }
            }
        }

        Poll::NoData
    }
}

/// Parse and verify the bytes between LF and CR
///
/// Layout: `label SEP [horodate SEP] data SEP checksum`
fn parse_group(group: &[u8], mode: TicMode) -> Result<TelemetryRecord, BridgeError> {
    let sep = mode.separator();

    if group.len() < 3 || group[group.len() - 2] != sep {
        return Err(BridgeError::Tic(format!(
            "malformed information group: {:?}",
            String::from_utf8_lossy(group)
        )));
    }

    let received = group[group.len() - 1];
    let covered = if mode.checksum_covers_last_separator() {
        &group[..group.len() - 1]
    } else {
        &group[..group.len() - 2]
    };
    let calculated = group_checksum(covered);

    let body = &group[..group.len() - 2];
    let mut parts = body.splitn(2, |&b| b == sep);
    let label = parts.next().unwrap_or_default();
    let rest = parts.next();

    if calculated != received {
        return Err(BridgeError::Tic(format!(
            "checksum mismatch on {}: expected 0x{:02X}, got 0x{:02X}",
            String::from_utf8_lossy(label),
            calculated,
            received
        )));
    }

    let rest = match rest {
        Some(rest) if !label.is_empty() => rest,
        _ => {
            return Err(BridgeError::Tic(format!(
                "malformed information group: {:?}",
                String::from_utf8_lossy(body)
            )))
        }
    };

    // Standard mode groups may carry an horodate before the value
    let data = match mode {
        TicMode::Historic => rest,
        TicMode::Standard => {
            let fields: Vec<&[u8]> = rest.split(|&b| b == sep).collect();
            match fields.as_slice() {
                [data] => *data,
                [_horodate, data] => *data,
                _ => {
                    return Err(BridgeError::Tic(format!(
                        "too many fields in group {}",
                        String::from_utf8_lossy(label)
                    )))
                }
            }
        }
    };

    Ok(TelemetryRecord::new(
        String::from_utf8_lossy(label).into_owned(),
        String::from_utf8_lossy(data).into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a historic-mode group with a valid checksum
    fn historic_group(label: &str, data: &str) -> Vec<u8> {
        let covered = format!("{} {}", label, data);
        let crc = group_checksum(covered.as_bytes());
        let mut group = vec![TIC_LF];
        group.extend_from_slice(covered.as_bytes());
        group.push(TIC_SEP_HISTORIC);
        group.push(crc);
        group.push(TIC_CR);
        group
    }

    /// Build a standard-mode group with a valid checksum
    fn standard_group(fields: &[&str]) -> Vec<u8> {
        let mut covered = fields.join("\t");
        covered.push('\t');
        let crc = group_checksum(covered.as_bytes());
        let mut group = vec![TIC_LF];
        group.extend_from_slice(covered.as_bytes());
        group.push(crc);
        group.push(TIC_CR);
        group
    }

    fn expect_record(poll: Poll) -> TelemetryRecord {
        match poll {
            Poll::Record(record) => record,
            other => panic!("Expected record, got: {:?}", other),
        }
    }

    fn expect_error(poll: Poll) -> String {
        match poll {
            Poll::Error(BridgeError::Tic(msg)) => msg,
            other => panic!("Expected TIC error, got: {:?}", other),
        }
    }

    #[test]
    fn test_empty_decoder_has_no_data() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        assert!(matches!(decoder.poll(), Poll::NoData));
    }

    #[test]
    fn test_decode_literal_historic_group() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"\x02\nPAPP 00350 )\r\x03");

        let record = expect_record(decoder.poll());
        assert_eq!(record, TelemetryRecord::new("PAPP", "00350"));
        assert!(matches!(decoder.poll(), Poll::NoData));
    }

    #[test]
    fn test_one_group_per_poll() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        let mut frame = vec![TIC_STX];
        frame.extend(historic_group("ADCO", "031428097115"));
        frame.extend(historic_group("BASE", "012345678"));
        frame.extend(historic_group("IINST", "002"));
        frame.push(TIC_ETX);
        decoder.push(&frame);

        assert_eq!(expect_record(decoder.poll()).name, "ADCO");
        assert_eq!(expect_record(decoder.poll()).name, "BASE");
        let last = expect_record(decoder.poll());
        assert_eq!(last.name, "IINST");
        assert_eq!(last.data, "002");
        assert!(matches!(decoder.poll(), Poll::NoData));
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_group_split_across_pushes() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        let group = historic_group("URMS1", "230");
        let (head, tail) = group.split_at(4);

        decoder.push(head);
        assert!(matches!(decoder.poll(), Poll::NoData));

        decoder.push(tail);
        assert_eq!(expect_record(decoder.poll()).data, "230");
    }

    #[test]
    fn test_checksum_mismatch_reports_error() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"\nPAPP 00350 X\r");

        let msg = expect_error(decoder.poll());
        assert!(msg.contains("checksum mismatch"));
        assert!(msg.contains("PAPP"));
    }

    #[test]
    fn test_decoder_recovers_after_error() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"\nPAPP 00350 X\r");
        decoder.push(&historic_group("PAPP", "00410"));

        expect_error(decoder.poll());
        assert_eq!(expect_record(decoder.poll()).data, "00410");
    }

    #[test]
    fn test_parity_bit_is_masked() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        let group: Vec<u8> = historic_group("IINST", "002")
            .into_iter()
            .map(|b| b | 0x80)
            .collect();
        decoder.push(&group);

        assert_eq!(expect_record(decoder.poll()).name, "IINST");
    }

    #[test]
    fn test_eot_aborts_group() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"\nPAPP 003");
        decoder.push(&[TIC_EOT]);

        let msg = expect_error(decoder.poll());
        assert!(msg.contains("EOT"));
        assert!(matches!(decoder.poll(), Poll::NoData));
    }

    #[test]
    fn test_eot_between_groups_is_ignored() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(&[TIC_EOT]);
        assert!(matches!(decoder.poll(), Poll::NoData));
    }

    #[test]
    fn test_missing_cr_reports_error_then_decodes_next() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"\nPAPP 00");
        decoder.push(&historic_group("IINST", "001"));

        let msg = expect_error(decoder.poll());
        assert!(msg.contains("missing CR"));
        assert_eq!(expect_record(decoder.poll()).data, "001");
    }

    #[test]
    fn test_malformed_group_without_separator() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"\nGARBAGE\r");

        let msg = expect_error(decoder.poll());
        assert!(msg.contains("malformed"));
    }

    #[test]
    fn test_oversized_group_is_rejected() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        let mut data = vec![TIC_LF];
        data.extend(std::iter::repeat(b'A').take(TIC_MAX_GROUP_SIZE + 1));
        decoder.push(&data);

        let msg = expect_error(decoder.poll());
        assert!(msg.contains("longer than"));
    }

    #[test]
    fn test_backlog_overflow_reports_error() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(&vec![b'A'; MAX_PENDING_BYTES]);
        decoder.push(b"A");

        let msg = expect_error(decoder.poll());
        assert!(msg.contains("backlog"));
        assert_eq!(decoder.pending_len(), 0);
        assert!(matches!(decoder.poll(), Poll::NoData));
    }

    #[test]
    fn test_standard_mode_group() {
        let mut decoder = FrameDecoder::new(TicMode::Standard);
        decoder.push(b"\nADSC\t041876097512\t?\r");

        let record = expect_record(decoder.poll());
        assert_eq!(record.name, "ADSC");
        assert_eq!(record.data, "041876097512");
    }

    #[test]
    fn test_standard_mode_group_with_horodate() {
        let mut decoder = FrameDecoder::new(TicMode::Standard);
        decoder.push(&standard_group(&["SMAXSN", "E230912064512", "05210"]));

        let record = expect_record(decoder.poll());
        assert_eq!(record.name, "SMAXSN");
        assert_eq!(record.data, "05210");
    }

    #[test]
    fn test_standard_checksum_includes_last_separator() {
        // A historic checksum on a standard group must be rejected
        let covered = "URMS1\t231";
        let crc = group_checksum(covered.as_bytes());
        let mut group = vec![TIC_LF];
        group.extend_from_slice(covered.as_bytes());
        group.push(TIC_SEP_STANDARD);
        group.push(crc);
        group.push(TIC_CR);

        let mut decoder = FrameDecoder::new(TicMode::Standard);
        decoder.push(&group);
        let msg = expect_error(decoder.poll());
        assert!(msg.contains("checksum mismatch"));
    }

    #[test]
    fn test_bytes_outside_groups_are_skipped() {
        let mut decoder = FrameDecoder::new(TicMode::Historic);
        decoder.push(b"noise");
        decoder.push(&historic_group("URMS2", "229"));

        assert_eq!(expect_record(decoder.poll()).data, "229");
    }
}
