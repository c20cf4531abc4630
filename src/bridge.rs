//! # Bridge Loop
//!
//! One [`Bridge::poll_once`] call is one iteration of the cooperative loop:
//!
//! 1. Advance the status annunciator exactly once and drive the LEDs
//! 2. Ask the frame decoder for at most one information group
//! 3. Feed a decoded group to the dispatcher, or mark the link invalid on error
//!
//! Nothing here blocks; the caller supplies bytes with [`Bridge::feed`] and
//! the current time with each poll.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::status::{Annunciator, Indicator};
use crate::tic::decoder::{FrameDecoder, Poll};
use crate::transport::Transport;

/// Meter-to-gateway bridge state, exclusively owned by the polling loop
#[derive(Debug)]
pub struct Bridge<T: Transport, I: Indicator> {
    decoder: FrameDecoder,
    dispatcher: Dispatcher,
    annunciator: Annunciator,
    transport: T,
    indicator: I,
    link_valid: bool,
    link_timeout_ms: u32,
    last_record_at: u32,
}

impl<T: Transport, I: Indicator> Bridge<T, I> {
    /// Assemble a bridge from its parts
    ///
    /// # Arguments
    ///
    /// * `link_timeout_ms` - Silence after which the link is considered lost; 0 disables
    pub fn new(
        decoder: FrameDecoder,
        dispatcher: Dispatcher,
        annunciator: Annunciator,
        transport: T,
        indicator: I,
        link_timeout_ms: u32,
    ) -> Self {
        Self {
            decoder,
            dispatcher,
            annunciator,
            transport,
            indicator,
            link_valid: false,
            link_timeout_ms,
            last_record_at: 0,
        }
    }

    /// Build a bridge from validated configuration
    pub fn from_config(config: &Config, transport: T, indicator: I) -> Self {
        Self::new(
            FrameDecoder::new(config.meter.mode),
            Dispatcher::new(config.bridge.baseline_policy),
            Annunciator::new(config.indicator.timing()),
            transport,
            indicator,
            config.bridge.link_timeout_ms,
        )
    }

    /// Queue raw bytes read from the meter port
    pub fn feed(&mut self, bytes: &[u8]) {
        self.decoder.push(bytes);
    }

    /// Run one loop iteration at time `now` (wrapping milliseconds)
    ///
    /// # Returns
    ///
    /// * `Option<DispatchOutcome>` - Dispatcher result if a group was decoded
    pub fn poll_once(&mut self, now: u32) -> Option<DispatchOutcome> {
        let command = self.annunciator.advance(now, self.link_valid);
        if let Err(e) = self.indicator.apply(command) {
            warn!("Failed to drive status LEDs: {}", e);
        }

        match self.decoder.poll() {
            Poll::NoData => {
                self.check_link_timeout(now);
                None
            }
            Poll::Record(record) => {
                debug!("Received dataset {} = {}", record.name, record.data);
                if !self.link_valid {
                    info!("Meter link established");
                }
                self.link_valid = true;
                self.last_record_at = now;
                Some(self.dispatcher.handle(&record, &mut self.transport))
            }
            Poll::Error(e) => {
                warn!("Meter stream error: {}", e);
                self.mark_link_invalid();
                None
            }
        }
    }

    fn check_link_timeout(&mut self, now: u32) {
        if self.link_valid
            && self.link_timeout_ms > 0
            && now.wrapping_sub(self.last_record_at) >= self.link_timeout_ms
        {
            warn!("No meter data for {} ms", self.link_timeout_ms);
            self.mark_link_invalid();
        }
    }

    fn mark_link_invalid(&mut self) {
        if self.link_valid {
            info!("Meter link lost");
            self.dispatcher.link_lost();
        }
        self.link_valid = false;
    }

    /// Switch both status outputs off
    pub fn clear_indicator(&mut self) -> Result<()> {
        self.indicator.set_green(false)?;
        self.indicator.set_red(false)
    }

    pub fn link_valid(&self) -> bool {
        self.link_valid
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn annunciator(&self) -> &Annunciator {
        &self.annunciator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{BaselinePolicy, Field};
    use crate::serial::port_trait::mocks::MockSerialPort;
    use crate::status::{AnnunciatorTiming, Clock, LogIndicator, ManualClock, Phase};
    use crate::tic::checksum::group_checksum;
    use crate::tic::protocol::TicMode;
    use crate::transport::gateway::GatewayTransport;
    use crate::transport::{MockTransport, Value};
    use std::io;

    fn group(label: &str, data: &str) -> Vec<u8> {
        let covered = format!("{} {}", label, data);
        let mut bytes = vec![0x0A];
        bytes.extend_from_slice(covered.as_bytes());
        bytes.push(b' ');
        bytes.push(group_checksum(covered.as_bytes()));
        bytes.push(0x0D);
        bytes
    }

    fn bridge_with(
        transport: GatewayTransport,
        policy: BaselinePolicy,
        link_timeout_ms: u32,
    ) -> Bridge<GatewayTransport, LogIndicator> {
        Bridge::new(
            FrameDecoder::new(TicMode::Historic),
            Dispatcher::new(policy),
            Annunciator::new(AnnunciatorTiming::default()),
            transport,
            LogIndicator::new(),
            link_timeout_ms,
        )
    }

    fn gateway_bridge() -> Bridge<GatewayTransport, LogIndicator> {
        bridge_with(GatewayTransport::new(0, 1024), BaselinePolicy::Keep, 0)
    }

    fn pending_lines(bridge: &mut Bridge<GatewayTransport, LogIndicator>) -> Vec<String> {
        let pending = bridge.transport_mut().take_pending();
        String::from_utf8(pending.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_starts_with_link_invalid() {
        let bridge = gateway_bridge();
        assert!(!bridge.link_valid());
        assert_eq!(bridge.annunciator().phase(), Phase::Decide);
    }

    #[test]
    fn test_one_group_per_iteration() {
        let mut bridge = gateway_bridge();
        let mut frame = vec![0x02];
        frame.extend(group("ADCO", "031428097115"));
        frame.extend(group("BASE", "012345678"));
        frame.extend(group("PAPP", "00350"));
        frame.push(0x03);
        bridge.feed(&frame);

        assert!(matches!(bridge.poll_once(0), Some(DispatchOutcome::Published(_))));
        assert_eq!(pending_lines(&mut bridge), vec!["0;0;1;0;47;031428097115"]);

        assert!(matches!(bridge.poll_once(1), Some(DispatchOutcome::Published(_))));
        assert_eq!(pending_lines(&mut bridge), vec!["0;1;1;0;18;12345.678"]);

        assert!(matches!(bridge.poll_once(2), Some(DispatchOutcome::Published(_))));
        assert_eq!(pending_lines(&mut bridge), vec!["0;2;1;0;17;350"]);

        assert_eq!(bridge.poll_once(3), None);
        assert!(bridge.link_valid());
    }

    #[test]
    fn test_unchanged_values_are_not_resent() {
        let mut bridge = gateway_bridge();
        bridge.feed(&group("URMS1", "230"));
        bridge.feed(&group("URMS1", "230"));
        bridge.feed(&group("URMS1", "231"));

        bridge.poll_once(0);
        assert_eq!(
            bridge.poll_once(1),
            Some(DispatchOutcome::Suppressed(Field::VoltagePhase1))
        );
        bridge.poll_once(2);

        assert_eq!(
            pending_lines(&mut bridge),
            vec!["0;3;1;0;38;230", "0;3;1;0;38;231"]
        );
    }

    #[test]
    fn test_decode_error_invalidates_link_without_touching_state() {
        let mut bridge = gateway_bridge();
        bridge.feed(&group("PAPP", "00350"));
        bridge.feed(b"\nPAPP 00400 X\r");
        bridge.feed(&group("PAPP", "00350"));

        bridge.poll_once(0);
        assert!(bridge.link_valid());

        assert_eq!(bridge.poll_once(1), None);
        assert!(!bridge.link_valid());
        assert_eq!(
            bridge.dispatcher().state(Field::ApparentPower).last_published(),
            Some(&Value::Count(350))
        );

        // Baseline survived the outage
        assert_eq!(
            bridge.poll_once(2),
            Some(DispatchOutcome::Suppressed(Field::ApparentPower))
        );
        assert!(bridge.link_valid());
    }

    #[test]
    fn test_reset_policy_republishes_after_link_loss() {
        let mut bridge = bridge_with(
            GatewayTransport::new(0, 1024),
            BaselinePolicy::ResetOnLinkLoss,
            0,
        );
        bridge.feed(&group("PAPP", "00350"));
        bridge.feed(b"\nPAPP 00400 X\r");
        bridge.feed(&group("PAPP", "00350"));

        bridge.poll_once(0);
        bridge.poll_once(1);
        assert!(matches!(bridge.poll_once(2), Some(DispatchOutcome::Published(_))));
    }

    #[test]
    fn test_transport_failure_is_retried() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_publish().times(2).returning(move |_| {
            calls += 1;
            calls > 1
        });

        let mut bridge = Bridge::new(
            FrameDecoder::new(TicMode::Historic),
            Dispatcher::default(),
            Annunciator::new(AnnunciatorTiming::default()),
            transport,
            LogIndicator::new(),
            0,
        );
        bridge.feed(&group("IRMS3", "012"));
        bridge.feed(&group("IRMS3", "012"));

        assert!(matches!(bridge.poll_once(0), Some(DispatchOutcome::Failed(_))));
        assert!(matches!(bridge.poll_once(1), Some(DispatchOutcome::Published(_))));
    }

    #[test]
    fn test_indicator_follows_link_validity() {
        let mut bridge = gateway_bridge();

        // No data yet: red branch
        bridge.poll_once(0);
        bridge.poll_once(1);
        assert_eq!(bridge.indicator().levels(), (false, true));
        bridge.poll_once(101);
        assert_eq!(bridge.indicator().levels(), (false, false));

        // Link becomes valid mid-cycle; red cycle completes first
        bridge.feed(&group("PAPP", "00100"));
        bridge.poll_once(500);
        assert!(bridge.link_valid());
        assert_eq!(bridge.annunciator().phase(), Phase::RedHold2);

        bridge.poll_once(1001);
        assert_eq!(bridge.annunciator().phase(), Phase::Decide);
        bridge.poll_once(1002);
        bridge.poll_once(1003);
        assert_eq!(bridge.indicator().levels(), (true, false));
        bridge.poll_once(1103);
        assert_eq!(bridge.indicator().levels(), (false, false));
    }

    #[test]
    fn test_link_timeout_invalidates_link() {
        let mut bridge = bridge_with(GatewayTransport::new(0, 1024), BaselinePolicy::Keep, 5000);
        let clock = ManualClock::new(1000);
        bridge.feed(&group("PAPP", "00100"));

        bridge.poll_once(clock.now_ms());
        assert!(bridge.link_valid());

        clock.advance(4999);
        bridge.poll_once(clock.now_ms());
        assert!(bridge.link_valid());

        clock.advance(1);
        bridge.poll_once(clock.now_ms());
        assert!(!bridge.link_valid());
    }

    #[test]
    fn test_link_timeout_across_clock_wraparound() {
        let mut bridge = bridge_with(GatewayTransport::new(0, 1024), BaselinePolicy::Keep, 5000);
        let clock = ManualClock::new(u32::MAX - 1000);
        bridge.feed(&group("PAPP", "00100"));

        bridge.poll_once(clock.now_ms());
        clock.advance(4000);
        bridge.poll_once(clock.now_ms());
        assert!(bridge.link_valid());

        clock.advance(1000);
        bridge.poll_once(clock.now_ms());
        assert!(!bridge.link_valid());
    }

    #[test]
    fn test_link_timeout_disabled_by_default() {
        let mut bridge = gateway_bridge();
        bridge.feed(&group("PAPP", "00100"));

        bridge.poll_once(0);
        bridge.poll_once(u32::MAX);
        assert!(bridge.link_valid());
    }

    #[test]
    fn test_full_queue_keeps_field_eligible() {
        // Room for exactly one 15 byte line
        let mut bridge = bridge_with(GatewayTransport::new(0, 20), BaselinePolicy::Keep, 0);
        bridge.feed(&group("PAPP", "00350"));
        bridge.feed(&group("PAPP", "00360"));
        bridge.feed(&group("PAPP", "00360"));

        assert!(matches!(bridge.poll_once(0), Some(DispatchOutcome::Published(_))));
        assert!(matches!(bridge.poll_once(1), Some(DispatchOutcome::Failed(_))));

        bridge.transport_mut().take_pending();
        assert!(matches!(bridge.poll_once(2), Some(DispatchOutcome::Published(_))));
    }

    #[test]
    fn test_serial_number_survives_failed_gateway_write() {
        let mut bridge = gateway_bridge();
        let mut port = MockSerialPort::new();
        let clock = ManualClock::default();
        bridge.feed(&group("ADCO", "031428097115"));
        bridge.feed(&group("ADCO", "031428097115"));

        assert!(matches!(
            bridge.poll_once(clock.now_ms()),
            Some(DispatchOutcome::Published(_))
        ));

        port.set_write_error(io::ErrorKind::BrokenPipe);
        assert!(tokio_test::block_on(bridge.transport_mut().drain(&mut port)).is_err());

        // Sent once already, so the repeat is suppressed
        clock.advance(10);
        assert_eq!(
            bridge.poll_once(clock.now_ms()),
            Some(DispatchOutcome::Suppressed(Field::SerialNumber))
        );

        port.clear_errors();
        tokio_test::block_on(bridge.transport_mut().drain(&mut port)).unwrap();
        assert_eq!(port.delivered_lines(), vec!["0;0;1;0;47;031428097115"]);
    }

    #[test]
    fn test_clear_indicator() {
        let mut bridge = gateway_bridge();
        bridge.poll_once(0);
        bridge.poll_once(1);
        bridge.clear_indicator().unwrap();
        assert_eq!(bridge.indicator().levels(), (false, false));
    }

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let bridge = Bridge::from_config(&config, GatewayTransport::new(0, 1024), LogIndicator::new());
        assert_eq!(bridge.dispatcher().baseline_policy(), BaselinePolicy::Keep);
        assert_eq!(bridge.annunciator().timing(), AnnunciatorTiming::default());
    }
}
