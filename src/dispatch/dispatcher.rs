//! # Dataset Dispatcher
//!
//! Consumes one decoded group at a time, routes it to its [`Field`], applies
//! the field's [`PublishPolicy`] against the remembered [`FieldState`] and
//! forwards eligible values to a [`Transport`].
//!
//! State only advances when the transport accepts the event, so a failed
//! transmission is retried on the next eligible decode of that field.
//!
//! ## Usage
//!
//! ```
//! use tic_bridge::dispatch::{BaselinePolicy, DispatchOutcome, Dispatcher};
//! use tic_bridge::tic::protocol::TelemetryRecord;
//! use tic_bridge::transport::{PublishEvent, Transport};
//!
//! struct Accept;
//! impl Transport for Accept {
//!     fn publish(&mut self, _event: &PublishEvent) -> bool { true }
//! }
//!
//! let mut dispatcher = Dispatcher::new(BaselinePolicy::Keep);
//! let record = TelemetryRecord::new("PAPP", "00350");
//!
//! assert!(matches!(dispatcher.handle(&record, &mut Accept), DispatchOutcome::Published(_)));
//! assert!(matches!(dispatcher.handle(&record, &mut Accept), DispatchOutcome::Suppressed(_)));
//! ```

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::field::{Field, FieldState, PublishPolicy};
use crate::tic::protocol::TelemetryRecord;
use crate::transport::{PublishEvent, Transport};

/// What happens to numeric baselines when the meter link is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Keep comparing against values sent before the outage
    #[default]
    Keep,
    /// Forget numeric baselines so every field republishes after recovery
    ResetOnLinkLoss,
}

/// Result of handing one record to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Label not tracked, or record carried no value
    Ignored,
    /// Value decoded but gated by the field's policy
    Suppressed(Field),
    /// Transport accepted the event; field state advanced
    Published(PublishEvent),
    /// Transport rejected the event; field state unchanged
    Failed(PublishEvent),
}

/// Routes decoded records to the transport according to per-field policy
#[derive(Debug, Clone)]
pub struct Dispatcher {
    states: [FieldState; Field::COUNT],
    baseline_policy: BaselinePolicy,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(BaselinePolicy::default())
    }
}

impl Dispatcher {
    pub fn new(baseline_policy: BaselinePolicy) -> Self {
        Self {
            states: Default::default(),
            baseline_policy,
        }
    }

    /// Remembered state of one field
    pub fn state(&self, field: Field) -> &FieldState {
        &self.states[field.index()]
    }

    pub fn baseline_policy(&self) -> BaselinePolicy {
        self.baseline_policy
    }

    /// Decide whether `record` is worth sending and, if so, publish it
    ///
    /// # Arguments
    ///
    /// * `record` - One decoded group from the frame decoder
    /// * `transport` - Destination whose acknowledgement gates state updates
    ///
    /// # Returns
    ///
    /// * `DispatchOutcome` - At most one publish attempt is made per call
    pub fn handle<T: Transport + ?Sized>(
        &mut self,
        record: &TelemetryRecord,
        transport: &mut T,
    ) -> DispatchOutcome {
        if !record.present {
            return DispatchOutcome::Ignored;
        }

        let field = match Field::from_label(&record.name) {
            Some(field) => field,
            None => return DispatchOutcome::Ignored,
        };

        let value = field.decode(&record.data);
        let state = &mut self.states[field.index()];

        if !field.policy().should_publish(state, &value) {
            return DispatchOutcome::Suppressed(field);
        }

        let event = PublishEvent {
            channel: field.channel(),
            kind: field.kind(),
            value,
        };

        if transport.publish(&event) {
            info!("Published {:?} = {} on channel {}", field, event.value, event.channel);
            state.record(event.value.clone());
            DispatchOutcome::Published(event)
        } else {
            warn!("Transport rejected {:?} = {}, will retry", field, event.value);
            DispatchOutcome::Failed(event)
        }
    }

    /// Notify the dispatcher that the meter link went from valid to invalid
    ///
    /// Under [`BaselinePolicy::ResetOnLinkLoss`] numeric baselines are cleared.
    /// The serial number keeps its once-only state either way.
    pub fn link_lost(&mut self) {
        if self.baseline_policy != BaselinePolicy::ResetOnLinkLoss {
            return;
        }

        for field in Field::ALL {
            if field.policy() != PublishPolicy::Once {
                self.states[field.index()].clear();
            }
        }
        debug!("Cleared numeric baselines after link loss");
    }
}
