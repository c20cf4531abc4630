//! # Status Annunciator
//!
//! Non-blocking two-phase blink state machine.
//!
//! ## Cycle
//!
//! Link validity is sampled once per cycle, in [`Phase::Decide`]:
//!
//! ```text
//! valid:   Decide -> GreenOn -> GreenHold1 --100ms--> GreenHold2 --3000ms--> Decide
//!                    (green on)  (green off)
//! invalid: Decide -> RedOn   -> RedHold1   --100ms--> RedHold2   --1000ms--> Decide
//!                    (red on)    (red off)
//! ```
//!
//! Hold durations are measured from the On phase's entry time, using wrapping
//! subtraction so the cycle survives clock overflow.
//!
//! ## Usage
//!
//! ```
//! use tic_bridge::status::{Annunciator, AnnunciatorTiming, Phase};
//!
//! let idle = Annunciator::new(AnnunciatorTiming::default());
//! let (decided, _) = idle.step(0, true);
//! assert_eq!(decided.phase(), Phase::GreenOn);
//!
//! let (lit, command) = decided.step(0, true);
//! assert_eq!(lit.phase(), Phase::GreenHold1);
//! assert_eq!(command.green, Some(true));
//! ```

/// Default length of a flash
pub const DEFAULT_FLASH_MS: u32 = 100;

/// Default cycle length while the link is valid
pub const DEFAULT_VALID_PERIOD_MS: u32 = 3000;

/// Default cycle length while the link is invalid
pub const DEFAULT_INVALID_PERIOD_MS: u32 = 1000;

/// Annunciator phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sample link validity and pick a branch
    Decide,
    /// Red off, green on, record entry time
    GreenOn,
    /// Waiting for the end of the green flash
    GreenHold1,
    /// Waiting for the end of the valid cycle
    GreenHold2,
    /// Green off, red on, record entry time
    RedOn,
    /// Waiting for the end of the red flash
    RedHold1,
    /// Waiting for the end of the invalid cycle
    RedHold2,
}

/// Output changes requested by one step; `None` leaves an output as is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedCommand {
    pub green: Option<bool>,
    pub red: Option<bool>,
}

impl LedCommand {
    /// Whether the step touched no output
    pub fn is_empty(&self) -> bool {
        self.green.is_none() && self.red.is_none()
    }
}

/// Flash and cycle durations in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnunciatorTiming {
    pub flash_ms: u32,
    pub valid_period_ms: u32,
    pub invalid_period_ms: u32,
}

impl Default for AnnunciatorTiming {
    fn default() -> Self {
        Self {
            flash_ms: DEFAULT_FLASH_MS,
            valid_period_ms: DEFAULT_VALID_PERIOD_MS,
            invalid_period_ms: DEFAULT_INVALID_PERIOD_MS,
        }
    }
}

/// Blink state machine: current phase plus the entry time of the last On phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annunciator {
    phase: Phase,
    entered_at: u32,
    timing: AnnunciatorTiming,
}

impl Annunciator {
    /// Start in [`Phase::Decide`]
    pub fn new(timing: AnnunciatorTiming) -> Self {
        Self {
            phase: Phase::Decide,
            entered_at: 0,
            timing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timing(&self) -> AnnunciatorTiming {
        self.timing
    }

    /// Compute the next state and the output changes for time `now`
    ///
    /// Pure: `self` is left untouched. Exactly one transition is evaluated
    /// per call.
    #[must_use]
    pub fn step(&self, now: u32, link_valid: bool) -> (Annunciator, LedCommand) {
        let elapsed = now.wrapping_sub(self.entered_at);
        let mut next = *self;
        let mut command = LedCommand::default();

        match self.phase {
            Phase::Decide => {
                next.phase = if link_valid { Phase::GreenOn } else { Phase::RedOn };
            }
            Phase::GreenOn => {
                command.red = Some(false);
                command.green = Some(true);
                next.entered_at = now;
                next.phase = Phase::GreenHold1;
            }
            Phase::GreenHold1 => {
                if elapsed >= self.timing.flash_ms {
                    command.green = Some(false);
                    next.phase = Phase::GreenHold2;
                }
            }
            Phase::GreenHold2 => {
                if elapsed >= self.timing.valid_period_ms {
                    next.phase = Phase::Decide;
                }
            }
            Phase::RedOn => {
                command.green = Some(false);
                command.red = Some(true);
                next.entered_at = now;
                next.phase = Phase::RedHold1;
            }
            Phase::RedHold1 => {
                if elapsed >= self.timing.flash_ms {
                    command.red = Some(false);
                    next.phase = Phase::RedHold2;
                }
            }
            Phase::RedHold2 => {
                if elapsed >= self.timing.invalid_period_ms {
                    next.phase = Phase::Decide;
                }
            }
        }

        (next, command)
    }

    /// In-place variant of [`step`](Self::step)
    pub fn advance(&mut self, now: u32, link_valid: bool) -> LedCommand {
        let (next, command) = self.step(now, link_valid);
        *self = next;
        command
    }
}
