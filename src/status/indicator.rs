//! # Indicator Outputs
//!
//! Two independent binary outputs driven only by the annunciator.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::annunciator::LedCommand;
use crate::error::Result;

/// Green/red output pair
pub trait Indicator {
    fn set_green(&mut self, on: bool) -> Result<()>;
    fn set_red(&mut self, on: bool) -> Result<()>;

    /// Apply one annunciator command, switching outputs off before on
    fn apply(&mut self, command: LedCommand) -> Result<()> {
        if command.green == Some(false) {
            self.set_green(false)?;
        }
        if command.red == Some(false) {
            self.set_red(false)?;
        }
        if command.green == Some(true) {
            self.set_green(true)?;
        }
        if command.red == Some(true) {
            self.set_red(true)?;
        }
        Ok(())
    }
}

/// Indicator that only traces output changes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogIndicator {
    green: bool,
    red: bool,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (green, red) output levels
    pub fn levels(&self) -> (bool, bool) {
        (self.green, self.red)
    }
}

impl Indicator for LogIndicator {
    fn set_green(&mut self, on: bool) -> Result<()> {
        if self.green != on {
            debug!("Status LED green {}", if on { "on" } else { "off" });
        }
        self.green = on;
        Ok(())
    }

    fn set_red(&mut self, on: bool) -> Result<()> {
        if self.red != on {
            debug!("Status LED red {}", if on { "on" } else { "off" });
        }
        self.red = on;
        Ok(())
    }
}

/// Indicator backed by Linux LED class devices (`/sys/class/leds/<name>`)
#[derive(Debug, Clone)]
pub struct SysfsLedIndicator {
    green: PathBuf,
    red: PathBuf,
}

impl SysfsLedIndicator {
    /// # Arguments
    ///
    /// * `green` - LED directory of the green output (containing `brightness`)
    /// * `red` - LED directory of the red output
    pub fn new<P: AsRef<Path>>(green: P, red: P) -> Self {
        Self {
            green: green.as_ref().to_path_buf(),
            red: red.as_ref().to_path_buf(),
        }
    }

    fn write(led: &Path, on: bool) -> Result<()> {
        fs::write(led.join("brightness"), if on { "1" } else { "0" })?;
        Ok(())
    }
}

impl Indicator for SysfsLedIndicator {
    fn set_green(&mut self, on: bool) -> Result<()> {
        Self::write(&self.green, on)
    }

    fn set_red(&mut self, on: bool) -> Result<()> {
        Self::write(&self.red, on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    /// Records the order outputs are switched in
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(&'static str, bool)>,
    }

    impl Indicator for Recorder {
        fn set_green(&mut self, on: bool) -> Result<()> {
            self.calls.push(("green", on));
            Ok(())
        }

        fn set_red(&mut self, on: bool) -> Result<()> {
            self.calls.push(("red", on));
            Ok(())
        }
    }

    #[test]
    fn test_apply_switches_off_before_on() {
        let mut recorder = Recorder::default();
        recorder
            .apply(LedCommand { green: Some(true), red: Some(false) })
            .unwrap();
        assert_eq!(recorder.calls, vec![("red", false), ("green", true)]);

        let mut recorder = Recorder::default();
        recorder
            .apply(LedCommand { green: Some(false), red: Some(true) })
            .unwrap();
        assert_eq!(recorder.calls, vec![("green", false), ("red", true)]);
    }

    #[test]
    fn test_apply_empty_command_touches_nothing() {
        let mut recorder = Recorder::default();
        recorder.apply(LedCommand::default()).unwrap();
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_log_indicator_tracks_levels() {
        let mut indicator = LogIndicator::new();
        assert_eq!(indicator.levels(), (false, false));

        indicator.apply(LedCommand { green: Some(true), red: Some(false) }).unwrap();
        assert_eq!(indicator.levels(), (true, false));

        indicator.apply(LedCommand { green: Some(false), red: None }).unwrap();
        assert_eq!(indicator.levels(), (false, false));
    }

    #[test]
    fn test_sysfs_indicator_writes_brightness() {
        let dir = tempfile::tempdir().unwrap();
        let green = dir.path().join("green");
        let red = dir.path().join("red");
        fs::create_dir(&green).unwrap();
        fs::create_dir(&red).unwrap();

        let mut indicator = SysfsLedIndicator::new(&green, &red);
        indicator.set_green(true).unwrap();
        indicator.set_red(false).unwrap();

        assert_eq!(fs::read_to_string(green.join("brightness")).unwrap(), "1");
        assert_eq!(fs::read_to_string(red.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn test_sysfs_indicator_missing_led_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let mut indicator = SysfsLedIndicator::new(&missing, &missing);
        match indicator.set_green(true) {
            Err(BridgeError::Io(_)) => {}
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }
}
