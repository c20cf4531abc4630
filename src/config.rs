//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values fall back to
//! the `default_*` functions below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::dispatch::BaselinePolicy;
use crate::error::{BridgeError, Result};
use crate::status::AnnunciatorTiming;
use crate::tic::protocol::TicMode;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Meter teleinformation port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MeterConfig {
    /// Device path; empty = auto-detect
    #[serde(default = "default_meter_port")]
    pub port: String,

    #[serde(default = "default_meter_mode")]
    pub mode: TicMode,
}

/// MySensors gateway configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Device path; `-` writes protocol lines to stdout
    #[serde(default = "default_gateway_port")]
    pub port: String,

    #[serde(default = "default_gateway_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_node_id")]
    pub node_id: u8,

    #[serde(default = "default_max_pending_bytes")]
    pub max_pending_bytes: usize,

    #[serde(default = "default_sketch_name")]
    pub sketch_name: String,
}

/// Status indicator backend
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorBackend {
    /// Trace LED changes only
    Log,
    /// Linux LED class devices
    Sysfs,
}

/// Status indicator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorConfig {
    #[serde(default = "default_indicator_backend")]
    pub backend: IndicatorBackend,

    /// LED directory, e.g. `/sys/class/leds/green`
    #[serde(default)]
    pub green_led: String,

    #[serde(default)]
    pub red_led: String,

    #[serde(default = "default_flash_ms")]
    pub flash_ms: u32,

    #[serde(default = "default_valid_period_ms")]
    pub valid_period_ms: u32,

    #[serde(default = "default_invalid_period_ms")]
    pub invalid_period_ms: u32,
}

/// Polling loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Mark the link invalid after this long without a record; 0 disables
    #[serde(default)]
    pub link_timeout_ms: u32,

    #[serde(default)]
    pub baseline_policy: BaselinePolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; empty = stdout only
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_meter_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_meter_mode() -> TicMode { TicMode::Historic }

fn default_gateway_port() -> String { "-".to_string() }
fn default_gateway_baud_rate() -> u32 { 115200 }
fn default_node_id() -> u8 { 0 }
fn default_max_pending_bytes() -> usize { 1024 }
fn default_sketch_name() -> String { "TIC Bridge".to_string() }

fn default_indicator_backend() -> IndicatorBackend { IndicatorBackend::Log }
fn default_flash_ms() -> u32 { 100 }
fn default_valid_period_ms() -> u32 { 3000 }
fn default_invalid_period_ms() -> u32 { 1000 }

fn default_poll_interval_ms() -> u64 { 5 }

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            port: default_meter_port(),
            mode: default_meter_mode(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            baud_rate: default_gateway_baud_rate(),
            node_id: default_node_id(),
            max_pending_bytes: default_max_pending_bytes(),
            sketch_name: default_sketch_name(),
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            backend: default_indicator_backend(),
            green_led: String::new(),
            red_led: String::new(),
            flash_ms: default_flash_ms(),
            valid_period_ms: default_valid_period_ms(),
            invalid_period_ms: default_invalid_period_ms(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            link_timeout_ms: 0,
            baseline_policy: BaselinePolicy::default(),
        }
    }
}

impl IndicatorConfig {
    /// Annunciator timings described by this section
    pub fn timing(&self) -> AnnunciatorTiming {
        AnnunciatorTiming {
            flash_ms: self.flash_ms,
            valid_period_ms: self.valid_period_ms,
            invalid_period_ms: self.invalid_period_ms,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tic_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Gateway
        if self.gateway.port.is_empty() {
            return Err(invalid("gateway port cannot be empty (use \"-\" for stdout)"));
        }

        if ![9600, 38400, 57600, 115200].contains(&self.gateway.baud_rate) {
            return Err(invalid("gateway baud_rate must be one of: 9600, 38400, 57600, 115200"));
        }

        // 255 is reserved for broadcast
        if self.gateway.node_id == 255 {
            return Err(invalid("node_id must be between 0 and 254"));
        }

        if self.gateway.max_pending_bytes < 256 || self.gateway.max_pending_bytes > 65536 {
            return Err(invalid("max_pending_bytes must be between 256 and 65536"));
        }

        if self.gateway.sketch_name.is_empty() {
            return Err(invalid("sketch_name cannot be empty"));
        }

        // Indicator
        if self.indicator.backend == IndicatorBackend::Sysfs
            && (self.indicator.green_led.is_empty() || self.indicator.red_led.is_empty())
        {
            return Err(invalid("green_led and red_led are required for the sysfs backend"));
        }

        if self.indicator.flash_ms == 0 || self.indicator.flash_ms > 10000 {
            return Err(invalid("flash_ms must be between 1 and 10000"));
        }

        for (name, value) in [
            ("valid_period_ms", self.indicator.valid_period_ms),
            ("invalid_period_ms", self.indicator.invalid_period_ms),
        ] {
            if value <= self.indicator.flash_ms || value > 60000 {
                return Err(invalid(format!(
                    "{} must be greater than flash_ms and at most 60000",
                    name
                )));
            }
        }

        // Loop timing
        if self.bridge.poll_interval_ms == 0 || self.bridge.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        if self.bridge.link_timeout_ms > 600_000 {
            return Err(invalid("link_timeout_ms must be at most 600000 (0 disables)"));
        }

        Ok(())
    }
}
