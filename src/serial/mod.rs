//! # Serial Communication Module
//!
//! Handles the two serial links of the bridge.
//!
//! This module handles:
//! - Opening the meter teleinformation port (7 data bits, even parity, 1 stop bit)
//! - Auto-detecting the meter adapter among common device paths
//! - Async reads of raw teleinformation bytes
//! - Opening the MySensors gateway port (8N1)

pub mod port_trait;

use crate::error::{BridgeError, Result};
use crate::tic::protocol::TicMode;
use port_trait::TokioSerialPort;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default meter device paths to try (in order of preference)
pub const DEFAULT_METER_PATHS: &[&str] = &[
    "/dev/ttyAMA0", // Raspberry Pi UART wired to an optocoupler
    "/dev/ttyUSB0", // USB teleinformation dongles
];

/// Meter teleinformation port handler
pub struct MeterSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
}

impl std::fmt::Debug for MeterSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl MeterSerial {
    /// Open the meter port, auto-detecting among [`DEFAULT_METER_PATHS`]
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tic_bridge::serial::MeterSerial;
    /// use tic_bridge::tic::protocol::TicMode;
    ///
    /// let serial = MeterSerial::open(TicMode::Historic)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(mode: TicMode) -> Result<Self> {
        Self::open_with_paths(DEFAULT_METER_PATHS, mode)
    }

    /// Open the meter port with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try, first success wins
    /// * `mode` - Teleinformation mode, selects the baud rate
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried
    pub fn open_with_paths(paths: &[&str], mode: TicMode) -> Result<Self> {
        for path in paths {
            debug!("Trying to open meter port: {}", path);

            match Self::open_port(path, mode) {
                Ok(port) => {
                    info!("Opened meter port at {} ({:?} mode)", path, mode);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(BridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific port with teleinformation line settings (7E1)
    fn open_port(path: &str, mode: TicMode) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, mode.baud_rate())
            .data_bits(tokio_serial::DataBits::Seven)
            .parity(tokio_serial::Parity::Even)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Read whatever bytes are available
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of bytes placed in `buf`; `0` means the port closed
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        use tokio::io::AsyncReadExt;

        self.port
            .read(buf)
            .await
            .map_err(|e| BridgeError::Serial(format!("Failed to read meter port: {}", e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Open the MySensors gateway port (8N1)
///
/// # Errors
///
/// Returns `Serial` error if the port cannot be opened
pub fn open_gateway_port(path: &str, baud_rate: u32) -> Result<TokioSerialPort> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

    info!("Opened gateway port at {} ({} baud)", path, baud_rate);
    Ok(TokioSerialPort::new(port))
}
