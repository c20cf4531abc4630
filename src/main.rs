//! # TIC Bridge
//!
//! Forward electricity meter teleinformation (TIC) to a MySensors gateway.
//!
//! This application reads the meter's serial stream, publishes changed
//! values as MySensors messages and blinks a status LED pair.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tic_bridge::bridge::Bridge;
use tic_bridge::config::{Config, IndicatorBackend};
use tic_bridge::dispatch::DispatchOutcome;
use tic_bridge::serial::port_trait::{SerialPortIO, StdoutPort};
use tic_bridge::serial::{open_gateway_port, MeterSerial};
use tic_bridge::status::{Clock, Indicator, LogIndicator, MonotonicClock, SysfsLedIndicator};
use tic_bridge::transport::gateway::GatewayTransport;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Bytes read from the meter port per read call
const READ_BUFFER_SIZE: usize = 256;

/// Log file name prefix inside `logging.directory`
const LOG_FILE_PREFIX: &str = "tic-bridge.log";

/// Main entry point for TIC Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, else `config/default.toml`, else defaults)
///    - Set up logging with tracing subscriber
///    - Open the meter port and the gateway port, queue node presentation
///
/// 2. **Main Loop**
///    - Feed meter bytes to the decoder as they arrive
///    - Every `poll_interval_ms`: one bridge iteration, then drain the gateway queue
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Flush pending gateway lines
///    - Switch the status LEDs off
///
/// # Examples
///
/// ```bash
/// tic-bridge /etc/tic-bridge.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let (config, source) = load_config(config_path.as_deref())?;
    let _log_guard = init_logging(&config)?;

    info!("TIC Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);

    match config.indicator.backend {
        IndicatorBackend::Log => run(&config, LogIndicator::new()).await,
        IndicatorBackend::Sysfs => {
            let indicator = SysfsLedIndicator::new(&config.indicator.green_led, &config.indicator.red_led);
            run(&config, indicator).await
        }
    }
}

/// Resolve the configuration and describe where it came from
fn load_config(path: Option<&str>) -> Result<(Config, String)> {
    if let Some(path) = path {
        let config = Config::load(path).with_context(|| format!("Failed to load {}", path))?;
        return Ok((config, path.to_string()));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        let config = Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_PATH))?;
        return Ok((config, DEFAULT_CONFIG_PATH.to_string()));
    }

    Ok((Config::default(), "built-in defaults".to_string()))
}

/// Log to stderr (stdout may carry gateway lines), or to daily files
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if config.logging.directory.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.logging.directory)
        .with_context(|| format!("Failed to create log directory {}", config.logging.directory))?;
    let appender = tracing_appender::rolling::daily(&config.logging.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// Open both links and run the polling loop until Ctrl+C
async fn run<I: Indicator>(config: &Config, indicator: I) -> Result<()> {
    let mode = config.meter.mode;
    let mut meter = if config.meter.port.is_empty() {
        MeterSerial::open(mode)?
    } else {
        MeterSerial::open_with_paths(&[config.meter.port.as_str()], mode)?
    };
    info!("Meter port opened at: {}", meter.device_path());

    let mut gateway_port: Box<dyn SerialPortIO> = if config.gateway.port == "-" {
        info!("Writing gateway messages to stdout");
        Box::new(StdoutPort::new())
    } else {
        Box::new(open_gateway_port(&config.gateway.port, config.gateway.baud_rate)?)
    };

    let mut transport = GatewayTransport::new(config.gateway.node_id, config.gateway.max_pending_bytes);
    if !transport.present(&config.gateway.sketch_name, env!("CARGO_PKG_VERSION")) {
        warn!("Node presentation skipped");
    }

    let mut bridge = Bridge::from_config(config, transport, indicator);
    if let Err(e) = bridge.clear_indicator() {
        warn!("Failed to reset status LEDs: {}", e);
    }

    let clock = MonotonicClock::new();
    let mut ticker = interval(Duration::from_millis(config.bridge.poll_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut buf = [0u8; READ_BUFFER_SIZE];

    let mut published: u64 = 0;
    let mut failed: u64 = 0;

    info!(
        "Polling every {} ms ({:?} mode, node {})",
        config.bridge.poll_interval_ms, mode, config.gateway.node_id
    );
    info!("Press Ctrl+C to exit");

    let result = loop {
        tokio::select! {
            read = meter.read(&mut buf) => {
                match read {
                    Ok(0) => break Err(anyhow::anyhow!("Meter port closed")),
                    Ok(n) => bridge.feed(&buf[..n]),
                    Err(e) => break Err(e).context("Meter port failed"),
                }
            }

            _ = ticker.tick() => {
                match bridge.poll_once(clock.now_ms()) {
                    Some(DispatchOutcome::Published(_)) => published += 1,
                    Some(DispatchOutcome::Failed(_)) => failed += 1,
                    _ => {}
                }

                if let Err(e) = bridge.transport_mut().drain(gateway_port.as_mut()).await {
                    warn!("{}", e);
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break Ok(());
            }
        }
    };

    if let Err(e) = bridge.transport_mut().drain(gateway_port.as_mut()).await {
        warn!("Final gateway flush failed: {}", e);
    }
    if let Err(e) = bridge.clear_indicator() {
        warn!("Failed to switch status LEDs off: {}", e);
    }
    info!("Published {} values ({} rejected by transport)", published, failed);

    if let Err(ref e) = result {
        error!("{:#}", e);
    }
    result
}
