use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use meshwire_session::{Session, SessionConfig};
use meshwire_transport::{SerialConfig, DEFAULT_BAUD_RATE};
use tracing::info;

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod listen;
pub mod ports;
pub mod set_config;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a radio and print its identity and configuration.
    Info(InfoArgs),
    /// Print node events (and optionally packets) as they arrive.
    Listen(ListenArgs),
    /// Change radio settings and write them back.
    SetConfig(SetConfigArgs),
    /// List serial ports that may have a radio attached.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::SetConfig(args) => set_config::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the radio. Shared by every command that opens a session.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Serial port the radio is attached to (e.g. /dev/ttyUSB0, COM3).
    #[arg(env = "MESHWIRE_PORT")]
    pub port: String,
    /// Line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// How long to wait for the radio's config handshake (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Session settings as JSON (queue_capacity, mtu, wake_delay_ms, poll_interval_ms).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl DeviceArgs {
    pub fn handshake_timeout(&self) -> CliResult<Duration> {
        parse_timeout(&self.timeout)
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        match &self.config {
            Some(path) => SessionConfig::from_file(path)
                .map_err(|err| session_error("invalid --config", err)),
            None => Ok(SessionConfig::default()),
        }
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: self.baud,
            ..SerialConfig::new(self.port.as_str())
        }
    }

    /// Open a session, send the config request and wait for the handshake.
    ///
    /// Returns the session and the echoed config id.
    pub fn connect(&self) -> CliResult<(Session, u32)> {
        let timeout = self.handshake_timeout()?;
        let session = Session::serial(self.serial_config(), self.session_config()?)
            .map_err(|err| session_error("invalid --config", err))?;
        session
            .connect()
            .map_err(|err| session_error("connect failed", err))?;
        let config_id = session
            .wait_for_handshake(timeout)
            .map_err(|err| session_error("config handshake failed", err))?;
        info!(port = %self.port, config_id, "radio ready");
        Ok((session, config_id))
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Also print packets heard on the mesh.
    #[arg(long)]
    pub packets: bool,
}

#[derive(Args, Debug)]
pub struct SetConfigArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Channel name.
    #[arg(long)]
    pub channel_name: Option<String>,
    /// Seconds between position broadcasts.
    #[arg(long)]
    pub position_broadcast_secs: Option<u32>,
    /// Seconds the screen stays on after activity.
    #[arg(long)]
    pub screen_on_secs: Option<u32>,
    /// WiFi network name.
    #[arg(long)]
    pub wifi_ssid: Option<String>,
    /// WiFi password.
    #[arg(long, env = "MESHWIRE_WIFI_PASSWORD", hide_env_values = true)]
    pub wifi_password: Option<String>,
    /// Run WiFi as an access point instead of joining a network.
    #[arg(long)]
    pub wifi_ap_mode: Option<bool>,
    /// Channel pre-shared key as hex (16 or 32 bytes).
    #[arg(
        long,
        env = "MESHWIRE_PSK",
        hide_env_values = true,
        value_name = "HEX",
        value_parser = parse_psk
    )]
    pub psk: Option<Psk>,
}

/// Channel key bytes. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Psk(pub Vec<u8>);

impl std::fmt::Debug for Psk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Psk(<{} bytes>)", self.0.len())
    }
}

pub fn parse_psk(input: &str) -> Result<Psk, String> {
    let bytes = hex::decode(input.trim()).map_err(|e| format!("invalid hex key: {e}"))?;
    match bytes.len() {
        16 | 32 => Ok(Psk(bytes)),
        n => Err(format!("key must be 16 or 32 bytes, got {n}")),
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
