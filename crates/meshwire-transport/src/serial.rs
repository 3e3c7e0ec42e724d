use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default device node for USB-attached radios on Linux.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Line speed the radio firmware expects.
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Read timeout used so the reader can notice shutdown between reads.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial line configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    /// Baud rate. Default: 921600.
    pub baud_rate: u32,
    /// Per-read timeout. Default: 100 ms.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Default configuration for the given device path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Serial port transport (8N1, no flow control).
///
/// The port handle is cloned on open so the reader thread and writers use
/// separate handles and never contend for the same lock.
pub struct SerialTransport {
    config: SerialConfig,
    reader: Mutex<Option<Box<dyn SerialPort>>>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
}

impl SerialTransport {
    /// Create a closed transport for `config`.
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    /// Create a closed transport for `path` with default line settings.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(path))
    }

    /// The line configuration.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn open_error(&self, source: impl Into<std::io::Error>) -> TransportError {
        TransportError::Open {
            path: self.config.path.clone(),
            source: source.into(),
        }
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn open(&self) -> Result<()> {
        let mut writer = lock(&self.writer);
        if writer.is_some() {
            debug!(path = %self.config.path, "serial port already open");
            return Ok(());
        }

        let port = serialport::new(&self.config.path, self.config.baud_rate)
            .timeout(self.config.read_timeout)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| self.open_error(e))?;
        let reader_port = port.try_clone().map_err(|e| self.open_error(e))?;

        *lock(&self.reader) = Some(reader_port);
        *writer = Some(port);

        info!(
            path = %self.config.path,
            baud_rate = self.config.baud_rate,
            "opened serial port"
        );
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = lock(&self.reader);
        let port = guard.as_mut().ok_or(TransportError::NotOpen)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write_all(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotOpen)?;
        port.write_all(bytes)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotOpen)?;
        port.flush()?;
        Ok(())
    }

    fn close(&self) {
        let writer = lock(&self.writer).take();
        if let Some(mut port) = writer {
            let _ = port.flush();
            debug!(path = %self.config.path, "closing serial port");
        }
        lock(&self.reader).take();
    }

    fn is_open(&self) -> bool {
        lock(&self.writer).is_some()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A serial port visible to the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Device path.
    pub name: String,
    /// Port kind: `usb`, `pci`, `bluetooth`, or `unknown`.
    pub kind: &'static str,
    /// USB product string, when reported.
    pub product: Option<String>,
    /// USB vendor/product id as `vvvv:pppp`, when reported.
    pub usb_id: Option<String>,
}

/// List serial ports that could host a radio.
pub fn available_ports() -> Result<Vec<PortEntry>> {
    let ports =
        serialport::available_ports().map_err(|e| TransportError::Enumerate(e.to_string()))?;

    Ok(ports
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => PortEntry {
                name: port.port_name,
                kind: "usb",
                product: usb.product,
                usb_id: Some(format!("{:04x}:{:04x}", usb.vid, usb.pid)),
            },
            SerialPortType::PciPort => PortEntry {
                name: port.port_name,
                kind: "pci",
                product: None,
                usb_id: None,
            },
            SerialPortType::BluetoothPort => PortEntry {
                name: port.port_name,
                kind: "bluetooth",
                product: None,
                usb_id: None,
            },
            SerialPortType::Unknown => PortEntry {
                name: port.port_name,
                kind: "unknown",
                product: None,
                usb_id: None,
            },
        })
        .collect())
}
