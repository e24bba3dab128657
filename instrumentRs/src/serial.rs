//! Blocking serial port sessions using the `serialport` crate.

use std::time::Duration;

use serialport::{SerialPort, SerialPortBuilder};
use tracing::info;

use crate::{Instrument, InstrumentError};

/// Constructors for [`Instrument`] sessions that talk through a serial port.
#[derive(Debug)]
pub struct SerialInterface {}

impl SerialInterface {
    /// Open a serial port with a given baud rate and otherwise default settings.
    ///
    /// The timeout is set to three seconds. Use [`SerialInterface::full`] if your instrument
    /// needs a different parity, number of data bits, etc.
    ///
    /// # Arguments
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    /// * `baud` - The baud rate.
    pub fn simple(port: &str, baud: u32) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let spb = serialport::new(port, baud).timeout(Duration::from_secs(3));
        Self::full(spb)
    }

    /// Open a serial port from a fully configured [`SerialPortBuilder`].
    ///
    /// The timeout of the returned session is the timeout set on the builder.
    ///
    /// # Arguments
    /// * `spb` - A `SerialPortBuilder` to configure the serial port. See
    ///   [`serialport::SerialPortBuilder`] and the [`serialport::new`] function for more details.
    pub fn full(spb: SerialPortBuilder) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let port = spb.open()?;
        let timeout = port.timeout();
        info!(port = ?port.name(), baud = ?port.baud_rate().ok(), "serial port opened");
        Ok(Instrument::new(port, timeout))
    }
}
