//! A rust driver for the Lakeshore 224 temperature monitor.
//!
//! This driver reads the Kelvin temperatures of the Lakeshore 224 inputs via the serial port. The
//! readings are returned as they are reported by the instrument, in the order they are received.
//!
//! # Example
//!
//! This example shows the usage via the serial interface.
//! ```no_run
//! use lakeshore_224::{Lakeshore224, SerialInterfaceLakeshore224};
//!
//! // Get the serial interface for the Lakeshore224 and open it. This interface already sets the
//! // correct baud rate, parity, and data bits for communication with the Lakeshore224.
//! let serial_inst = SerialInterfaceLakeshore224::simple("/dev/ttyUSB0").unwrap();
//! let mut inst = Lakeshore224::try_new(serial_inst).unwrap();
//!
//! // Read input A, then all inputs at once.
//! println!("Input A: {:?}", inst.read_channels("a").unwrap());
//! println!("All inputs: {:?}", inst.read_all().unwrap());
//!
//! inst.close().unwrap();
//! ```

#![deny(warnings, missing_docs)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use instrumentrs::{Instrument, InstrumentError, InstrumentInterface, SerialInterface};
use measurements::Temperature;
use serialport::SerialPort;
use tracing::info;

/// The channel token that is read if no other one is requested: input A.
pub const DEFAULT_CHANNEL: &str = "a";

/// The channel token that reads all inputs at once.
pub const ALL_CHANNELS: &str = "0";

/// A SerialInterface for the Lakeshore224.
///
/// Builds an InstrumentRs serial interface with the framing the Lakeshore224 requires: 57600 baud,
/// seven data bits, odd parity, and one stop bit.
#[derive(Debug)]
pub struct SerialInterfaceLakeshore224 {}

impl SerialInterfaceLakeshore224 {
    /// Try to open the serial port of a Lakeshore224.
    ///
    /// The framing is fixed by the instrument and cannot be changed. The timeout is set to three
    /// seconds.
    ///
    /// Arguments:
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    pub fn simple(port: &str) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let port = serialport::new(port, 57600)
            .timeout(Duration::from_secs(3))
            .parity(serialport::Parity::Odd)
            .data_bits(serialport::DataBits::Seven)
            .stop_bits(serialport::StopBits::One);
        SerialInterface::full(port)
    }
}

/// A rust driver for the Lakeshore224.
///
/// The driver owns the session to the instrument. Clones share that session; every read holds
/// the session for the full command and response exchange. After [`Lakeshore224::close`], all
/// clones return [`InstrumentError::SessionClosed`].
pub struct Lakeshore224<T: InstrumentInterface> {
    interface: Arc<Mutex<Option<T>>>,
}

impl<T: InstrumentInterface> Lakeshore224<T> {
    /// Create a new Lakeshore224 instance with the given instrument interface.
    ///
    /// Sets the `"\r\n"` terminator that the Lakeshore224 uses. Nothing is sent to the instrument.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        let mut intf = interface;
        intf.set_terminator("\r\n");
        Ok(Lakeshore224 {
            interface: Arc::new(Mutex::new(Some(intf))),
        })
    }

    /// Read the Kelvin temperatures for a given channel token.
    ///
    /// The token is passed to the instrument as is: a letter selects a single input, `"0"`
    /// ([`ALL_CHANNELS`]) selects all inputs. The response is split at commas and every field is
    /// parsed, so reading all inputs returns one value per input.
    ///
    /// Unknown tokens are not checked here. What happens then is up to the instrument, usually the
    /// response cannot be parsed and a [`InstrumentError::ResponseParseError`] is returned.
    ///
    /// # Arguments
    /// * `channel` - The channel token, e.g., [`DEFAULT_CHANNEL`].
    pub fn read_channels(&mut self, channel: &str) -> Result<Vec<Temperature>, InstrumentError> {
        let resp = self.query(&format!("krdg? {channel}"))?;
        parse_kelvin_list(&resp)
    }

    /// Read the Kelvin temperatures of all inputs.
    pub fn read_all(&mut self) -> Result<Vec<Temperature>, InstrumentError> {
        self.read_channels(ALL_CHANNELS)
    }

    /// Query the name of the instrument
    ///
    /// Returns a comma-separated string of manufacturer, model number, serial number, and firmware
    /// version.
    pub fn get_name(&mut self) -> Result<String, InstrumentError> {
        self.query("*IDN?")
    }

    /// Close the session to the instrument.
    ///
    /// Calling this a second time returns [`InstrumentError::SessionClosed`].
    pub fn close(&mut self) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        match intf.take() {
            Some(session) => {
                drop(session);
                info!("Lakeshore224 session closed");
                Ok(())
            }
            None => Err(InstrumentError::SessionClosed),
        }
    }

    /// Query the instrument with a command and return the response as a String.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.as_mut().ok_or(InstrumentError::SessionClosed)?.query(cmd)
    }
}

impl<T: InstrumentInterface> Clone for Lakeshore224<T> {
    fn clone(&self) -> Self {
        Self {
            interface: self.interface.clone(),
        }
    }
}

/// Parse a comma separated list of Kelvin readings, e.g., `"+077.350,+077.360"`.
fn parse_kelvin_list(resp: &str) -> Result<Vec<Temperature>, InstrumentError> {
    resp.split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map(Temperature::from_kelvin)
                .map_err(|_| InstrumentError::ResponseParseError(resp.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kelvin_list() {
        let temps = parse_kelvin_list("+077.350,+077.360, +000.000").unwrap();
        let kelvin: Vec<f64> = temps.iter().map(|t| t.as_kelvin()).collect();
        assert_eq!(kelvin, vec![77.35, 77.36, 0.0]);
    }

    #[test]
    fn test_parse_kelvin_list_error_keeps_response() {
        match parse_kelvin_list("77.350,ERR") {
            Err(InstrumentError::ResponseParseError(resp)) => assert_eq!(resp, "77.350,ERR"),
            _ => panic!("Expected a ResponseParseError"),
        }
    }

    #[test]
    fn test_parse_kelvin_list_empty_response() {
        assert!(parse_kelvin_list("").is_err());
    }
}
