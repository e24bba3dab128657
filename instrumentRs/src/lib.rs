//! InstrumentRs: Talk to your (scientific) equipment from Rust
//!
//! The InstrumentRs library provides the plumbing that the instrument drivers in this workspace
//! share: the [`InstrumentInterface`] trait that every transport implements, the generic
//! [`Instrument`] session over any byte stream, and the [`InstrumentError`] type that all drivers
//! return.
//!
//! # Interfaces
//! - Serial (blocking) using the [`serialport`] crate, enabled with the `serial` feature.
//! - VISA sessions (GPIB, USB-TMC, ...) using the `visa-rs` crate, enabled with the `visa`
//!   feature. This requires a VISA library to be installed on the host.
//! - [`LoopbackInterfaceString`], a scripted interface to test drivers without hardware.
//!
//! # Writing a driver
//!
//! A driver takes any `T: InstrumentInterface`, sets the terminator its instrument expects, and
//! formats commands with [`InstrumentInterface::sendcmd`] and [`InstrumentInterface::query`].
//! Because the driver is generic, its tests can run the exact same code against a
//! [`LoopbackInterfaceString`] that checks every command sent.
//!
//! # Logging
//!
//! All traffic is reported through [`tracing`] at `debug` level. No subscriber is installed by
//! this library; install one in your application if you want to see the output.
//!
//! # License
//!
//! Licensed under either of
//!
//! - Apache License, Version 2.0 ([LICENSE-APACHE](http://www.apache.org/licenses/LICENSE-2.0))
//! - MIT license ([LICENSE-MIT](http://opensource.org/licenses/MIT))
//!
//! at your option.

#![warn(missing_docs)]

mod instrument;
mod loopback;
#[cfg(feature = "serial")]
mod serial;
#[cfg(feature = "visa")]
mod visa;

pub use instrument::Instrument;
pub use loopback::LoopbackInterfaceString;
#[cfg(feature = "serial")]
pub use serial::SerialInterface;
#[cfg(feature = "visa")]
pub use visa::{VisaInterface, VisaSession};

use std::{
    borrow::Cow,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, warn};

/// The error enum for all instruments.
///
/// For any command sending or querying, your instrument should return either an empty result or a
/// result with the query where this Error is the alternative. [`InstrumentError`] makes it easy to
/// propagate all the sending commands, querying errors forward with the `?` operator.
///
/// The variants fall into three groups: connection errors ([`InstrumentError::Serialport`],
/// [`InstrumentError::ConnectionError`], [`InstrumentError::SessionClosed`]), parse errors
/// ([`InstrumentError::ResponseParseError`]), and I/O errors of the underlying transport that are
/// passed on unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstrumentError {
    /// The session to the instrument could not be opened or was lost. The string describes the
    /// resource and the reason.
    #[error("Connection error: {0}")]
    ConnectionError(String),
    /// Error when an invalid argument is passed to a function. This error contains only an error
    /// message that is intended for the user.
    #[error("{0}")]
    InvalidArgument(String),
    /// Error when reading from/writing to an interface. See [`std::io::Error`] for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Instrument response could not be parsed because it was unexpected by the driver. This error
    /// contains the response that was received from the instrument.
    #[error("Response from instrument could not be parsed. Response was: {0}")]
    ResponseParseError(String),
    #[cfg(feature = "serial")]
    /// Serial port errors can occur when opening a serial interface. See the [`serialport::Error`]
    /// documentation for more information.
    #[error(transparent)]
    Serialport(#[from] serialport::Error),
    /// The driver's session was already closed and cannot be used anymore.
    #[error("The instrument session is closed.")]
    SessionClosed,
    /// Timeout occurred while waiting for a response from the instrument. The error contains the
    /// timeout that was exceeded.
    #[error(
        "Timeout occured while waiting for a response from the instrument. Timeout was set to {0:?}."
    )]
    Timeout(Duration),
    /// Timeout occurred while waiting for a response to a query. The error contains the query
    /// that was sent and the timeout that was exceeded.
    #[error(
        "Timeout occured while waiting for a response to query: {query}. Timeout was set to {timeout:?}."
    )]
    TimeoutQuery {
        /// The query that timed out.
        query: String,
        /// The timeout that was set.
        timeout: Duration,
    },
}

/// Resource string of the instrument with the given primary address on the first GPIB board.
///
/// ```
/// assert_eq!(instrumentrs::gpib_resource(5), "GPIB0::5::INSTR");
/// ```
pub fn gpib_resource(address: u8) -> String {
    format!("GPIB0::{address}::INSTR")
}

/// The `InstrumentInterface` trait defines the interface for talking to instruments.
///
/// Implementors only need to provide [`InstrumentInterface::read_exact`] and
/// [`InstrumentInterface::write_raw`]. Everything else, i.e., appending terminators, reading
/// lines, and querying, is built on top of these two methods.
pub trait InstrumentInterface {
    /// Get the terminator that is appended to commands and that ends a response.
    ///
    /// Defaults to `"\n"` for interfaces that do not store their own terminator.
    fn get_terminator(&self) -> &str {
        "\n"
    }

    /// Get the timeout after which a read of a response is given up.
    ///
    /// Defaults to three seconds.
    fn get_timeout(&self) -> Duration {
        Duration::from_secs(3)
    }

    /// Query the instrument with a command and return the response as a String.
    ///
    /// The command is sent with [`InstrumentInterface::sendcmd`], then a response is read with
    /// [`InstrumentInterface::read_until_terminator`]. A timeout is reported together with the
    /// query that caused it.
    ///
    /// # Arguments
    /// * `cmd` - The command to send to the instrument for which we expect a response.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.sendcmd(cmd)?;
        match self.read_until_terminator() {
            Err(InstrumentError::Timeout(timeout)) => Err(InstrumentError::TimeoutQuery {
                query: cmd.to_string(),
                timeout,
            }),
            other => other,
        }
    }

    /// Read exactly `buf.len()` bytes from the instrument.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError>;

    /// Read from the instrument byte by byte until the terminator is found.
    ///
    /// The terminator and surrounding whitespace are stripped from the returned string. Bytes
    /// that are not valid UTF-8 are replaced and reported as a warning. If the terminator is not
    /// found within the timeout, [`InstrumentError::Timeout`] is returned.
    fn read_until_terminator(&mut self) -> Result<String, InstrumentError> {
        let terminator = self.get_terminator().as_bytes().to_vec();
        let timeout = self.get_timeout();

        let mut response: Vec<u8> = Vec::new();
        let mut single_buf = [0u8];

        let tic = Instant::now();
        while tic.elapsed() < timeout {
            match self.read_exact(&mut single_buf) {
                Err(InstrumentError::Io(e)) if e.kind() == std::io::ErrorKind::TimedOut => break,
                other => other?,
            }
            response.push(single_buf[0]);
            if response.ends_with(&terminator) {
                let text = String::from_utf8_lossy(&response);
                if matches!(text, Cow::Owned(_)) {
                    warn!(raw = ?response, "received invalid UTF-8 data");
                }
                let text = text.trim().to_string();
                debug!(response = %text, "received");
                return Ok(text);
            }
        }

        Err(InstrumentError::Timeout(timeout))
    }

    /// Send a command to the instrument.
    ///
    /// This function takes the command, appends the terminator, and writes it to the instrument.
    ///
    /// # Arguments:
    /// * `cmd` - A string slice that will be sent to the instrument.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        debug!(command = cmd, "send");
        let data = format!("{cmd}{}", self.get_terminator());
        self.write(&data)
    }

    /// Set the terminator of an interface from a `&str`.
    ///
    /// Interfaces that cannot change their terminator ignore this call.
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Write a string to the instrument as is, i.e., without appending a terminator.
    fn write(&mut self, data: &str) -> Result<(), InstrumentError> {
        self.write_raw(data.as_bytes())
    }

    /// Write raw bytes to the instrument and make sure they are sent immediately.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError>;
}
