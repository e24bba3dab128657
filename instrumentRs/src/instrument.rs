//! This module provides the generic session that implements the [`InstrumentInterface`] trait.
//!
//! It can be built from any type that implements [`std::io::Read`] and [`std::io::Write`], such
//! as a serial port, a VISA session, or an in-memory buffer in tests.

use std::{
    io::{Read, Write},
    time::Duration,
};

use crate::{InstrumentError, InstrumentInterface};

/// A general instrument session that can be built with any port that implements
/// [`std::io::Read`] and [`std::io::Write`].
///
/// The session owns its port exclusively. Dropping the session closes the port.
///
/// # Example
///
/// ```
/// use std::{collections::VecDeque, time::Duration};
///
/// use instrumentrs::{Instrument, InstrumentInterface};
///
/// let mut inst = Instrument::new(VecDeque::new(), Duration::from_secs(3));
/// inst.set_terminator("\r\n");
/// assert_eq!(inst.get_terminator(), "\r\n");
/// ```
#[derive(Debug)]
pub struct Instrument<P: Read + Write> {
    port: P,
    terminator: String,
    timeout: Duration,
}

impl<P: Read + Write> Instrument<P> {
    /// Create a new [`Instrument`] session around a given port.
    ///
    /// The terminator defaults to `"\n"`.
    ///
    /// # Arguments
    /// * `port` - The port to talk through.
    /// * `timeout` - How long to wait for a complete response.
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            terminator: "\n".to_string(),
            timeout,
        }
    }

    /// Close the session and hand back the underlying port.
    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: Read + Write> InstrumentInterface for Instrument<P> {
    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn get_timeout(&self) -> Duration {
        self.timeout
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        self.port.read_exact(buf)?;
        Ok(())
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}
