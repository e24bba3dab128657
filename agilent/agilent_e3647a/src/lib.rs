//! A rust driver for the Agilent E3647A dual output power supply.
//!
//! This driver sets and measures the voltage and current of the two outputs of the E3647A. When
//! the driver is created, the output stage of the instrument is switched on. When it is closed,
//! both outputs are set to their minimum values and the output stage is switched off.
//!
//! The E3647A applies every command to the output that was selected last. The driver always
//! selects the output and sends the command while holding the session, so that two clones of the
//! driver used from different threads can never interleave these steps.
//!
//! # Example
//!
//! With the `visa` feature enabled, `GpibInterfaceE3647a` opens the instrument on the GPIB bus.
//! The driver itself works with any [`InstrumentInterface`]:
//!
//! ```no_run
//! use agilent_e3647a::AgilentE3647a;
//! use instrumentrs::{InstrumentError, InstrumentInterface};
//! use measurements::{Current, Voltage};
//!
//! fn ramp<T: InstrumentInterface>(interface: T) -> Result<(), InstrumentError> {
//!     let mut psu = AgilentE3647a::try_new(interface)?;
//!
//!     psu.set_voltage(Voltage::from_volts(12.0), 1)?;
//!     psu.set_current(Current::from_amperes(0.1), 2)?;
//!     println!("Output 1: {} V", psu.measure_voltage(1)?.as_volts());
//!     println!("Output 2: {} A", psu.measure_current(2)?.as_amperes());
//!
//!     psu.close()
//! }
//! ```

#![deny(warnings, missing_docs)]

use std::sync::{Arc, Mutex};

use instrumentrs::{InstrumentError, InstrumentInterface};
use measurements::{Current, Voltage};
use tracing::{info, warn};

#[cfg(feature = "visa")]
pub use interface::GpibInterfaceE3647a;

#[cfg(feature = "visa")]
mod interface;

/// The GPIB address the E3647A ships with.
pub const DEFAULT_GPIB_ADDRESS: u8 = 1;

/// Number of outputs of the E3647A.
pub const NUM_CHANNELS: u8 = 2;

/// A rust driver for the Agilent E3647A.
///
/// Outputs are addressed with their number as printed on the front panel, i.e., 1 or 2. The
/// number is sent to the instrument without checking.
///
/// Clones of the driver share one session. After [`AgilentE3647a::close`] succeeded, all clones
/// return [`InstrumentError::SessionClosed`].
pub struct AgilentE3647a<T: InstrumentInterface> {
    interface: Arc<Mutex<Option<T>>>,
}

impl<T: InstrumentInterface> AgilentE3647a<T> {
    /// Create a new E3647A instance with the given instrument interface.
    ///
    /// This sets the `"\n"` terminator and switches the output stage on.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        let mut intf = interface;
        intf.set_terminator("\n");
        intf.sendcmd("OUTP ON")?;
        info!("E3647A output stage enabled");
        Ok(AgilentE3647a {
            interface: Arc::new(Mutex::new(Some(intf))),
        })
    }

    /// Set the voltage of an output.
    ///
    /// The current limit of the output is set to the maximum at the same time.
    ///
    /// # Arguments
    /// * `volt` - The voltage to apply.
    /// * `channel` - The output number.
    pub fn set_voltage(&mut self, volt: Voltage, channel: u8) -> Result<(), InstrumentError> {
        self.sendcmd_channel(channel, &format!("APPLY {:.6}, MAX", volt.as_volts()))
    }

    /// Set the current of an output.
    ///
    /// The voltage limit of the output is set to the maximum at the same time.
    ///
    /// # Arguments
    /// * `curr` - The current to apply.
    /// * `channel` - The output number.
    pub fn set_current(&mut self, curr: Current, channel: u8) -> Result<(), InstrumentError> {
        self.sendcmd_channel(channel, &format!("APPLY MAX, {:.6}", curr.as_amperes()))
    }

    /// Measure the voltage of an output at the rear sense terminals.
    pub fn measure_voltage(&mut self, channel: u8) -> Result<Voltage, InstrumentError> {
        let resp = self.query_channel(channel, "MEAS:VOLT?")?;
        Ok(Voltage::from_volts(parse_float(&resp)?))
    }

    /// Measure the current of an output.
    pub fn measure_current(&mut self, channel: u8) -> Result<Current, InstrumentError> {
        let resp = self.query_channel(channel, "MEAS:CURR?")?;
        Ok(Current::from_amperes(parse_float(&resp)?))
    }

    /// Switch the output stage of the instrument on or off.
    ///
    /// This affects both outputs.
    pub fn set_output(&mut self, on: bool) -> Result<(), InstrumentError> {
        let cmd = if on { "OUTP ON" } else { "OUTP OFF" };
        self.with_session(|intf| intf.sendcmd(cmd))
    }

    /// Query the name of the instrument.
    ///
    /// Returns a comma-separated string of manufacturer, model, serial number, and firmware
    /// revisions.
    pub fn get_name(&mut self) -> Result<String, InstrumentError> {
        self.with_session(|intf| intf.query("*IDN?"))
    }

    /// Reset both outputs, switch the output stage off, and close the session.
    ///
    /// Output 1 and then output 2 are set to their minimum voltage and current, then the output
    /// stage is switched off. The sequence stops at the first failing command and returns its
    /// error. In that case the session is kept open, the output stage is likely still on, and
    /// `close` can be called again to run the full sequence once more.
    pub fn close(&mut self) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        let session = intf.as_mut().ok_or(InstrumentError::SessionClosed)?;
        shutdown(session).inspect_err(|e| {
            warn!(error = %e, "E3647A shutdown aborted, outputs may still be enabled");
        })?;
        intf.take();
        info!("E3647A outputs reset and disabled, session closed");
        Ok(())
    }

    /// Select an output and send a command to it while holding the session.
    fn sendcmd_channel(&mut self, channel: u8, cmd: &str) -> Result<(), InstrumentError> {
        self.with_session(|intf| {
            intf.sendcmd(&select_cmd(channel))?;
            intf.sendcmd(cmd)
        })
    }

    /// Select an output and query it while holding the session.
    fn query_channel(&mut self, channel: u8, cmd: &str) -> Result<String, InstrumentError> {
        self.with_session(|intf| {
            intf.sendcmd(&select_cmd(channel))?;
            intf.query(cmd)
        })
    }

    /// Run `f` with exclusive access to the open session.
    fn with_session<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, InstrumentError>,
    ) -> Result<R, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        f(intf.as_mut().ok_or(InstrumentError::SessionClosed)?)
    }
}

impl<T: InstrumentInterface> Clone for AgilentE3647a<T> {
    fn clone(&self) -> Self {
        Self {
            interface: self.interface.clone(),
        }
    }
}

/// Set both outputs to minimum and switch the output stage off.
fn shutdown<T: InstrumentInterface>(intf: &mut T) -> Result<(), InstrumentError> {
    for channel in 1..=NUM_CHANNELS {
        intf.sendcmd(&select_cmd(channel))?;
        intf.sendcmd("APPLY MIN, MIN")?;
    }
    intf.sendcmd("OUTP OFF")
}

fn select_cmd(channel: u8) -> String {
    format!("INST OUT{channel}")
}

fn parse_float(resp: &str) -> Result<f64, InstrumentError> {
    resp.trim()
        .parse::<f64>()
        .map_err(|_| InstrumentError::ResponseParseError(resp.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_cmd() {
        assert_eq!(select_cmd(1), "INST OUT1");
        assert_eq!(select_cmd(2), "INST OUT2");
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("+5.01200000E+00").unwrap(), 5.012);
        assert_eq!(parse_float(" 0.25 ").unwrap(), 0.25);
        assert!(matches!(
            parse_float("-113,\"Undefined header\""),
            Err(InstrumentError::ResponseParseError(_))
        ));
    }
}
