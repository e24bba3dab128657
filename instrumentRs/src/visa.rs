//! VISA sessions using the `visa-rs` crate.
//!
//! This gives access to instruments on a GPIB bus (and any other bus the installed VISA library
//! supports) through resource strings such as `"GPIB0::1::INSTR"`.

use std::{
    ffi::CString,
    io::{Read, Write},
    time::Duration,
};

use tracing::info;
use visa_rs::{AsResourceManager, DefaultRM, TIMEOUT_IMMEDIATE, flags::AccessMode};

use crate::{Instrument, InstrumentError, gpib_resource};

/// The I/O timeout of a freshly opened VISA session, `VI_ATTR_TMO_VALUE` defaults to 2000 ms.
pub(crate) const VISA_IO_TIMEOUT: Duration = Duration::from_millis(2000);

/// An open VISA session.
///
/// The session keeps its resource manager alive, since closing the resource manager closes all
/// sessions that were opened through it.
pub struct VisaSession {
    // Dropped before the resource manager.
    session: visa_rs::Instrument,
    _rm: DefaultRM,
}

impl Read for VisaSession {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.session.read(buf)
    }
}

impl Write for VisaSession {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.session.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.session.flush()
    }
}

/// Constructors for [`Instrument`] sessions that talk through VISA.
#[derive(Debug)]
pub struct VisaInterface {}

impl VisaInterface {
    /// Open the instrument with the given primary address on the first GPIB board.
    ///
    /// This resolves to the resource string `GPIB0::<address>::INSTR`.
    pub fn gpib(address: u8) -> Result<Instrument<VisaSession>, InstrumentError> {
        Self::resource(&gpib_resource(address))
    }

    /// Open the instrument with a given VISA resource string.
    ///
    /// The response timeout of the session is the default I/O timeout of VISA, two seconds.
    ///
    /// # Arguments
    /// * `resource` - The VISA resource string, e.g., `"GPIB0::5::INSTR"`.
    pub fn resource(resource: &str) -> Result<Instrument<VisaSession>, InstrumentError> {
        let rm = DefaultRM::new().map_err(|e| {
            InstrumentError::ConnectionError(format!("VISA resource manager unavailable: {e}"))
        })?;
        let name = CString::new(resource).map_err(|_| {
            InstrumentError::InvalidArgument(format!(
                "Resource string {resource:?} must not contain null bytes."
            ))
        })?;
        let session = rm
            .open(&name.into(), AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
            .map_err(|e| InstrumentError::ConnectionError(format!("{resource}: {e}")))?;
        info!(resource, "VISA session opened");

        Ok(Instrument::new(
            VisaSession { session, _rm: rm },
            VISA_IO_TIMEOUT,
        ))
    }
}
