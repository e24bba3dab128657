//! Provide a GPIB interface for the E3647A.

use instrumentrs::{Instrument, InstrumentError, VisaInterface, VisaSession};

/// A GPIB interface for the E3647A.
///
/// Opens a VISA session to the E3647A on the first GPIB board.
#[derive(Debug)]
pub struct GpibInterfaceE3647a {}

impl GpibInterfaceE3647a {
    /// Try to open the E3647A at the given GPIB address.
    ///
    /// The address is resolved to the resource string `GPIB0::<address>::INSTR`. Use
    /// [`crate::DEFAULT_GPIB_ADDRESS`] if the address was never changed on the front panel.
    ///
    /// Arguments:
    /// * `address` - The primary GPIB address of the power supply.
    pub fn simple(address: u8) -> Result<Instrument<VisaSession>, InstrumentError> {
        VisaInterface::gpib(address)
    }
}
