//! Loopback interface implemented for testing instruments that communicate by sending strings.
//!
//! End-of-command is in these cases always determined by a terminator string, usually `"\n"` or
//! similar.

use std::{collections::VecDeque, io};

use crate::{InstrumentError, InstrumentInterface, loopback::IncrIndex};

/// An interface that allows you to simply write tests for your instrument driver.
///
/// # Example
///
/// Let us build a simple instrument that sends a `"*IDN?"` command to an instrument and gets back
/// a string, and then test it with the [`LoopbackInterfaceString`]. The instrument itself takes
/// any interface that implements the [`InstrumentInterface`] trait.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use instrumentrs::{InstrumentInterface, InstrumentError, LoopbackInterfaceString};
///
/// struct MyInstrument<T: InstrumentInterface> {
///    interface: Arc<Mutex<T>>,
/// }
///
/// impl<T: InstrumentInterface> MyInstrument<T> {
///    fn new(interface: T) -> Self {
///        MyInstrument { interface: Arc::new(Mutex::new(interface)) }
///    }
///
///    fn get_name(&mut self) -> Result<String, InstrumentError> {
///        self.interface.lock().unwrap().query("*IDN?")
///    }
/// }
///
/// let host2inst = vec!["*IDN?".to_string()];
/// let inst2host = vec!["MyInstrument,1.0,1234".to_string()];
///
/// // Create the loopback interface with the expected commands and the default terminator.
/// let loopback = LoopbackInterfaceString::new(host2inst, inst2host, "\n");
///
/// let mut inst = MyInstrument::new(loopback);
/// assert_eq!("MyInstrument,1.0,1234", inst.get_name().unwrap());
///
/// // When `inst` is dropped, the loopback checks that all scripted commands were used.
/// ```
///
/// # Simulating transport failures
///
/// [`LoopbackInterfaceString::with_write_error`] makes one scripted write fail with an I/O error,
/// which lets you test how a driver behaves when the bus goes away in the middle of a sequence.
#[derive(Debug)]
pub struct LoopbackInterfaceString {
    from_host: Vec<String>,
    from_inst: Vec<String>,
    terminator_exp: String,
    from_host_index: IncrIndex,
    from_inst_index: IncrIndex,
    curr_bytes: VecDeque<u8>,
    terminator: String,
    failing_write: Option<usize>,
}

impl LoopbackInterfaceString {
    /// Create a new loopback instrument with given commands to and from instrument.
    ///
    /// Provide the commands that are expected to go from the host to the instrument, and the
    /// responses that go from the instrument to the host, each in order. Whenever something is
    /// sent that is not the next expected command, the interface panics. When the interface is
    /// dropped, [`LoopbackInterfaceString::finalize`] checks that every command and response was
    /// used.
    ///
    /// # Arguments:
    /// * `from_host` - Commands from host to instrument.
    /// * `from_inst` - Commands from instrument to host.
    /// * `terminator_exp` - The terminator the driver is expected to use.
    pub fn new(from_host: Vec<String>, from_inst: Vec<String>, terminator_exp: &str) -> Self {
        LoopbackInterfaceString {
            from_host,
            from_inst,
            terminator_exp: terminator_exp.to_string(),
            from_host_index: IncrIndex::default(),
            from_inst_index: IncrIndex::default(),
            curr_bytes: VecDeque::new(),
            terminator: "\n".to_string(), // default terminator, as interfaces
            failing_write: None,
        }
    }

    /// Let the write of the host command at position `idx` (zero-indexed) fail.
    ///
    /// The command is still checked against the expected one and counts as used, but the write
    /// returns an [`InstrumentError::Io`] error with kind [`io::ErrorKind::BrokenPipe`].
    pub fn with_write_error(mut self, idx: usize) -> Self {
        self.failing_write = Some(idx);
        self
    }

    /// This command panics if not all commands in the [`LoopbackInterfaceString`] have been used.
    ///
    /// It is automatically called when the [`LoopbackInterfaceString`] is dropped, but you can
    /// also call it manually.
    pub fn finalize(&mut self) {
        if let Some(fil) = self.from_host.get(self.from_host_index.index) {
            panic!("Leftover expected commands found from host to instrument: {fil}");
        }
        if let Some(fil) = self.from_inst.get(self.from_inst_index.index) {
            panic!("Leftover expected commands found from instrument to host: {fil}");
        }
        if !self.curr_bytes.is_empty() {
            panic!(
                "Response was not read completely, left over: {:?}",
                String::from_utf8_lossy(&self.curr_bytes.iter().copied().collect::<Vec<u8>>())
            );
        }
    }

    /// Get the next command from host to instrument as a string including the terminator.
    fn get_next_from_host_with_terminator(&mut self) -> String {
        let cmd = self
            .from_host
            .get(self.from_host_index.next())
            .expect("No more commands were expected from host to instrument.");
        format!("{cmd}{}", self.terminator_exp)
    }

    /// Get the next command from instrument to host as a string including the terminator.
    fn get_next_from_inst_with_terminator(&mut self) -> String {
        let resp = self
            .from_inst
            .get(self.from_inst_index.next())
            .expect("No more responses were expected from instrument to host.");
        format!("{resp}{}", self.terminator_exp)
    }

    /// Read exactly one byte of the current response, moving on to the next one if required.
    ///
    /// Panics if no response is left, as this is a test interface.
    fn read_one_byte(&mut self) -> u8 {
        match self.curr_bytes.pop_front() {
            Some(byte) => byte,
            None => {
                let next_resp = self.get_next_from_inst_with_terminator();
                self.curr_bytes = next_resp.into_bytes().into();
                self.read_one_byte()
            }
        }
    }
}

impl InstrumentInterface for LoopbackInterfaceString {
    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        for byte in buf.iter_mut() {
            *byte = self.read_one_byte();
        }
        Ok(())
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn write_raw(&mut self, cmd: &[u8]) -> Result<(), InstrumentError> {
        let idx = self.from_host_index.index;
        let exp = self.get_next_from_host_with_terminator();
        assert_eq!(
            exp.as_bytes(),
            cmd,
            "Expected sendcmd {exp:?}, got {:?}",
            String::from_utf8_lossy(cmd)
        );
        if self.failing_write == Some(idx) {
            return Err(InstrumentError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("simulated write failure on {:?}", exp.trim_end()),
            )));
        }
        Ok(())
    }
}

impl Drop for LoopbackInterfaceString {
    fn drop(&mut self) {
        // A second panic while unwinding would abort the test binary.
        if !std::thread::panicking() {
            self.finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lbk(host: &[&str], inst: &[&str]) -> LoopbackInterfaceString {
        LoopbackInterfaceString::new(
            host.iter().map(|s| s.to_string()).collect(),
            inst.iter().map(|s| s.to_string()).collect(),
            "\r\n",
        )
    }

    #[test]
    fn test_failing_write_counts_as_used() {
        let mut lbk = lbk(&["a", "b"], &[]).with_write_error(1);
        lbk.set_terminator("\r\n");
        lbk.sendcmd("a").unwrap();
        assert!(matches!(lbk.sendcmd("b"), Err(InstrumentError::Io(_))));
        assert_eq!(lbk.from_host_index.index, 2);
    }

    #[test]
    fn test_response_bytes_include_expected_terminator() {
        let mut lbk = lbk(&[], &["ok"]);
        let mut buf = [0u8; 4];
        lbk.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ok\r\n");
    }
}
