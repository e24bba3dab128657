//! Tests for the Agilent E3647A driver.

use std::thread;

use measurements::{Current, Voltage};
use rstest::*;

use instrumentrs::{InstrumentError, LoopbackInterfaceString, gpib_resource};

use agilent_e3647a::*;

// Type alias for the loopback interface with the E3647A driver.
type AgilentE3647aLbk = AgilentE3647a<LoopbackInterfaceString>;

/// Create the loopback interface for the given commands. `"OUTP ON"` is prepended to the host
/// commands, as the driver always switches the output stage on when it is created.
fn crt_lbk(host2inst: Vec<&str>, inst2host: Vec<&str>) -> LoopbackInterfaceString {
    let term = "\n";
    let h2i: Vec<String> = std::iter::once("OUTP ON")
        .chain(host2inst)
        .map(|s| s.to_string())
        .collect();
    let i2h: Vec<String> = inst2host.iter().map(|s| s.to_string()).collect();
    LoopbackInterfaceString::new(h2i, i2h, term)
}

/// Function that creates a new E3647A instance with the given input and output commands.
fn crt_inst(host2inst: Vec<&str>, inst2host: Vec<&str>) -> AgilentE3647aLbk {
    AgilentE3647a::try_new(crt_lbk(host2inst, inst2host)).unwrap()
}

#[fixture]
fn emp_inst() -> AgilentE3647aLbk {
    crt_inst(vec![], vec![])
}

/// Initialization switches the output stage on and nothing else.
#[rstest]
fn test_initialization(_emp_inst: AgilentE3647aLbk) {}

#[rstest]
fn test_get_name() {
    let mut inst = crt_inst(vec!["*IDN?"], vec!["Agilent Technologies,E3647A,0,1.7-5.0-1.0"]);
    assert_eq!(
        inst.get_name().unwrap(),
        "Agilent Technologies,E3647A,0,1.7-5.0-1.0"
    );
}

/// Setting a voltage selects the output first and applies the maximum current limit.
#[rstest]
#[case(12.0, 1, "INST OUT1", "APPLY 12.000000, MAX")]
#[case(0.5, 2, "INST OUT2", "APPLY 0.500000, MAX")]
#[case(3.3333333, 1, "INST OUT1", "APPLY 3.333333, MAX")]
fn test_set_voltage(
    #[case] volt: f64,
    #[case] channel: u8,
    #[case] select: &str,
    #[case] apply: &str,
) {
    let mut inst = crt_inst(vec![select, apply], vec![]);
    inst.set_voltage(Voltage::from_volts(volt), channel).unwrap();
}

/// Setting a current selects the output first and applies the maximum voltage limit.
#[rstest]
#[case(0.1, 1, "INST OUT1", "APPLY MAX, 0.100000")]
#[case(1.25, 2, "INST OUT2", "APPLY MAX, 1.250000")]
fn test_set_current(
    #[case] curr: f64,
    #[case] channel: u8,
    #[case] select: &str,
    #[case] apply: &str,
) {
    let mut inst = crt_inst(vec![select, apply], vec![]);
    inst.set_current(Current::from_amperes(curr), channel).unwrap();
}

#[rstest]
fn test_measure_voltage() {
    let mut inst = crt_inst(vec!["INST OUT2", "MEAS:VOLT?"], vec!["5.012"]);
    let volt = inst.measure_voltage(2).unwrap();
    assert!((volt.as_volts() - 5.012).abs() < 1e-12);
}

#[rstest]
fn test_measure_current() {
    let mut inst = crt_inst(vec!["INST OUT1", "MEAS:CURR?"], vec!["+1.00000000E-01"]);
    let curr = inst.measure_current(1).unwrap();
    assert!((curr.as_amperes() - 0.1).abs() < 1e-12);
}

/// Non-numeric replies are parse errors that carry the reply.
#[rstest]
#[case("MEAS:VOLT?")]
#[case("MEAS:CURR?")]
fn test_measure_parse_error(#[case] query: &str) {
    let mut inst = crt_inst(vec!["INST OUT1", query], vec!["ERR"]);
    let result = if query == "MEAS:VOLT?" {
        inst.measure_voltage(1).map(|_| ())
    } else {
        inst.measure_current(1).map(|_| ())
    };
    match result {
        Err(InstrumentError::ResponseParseError(resp)) => assert_eq!(resp, "ERR"),
        _ => panic!("Expected a ResponseParseError"),
    }
}

/// Output numbers are not checked by the driver.
#[rstest]
fn test_channel_passthrough() {
    let mut inst = crt_inst(vec!["INST OUT7", "APPLY 1.000000, MAX"], vec![]);
    inst.set_voltage(Voltage::from_volts(1.0), 7).unwrap();
}

#[rstest]
fn test_set_output() {
    let mut inst = crt_inst(vec!["OUTP OFF", "OUTP ON"], vec![]);
    inst.set_output(false).unwrap();
    inst.set_output(true).unwrap();
}

/// Closing resets both outputs in order, then switches the output stage off.
#[rstest]
fn test_close() {
    let mut inst = crt_inst(
        vec![
            "INST OUT1",
            "APPLY MIN, MIN",
            "INST OUT2",
            "APPLY MIN, MIN",
            "OUTP OFF",
        ],
        vec![],
    );
    inst.close().unwrap();

    // The session is gone now.
    assert!(matches!(inst.close(), Err(InstrumentError::SessionClosed)));
    assert!(matches!(
        inst.measure_voltage(1),
        Err(InstrumentError::SessionClosed)
    ));
}

/// If the third write of the shutdown fails, nothing else is sent and the error is returned.
#[rstest]
fn test_close_aborts_on_write_error() {
    // Host writes: 0 "OUTP ON", 1 "INST OUT1", 2 "APPLY MIN, MIN", 3 "INST OUT2" (fails).
    let lbk = crt_lbk(vec!["INST OUT1", "APPLY MIN, MIN", "INST OUT2"], vec![]).with_write_error(3);
    let mut inst = AgilentE3647a::try_new(lbk).unwrap();

    match inst.close() {
        Err(InstrumentError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        _ => panic!("Expected the simulated bus error"),
    }
    // Dropping `inst` checks that no further command was expected or sent.
}

/// After an aborted shutdown the session is still open and `close` can be retried.
#[rstest]
fn test_close_can_be_retried() {
    let lbk = crt_lbk(
        vec![
            "INST OUT1",
            "APPLY MIN, MIN",
            "INST OUT2",
            "INST OUT1",
            "APPLY MIN, MIN",
            "INST OUT2",
            "APPLY MIN, MIN",
            "OUTP OFF",
        ],
        vec![],
    )
    .with_write_error(3);
    let mut inst = AgilentE3647a::try_new(lbk).unwrap();

    assert!(inst.close().is_err());
    inst.close().unwrap();
}

/// Clones share the session. Channel selection and command are never interleaved between them.
#[rstest]
fn test_clones_do_not_interleave() {
    let n_threads = 4;
    let mut host2inst = Vec::new();
    for _ in 0..n_threads {
        host2inst.extend(["INST OUT2", "APPLY 5.000000, MAX"]);
    }
    let inst = crt_inst(host2inst, vec![]);

    let handles: Vec<_> = (0..n_threads)
        .map(|_| {
            let mut psu = inst.clone();
            thread::spawn(move || psu.set_voltage(Voltage::from_volts(5.0), 2))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
}

/// The default address resolves to the first instrument on the first GPIB board.
#[rstest]
fn test_default_gpib_resource() {
    assert_eq!(gpib_resource(DEFAULT_GPIB_ADDRESS), "GPIB0::1::INSTR");
}

/// The GPIB constructor hands out a session the driver accepts.
#[cfg(feature = "visa")]
#[rstest]
fn test_gpib_interface_builds_driver() {
    use instrumentrs::{Instrument, VisaSession};

    type Open = fn(u8) -> Result<Instrument<VisaSession>, InstrumentError>;
    type Wrap = fn(
        Instrument<VisaSession>,
    ) -> Result<AgilentE3647a<Instrument<VisaSession>>, InstrumentError>;

    let _open: Open = GpibInterfaceE3647a::simple;
    let _wrap: Wrap = AgilentE3647a::try_new;
}
