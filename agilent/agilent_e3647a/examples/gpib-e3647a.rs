use agilent_e3647a::{AgilentE3647a, DEFAULT_GPIB_ADDRESS, GpibInterfaceE3647a};
use measurements::{Current, Voltage};
use tracing_subscriber::EnvFilter;

fn main() {
    // Show the traffic to the instrument with `RUST_LOG=debug`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Open the power supply on the GPIB bus. This switches the output stage on.
    let interface =
        GpibInterfaceE3647a::simple(DEFAULT_GPIB_ADDRESS).expect("Failed to open GPIB session");
    let mut psu = AgilentE3647a::try_new(interface).unwrap();
    println!("Instrument ID: {}", psu.get_name().unwrap());

    // Output 1 as a 12 V source, output 2 as a 100 mA source.
    psu.set_voltage(Voltage::from_volts(12.0), 1).unwrap();
    psu.set_current(Current::from_amperes(0.1), 2).unwrap();

    println!(
        "Output 1: {:.4} V, {:.4} A",
        psu.measure_voltage(1).unwrap().as_volts(),
        psu.measure_current(1).unwrap().as_amperes()
    );
    println!(
        "Output 2: {:.4} V, {:.4} A",
        psu.measure_voltage(2).unwrap().as_volts(),
        psu.measure_current(2).unwrap().as_amperes()
    );

    // Reset both outputs and switch the output stage off.
    psu.close().unwrap();
}
