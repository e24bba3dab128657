use lakeshore_224::{DEFAULT_CHANNEL, Lakeshore224, SerialInterfaceLakeshore224};
use tracing_subscriber::EnvFilter;

fn main() {
    // Show the traffic to the instrument with `RUST_LOG=debug`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let port = "/dev/ttyUSB0";

    // Get our serial instrument interface
    let serial_inst =
        SerialInterfaceLakeshore224::simple(port).expect("Failed to open serial port");

    // Now we can open the Lakeshore224 with the serial interface.
    let mut inst = Lakeshore224::try_new(serial_inst).unwrap();
    println!("Instrument ID: {}", inst.get_name().unwrap());

    // Read input A and then all inputs
    println!("Input A: {:?}", inst.read_channels(DEFAULT_CHANNEL));
    match inst.read_all() {
        Ok(temps) => {
            for (idx, temp) in temps.iter().enumerate() {
                println!("Input {idx}: {:.3} K", temp.as_kelvin());
            }
        }
        Err(e) => eprintln!("Reading all inputs failed: {e}"),
    }

    inst.close().unwrap();
}
