//! The loopback module provides an instrument simulator for testing purposes.
//!
//! The [`LoopbackInterfaceString`] allows to test instrument drivers that communicate using
//! strings with a fixed terminator at the end of every line. See its documentation for an
//! example.

mod loopback_interface_string;

pub use loopback_interface_string::*;

/// A self-incrementing index structure that by default starts at 0 and increments whenever `next`
/// is called.
#[derive(Debug, Default)]
struct IncrIndex {
    index: usize,
}

impl IncrIndex {
    fn next(&mut self) -> usize {
        let current = self.index;
        self.index += 1;
        current
    }
}
