//! Fuzz the command-batch decoder with arbitrary datagram payloads.
//!
//! The decoder must never panic or read out of bounds, whatever the host
//! sends; every outcome is either a batch or a typed decode error.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(batch) = sonoprobe::proto::codec::decode(data) {
        // A decoded batch always re-encodes.
        let commands: Vec<_> = batch.iter().copied().collect();
        let _ = sonoprobe::proto::codec::encode(&commands);
    }
});
