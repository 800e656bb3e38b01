//! System configuration parameters
//!
//! Compile-time geometry of the wire protocol and acquisition pipeline, plus
//! the runtime tunables in [`ProbeConfig`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire protocol
// ---------------------------------------------------------------------------

/// Numeric identity included in the ping reply.
pub const PROBE_ID: u8 = 1;

/// Size of the command receive buffer (one maximum-size datagram).
pub const RX_BUFFER_SIZE: usize = 1472;

/// Largest single datagram the network transport emits; larger payloads are
/// fragmented into sequential chunks of this size plus a remainder.
pub const MAX_DATAGRAM_SIZE: usize = 1472;

/// Maximum number of commands in one batch.
pub const MAX_COMMANDS: usize = 2048;

/// UDP port the command endpoint listens on.
pub const UDP_PORT: u16 = 50007;

// ---------------------------------------------------------------------------
// Acquisition pipeline
// ---------------------------------------------------------------------------

/// Payload bytes of one acquisition packet, excluding the sequence header.
pub const PACKET_SIZE: usize = 1000;

/// One acquisition packet on the wire: 2-byte sequence header + payload.
/// Also the length of each FIFO read from the fabric.
pub const PACKET_BYTES: usize = PACKET_SIZE + 2;

/// Number of slots in the acquisition buffer pool.
pub const SLOT_COUNT: usize = 2;

/// Capacity of one pool slot in bytes.
pub const SLOT_SIZE: usize = 2048;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Behaviour of read-back–verified register writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyPolicy {
    /// Log a read-back mismatch and continue.
    Permissive,
    /// Fail the operation on a read-back mismatch.
    Strict,
}

/// Runtime tunables for one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Identity reported by the ping reply.
    pub probe_id: u8,
    /// Upper bound on one wait for the fabric data-ready interrupt.
    /// A shot that exceeds it aborts instead of hanging the worker.
    pub ready_timeout_ms: u32,
    /// Read-back checking for verified register writes.
    pub verify_policy: VerifyPolicy,
    /// Supply settle time after the data-ready interrupt, per shot.
    pub shot_settle_ms: u32,
    /// Worst-case time for the fabric to stage one packet into its SPI
    /// transmit buffer after enable-read (24 cycles of the 10 MHz clock).
    pub read_settle_ns: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe_id: PROBE_ID,
            ready_timeout_ms: 1000,
            verify_policy: VerifyPolicy::Permissive,
            shot_settle_ms: 1,
            read_settle_ns: 2400,
        }
    }
}
