//! Session loop — single-command-in-flight flow control.
//!
//! Two tasks and one interrupt context coordinate through two binary
//! signals:
//!
//! ```text
//! ┌───────────┐  command received   ┌───────────┐
//! │ Receiver  │────────────────────▶│  Worker   │
//! │ (UDP rx)  │◀────────────────────│ (dispatch)│
//! └───────────┘  command executed   └───────────┘
//! ```
//!
//! The receiver never accepts the next datagram until the worker raises
//! "executed", so the frame under execution is never overwritten — the
//! handshake is the backpressure, substituting for a queue.  Malformed
//! datagrams are dropped where they arrive; no NACK goes back to the host.

use core::net::SocketAddr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;
use futures_lite::future::block_on;
use log::{debug, error, info, warn};

use crate::config::RX_BUFFER_SIZE;
use crate::drivers::led::Led;
use crate::error::Result;
use crate::proto::codec;

use super::ports::{BoardPort, BusPort, DatagramPort, PacerPort};
use super::service::ProbeService;

// ───────────────────────────────────────────────────────────────
// Signals
// ───────────────────────────────────────────────────────────────

/// One validated datagram, handed from the receiver to the worker.
pub struct CommandFrame {
    pub bytes: heapless::Vec<u8, RX_BUFFER_SIZE>,
    pub peer: SocketAddr,
}

/// The two binary session signals.  Owned state, passed to both loops —
/// tests run the session against a local instance.
pub struct SessionSignals {
    received: Signal<CriticalSectionRawMutex, CommandFrame>,
    executed: Signal<CriticalSectionRawMutex, ()>,
}

impl SessionSignals {
    pub const fn new() -> Self {
        Self {
            received: Signal::new(),
            executed: Signal::new(),
        }
    }

    /// Worker side: block until the receiver hands over a frame.
    pub fn wait_received(&self) -> CommandFrame {
        block_on(self.received.wait())
    }

    /// Worker side: raise "command executed" so the receiver resumes.
    pub fn notify_executed(&self) {
        self.executed.signal(());
    }

    /// A frame has been handed over and not yet picked up.
    pub fn has_pending(&self) -> bool {
        self.received.signaled()
    }
}

impl Default for SessionSignals {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Receiver task
// ───────────────────────────────────────────────────────────────

/// One receiver cycle: receive, validate, hand over, wait for completion.
///
/// A datagram that fails validation is dropped and the cycle ends without
/// waking the worker.
pub fn receiver_step<N: DatagramPort>(net: &mut N, signals: &SessionSignals) -> Result<()> {
    let mut buf = [0u8; RX_BUFFER_SIZE];
    let (len, peer) = net.receive_from(&mut buf)?;

    debug!("Received {len} bytes from {peer}");

    // Validate before waking the worker; it decodes again into its own
    // zero-copy batch.
    if let Err(e) = codec::decode(&buf[..len]) {
        warn!("Invalid command from {peer}: {e}, skipping");
        return Ok(());
    }

    let mut bytes = heapless::Vec::new();
    if bytes.extend_from_slice(&buf[..len]).is_err() {
        // Cannot happen: the receive buffer and the frame have equal capacity.
        return Ok(());
    }
    signals.received.signal(CommandFrame { bytes, peer });

    // Hold off the next receive until the worker is done with this frame.
    block_on(signals.executed.wait());
    Ok(())
}

/// Receiver task body: loop forever on [`receiver_step`].
pub fn receiver_loop<N: DatagramPort>(mut net: N, signals: &SessionSignals) -> ! {
    info!("Command receiver listening");
    loop {
        if let Err(e) = receiver_step(&mut net, signals) {
            error!("Error receiving datagram: {e}");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Worker task
// ───────────────────────────────────────────────────────────────

/// Execute one received frame: decode and dispatch the batch.
pub fn worker_step<B, N, D, P>(
    service: &mut ProbeService<B, N, D, P>,
    frame: &CommandFrame,
) -> Result<()>
where
    B: BusPort,
    N: DatagramPort,
    D: BoardPort,
    P: PacerPort,
{
    service.set_peer(frame.peer);
    let batch = codec::decode(&frame.bytes)?;
    service.execute_batch(&batch)
}

/// Worker task body: wait for a frame, execute it, raise "executed".
///
/// The red LED is lit for the duration of each batch.  "Executed" is
/// raised even when the batch failed — the receiver must resume either
/// way; the failure is a local diagnostic only.
pub fn worker_loop<B, N, D, P, L>(
    mut service: ProbeService<B, N, D, P>,
    signals: &SessionSignals,
    mut activity_led: Led<L>,
) -> !
where
    B: BusPort,
    N: DatagramPort,
    D: BoardPort,
    P: PacerPort,
    L: OutputPin,
{
    info!("Command worker running");
    loop {
        let frame = signals.wait_received();

        activity_led.set(true);
        if let Err(e) = worker_step(&mut service, &frame) {
            error!("Error executing command: {e}");
        }
        activity_led.set(false);

        signals.notify_executed();
    }
}
