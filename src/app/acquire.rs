//! Shot-acquisition orchestrator.
//!
//! One `trigger-shot` command runs `n_shots` acquisition cycles.  Each cycle
//! waits for the fabric's data-ready interrupt, lets the supplies settle,
//! enables readout, and streams `packets_per_shot` fixed-size packets from
//! the fabric FIFO to the controlling host.
//!
//! The streaming transfer overlaps I/O through the two-slot pool: the SPI
//! read of the next packet is started before the current one drains to the
//! network.  SPI failures are fatal to the shot; a lost UDP packet is only
//! logged — the host detects the gap from the sequence numbers.

use log::{debug, info, warn};

use crate::config::PACKET_BYTES;
use crate::drivers::fabric;
use crate::error::{BusError, Error, NetError, Result};

use super::ports::{BoardPort, BusPort, DatagramPort, LinkMode, PacerPort};
use super::service::ProbeService;

// ───────────────────────────────────────────────────────────────
// Shot plan and report
// ───────────────────────────────────────────────────────────────

/// Parameters of one trigger-shot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotPlan {
    /// Acquisition cycles to run.
    pub n_shots: u16,
    /// Packets to stream per cycle.
    pub packets_per_shot: u16,
    /// Post-trigger settle knob, tens of microseconds.  Carried for the
    /// host protocol; the loop currently uses the fixed worst-case settle.
    pub trigger_settle_10us: u8,
    /// FIFO settle knob, microseconds.  Same status as above.
    pub fifo_settle_us: u8,
}

impl ShotPlan {
    /// Decode the trigger-shot args: LE u16 shot count, LE u16 packet
    /// count, then the two settle knobs.
    pub fn parse(args: &[u8]) -> Self {
        Self {
            n_shots: u16::from_le_bytes([args[0], args[1]]),
            packets_per_shot: u16::from_le_bytes([args[2], args[3]]),
            trigger_settle_10us: args[4],
            fifo_settle_us: args[5],
        }
    }
}

/// Aggregate outcome of one shot loop, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotReport {
    /// Wall time of the whole loop.
    pub elapsed_ms: u64,
    /// Data-ready interrupts observed, independent of packets sent.
    pub shots_seen: u16,
}

// ───────────────────────────────────────────────────────────────
// Orchestration
// ───────────────────────────────────────────────────────────────

impl<B, N, D, P> ProbeService<B, N, D, P>
where
    B: BusPort,
    N: DatagramPort,
    D: BoardPort,
    P: PacerPort,
{
    /// Run the full shot sequence, bracketed by the link-mode switch.
    ///
    /// Low-power restoration is best-effort on the failure path; if the
    /// restoration itself fails, that error wins.
    pub(crate) fn trigger_shot(&mut self, plan: &ShotPlan) -> Result<ShotReport> {
        info!(
            "Triggering {} shots with {} packets to read",
            plan.n_shots, plan.packets_per_shot
        );

        // Without a peer there is nowhere to stream; fail before touching
        // the hardware.
        if self.peer().is_none() {
            return Err(Error::Net(NetError::NotBound));
        }

        self.board.set_link_mode(LinkMode::HighThroughput)?;
        debug!("High-throughput mode active");

        let outcome = self.run_shot_loop(plan);

        self.board.set_link_mode(LinkMode::LowPower)?;
        debug!("Low-power mode restored");

        outcome
    }

    fn run_shot_loop(&mut self, plan: &ShotPlan) -> Result<ShotReport> {
        self.fabric.reset_pipeline(&mut self.bus)?;
        self.fabric.drain_tx_fifo(&mut self.bus)?;
        self.pacer.reset();

        let start_ms = self.board.now_ms();
        self.fabric.start_sequencer(&mut self.bus)?;

        for _ in 0..plan.n_shots {
            self.pacer.wait_ready(self.config.ready_timeout_ms)?;

            // Let the DC-DC recover from the pulse before clocking data out.
            self.board.delay_ms(self.config.shot_settle_ms);

            self.fabric.enable_read(&mut self.bus)?;
            // Worst-case time for the fabric to stage the packet into its
            // SPI transmit buffer.
            self.board.delay_ns(self.config.read_settle_ns);

            self.stream_packets(plan.packets_per_shot)?;

            self.fabric.reset_pipeline(&mut self.bus)?;
        }

        debug!("Shot loop complete");

        Ok(ShotReport {
            elapsed_ms: self.board.now_ms() - start_ms,
            shots_seen: self.pacer.shot_count(),
        })
    }

    /// Stream one shot's packets, overlapping each SPI fetch with the
    /// previous packet's network drain.
    fn stream_packets(&mut self, packets: u16) -> Result<()> {
        let peer = self.peer().ok_or(Error::Net(NetError::NotBound))?;

        self.pool.init();

        let mut read_cmd = [0u8; PACKET_BYTES];
        read_cmd[0] = fabric::OP_READ_FIFO;
        read_cmd[1] = fabric::DUMMY_ADDR;

        // Prime the pipeline: start the first fetch without waiting.
        let token = self.pool.claim_for_write().ok_or(Error::SlotExhausted)?;
        self.bus.transfer(
            &read_cmd,
            &mut self.pool.data_mut(&token)[..PACKET_BYTES],
            false,
        )?;
        let mut in_flight = Some(token);

        for seq in 0..packets {
            let filled = in_flight
                .take()
                .ok_or(Error::Bus(BusError::NotStarted))?;
            self.bus.await_completion()?;
            self.pool.set_len(&filled, PACKET_BYTES);
            self.pool.return_slot(filled, false);

            // Start fetching the next packet before draining this one —
            // the overlap the two-slot pool exists for.
            if seq + 1 != packets {
                let token = self.pool.claim_for_write().ok_or(Error::SlotExhausted)?;
                self.bus.transfer(
                    &read_cmd,
                    &mut self.pool.data_mut(&token)[..PACKET_BYTES],
                    false,
                )?;
                in_flight = Some(token);
            }

            let out = self.pool.claim_for_read().ok_or(Error::SlotExhausted)?;
            // Stamp the packet with its 0-based index within the shot.
            self.pool.data_mut(&out)[..2].copy_from_slice(&seq.to_le_bytes());
            if let Err(e) = self.net.send_to(self.pool.data(&out), peer) {
                warn!("Packet {seq} dropped: {e}");
            }
            self.pool.return_slot(out, true);
        }

        debug!("Shot acquired");
        Ok(())
    }
}
