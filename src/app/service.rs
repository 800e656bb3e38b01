//! Probe service — command dispatch and front-end bring-up.
//!
//! [`ProbeService`] owns the chip drivers, the acquisition buffer pool, and
//! the session flags.  All I/O flows through the port traits injected at
//! construction, making the whole service testable against the mock rig.
//!
//! ```text
//!  DatagramPort ──▶ ┌──────────────────────────┐ ──▶ BusPort
//!                   │       ProbeService        │
//!     PacerPort ──▶ │  dispatch · shot loop     │ ──▶ BoardPort
//!                   └──────────────────────────┘
//! ```
//!
//! Batch execution is strictly sequential and aborts on the first failure;
//! commands that already ran keep their effects.  That short-circuit fold is
//! the documented contract, not an accident of control flow.

use core::net::SocketAddr;

use log::{debug, info, warn};

use crate::buffer::SlotPool;
use crate::config::ProbeConfig;
use crate::drivers::fabric::Fabric;
use crate::drivers::front_end::{FrontEnd, TestPattern};
use crate::drivers::tx_driver::TxDriver;
use crate::error::{DispatchError, Error, NetError, Result};
use crate::proto::command::{Command, CommandBatch, CommandId};

use super::acquire::ShotPlan;
use super::ports::{
    BoardPort, BusPort, DatagramPort, LinkMode, MuxTarget, PacerPort, PowerDomain,
};

// ───────────────────────────────────────────────────────────────
// ProbeService
// ───────────────────────────────────────────────────────────────

pub struct ProbeService<B, N, D, P>
where
    B: BusPort,
    N: DatagramPort,
    D: BoardPort,
    P: PacerPort,
{
    pub(crate) bus: B,
    pub(crate) net: N,
    pub(crate) board: D,
    pub(crate) pacer: P,
    pub(crate) fabric: Fabric,
    pub(crate) front_end: FrontEnd,
    pub(crate) tx_driver: TxDriver,
    pub(crate) pool: SlotPool,
    pub(crate) config: ProbeConfig,
    /// Source of the batch being executed; ping replies and shot packets go
    /// back to it.
    peer: Option<SocketAddr>,
    replies_enabled: bool,
}

impl<B, N, D, P> ProbeService<B, N, D, P>
where
    B: BusPort,
    N: DatagramPort,
    D: BoardPort,
    P: PacerPort,
{
    pub fn new(bus: B, net: N, board: D, pacer: P, config: ProbeConfig) -> Self {
        let policy = config.verify_policy;
        Self {
            bus,
            net,
            board,
            pacer,
            fabric: Fabric::new(policy),
            front_end: FrontEnd::new(policy),
            tx_driver: TxDriver::new(policy),
            pool: SlotPool::new(),
            config,
            peer: None,
            replies_enabled: false,
        }
    }

    // ── Session state ─────────────────────────────────────────

    /// Record where the current batch came from.
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = Some(peer);
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn replies_enabled(&self) -> bool {
        self.replies_enabled
    }

    /// Borrow the injected ports (mock inspection in tests).
    pub fn ports(&self) -> (&B, &N, &D, &P) {
        (&self.bus, &self.net, &self.board, &self.pacer)
    }

    // ── Bring-up ──────────────────────────────────────────────

    /// Full front-end bring-up: fabric handshake and defaults, supply
    /// rails, TX driver, AFE, then the automatic power-down posture.
    pub fn initialize(&mut self) -> Result<()> {
        info!("Initialising probe front end");

        // Reset the fabric and let its PLL settle.
        self.board.pulse_fabric_reset();
        self.board.delay_ms(10);
        debug!("Fabric reset");

        self.board.select_mux(MuxTarget::Fabric);
        self.board.delay_ms(10);
        self.fabric.init(&mut self.bus, &mut self.board)?;
        debug!("Configured fabric");

        // Pulser rails: ±HV first, then −5 V.
        self.board.set_power_domain(PowerDomain::PosHv, true);
        self.board.set_power_domain(PowerDomain::NegHv, true);
        self.board.delay_ms(100);
        self.board.set_power_domain(PowerDomain::Neg5V, true);
        self.board.delay_ms(100);
        debug!("Enabled power domains");

        // Hold AFE and TX in reset, release with TR_EN low, then gate the
        // AFE clock between shots.
        self.fabric
            .write_register_verified(&mut self.bus, 10, 0x0000_0057)?;
        self.board.delay_ms(10);
        self.fabric
            .write_register_verified(&mut self.bus, 10, 0x0000_0054)?;
        self.fabric
            .write_register_verified(&mut self.bus, 2, 0x4000_FFFF)?;
        debug!("Reset AFE and TX");

        self.board.select_mux(MuxTarget::TxDriver);
        self.board.delay_ms(10);
        self.tx_driver.init(&mut self.bus, &mut self.board)?;
        // Gate the TX beamformer clock as well (read-back is unreliable in
        // this mux position; a mismatch is expected noise).
        if let Err(e) = self
            .fabric
            .write_register_verified(&mut self.bus, 2, 0x0000_FFFF)
        {
            warn!("TX clock gating write failed: {e}");
        }
        debug!("Configured TX");

        self.board.select_mux(MuxTarget::FrontEnd);
        self.board.delay_ms(10);
        self.front_end.init(&mut self.bus, &mut self.board)?;
        self.front_end
            .test_pattern(&mut self.bus, &mut self.board, TestPattern::HalfZerosHalfOnes)?;
        // Fixed receive gain.
        self.front_end
            .write_tgc_register_verified(&mut self.bus, &mut self.board, 0xB5, 0)?;
        debug!("Configured AFE");

        self.board.select_mux(MuxTarget::Fabric);
        self.board.delay_ms(10);
        // Automatic AFE fast power-down and TR_EN duty cycling; global
        // power-down through the pin.
        self.fabric
            .write_register_verified(&mut self.bus, 10, 0x0000_0030)?;

        // Idle posture until the first trigger-shot raises it again.
        self.board.set_link_mode(LinkMode::LowPower)?;
        debug!("Low-power mode activated");

        info!("Probe front end initialised");
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Execute a batch in order, stopping at the first failure.
    pub fn execute_batch(&mut self, batch: &CommandBatch<'_>) -> Result<()> {
        for command in batch {
            self.execute_one(command)?;
        }
        Ok(())
    }

    /// Validate the args length contract, then run one handler.
    pub fn execute_one(&mut self, command: &Command<'_>) -> Result<()> {
        if command.args.len() < command.id.min_args_len() {
            warn!(
                "{:?}: {} args bytes, minimum is {}",
                command.id,
                command.args.len(),
                command.id.min_args_len()
            );
            return Err(DispatchError::InvalidArgument.into());
        }

        debug!("Executing {:?}", command.id);

        match command.id {
            CommandId::Ping => self.cmd_ping(),
            CommandId::EnableReplies => self.cmd_enable_replies(command.args),
            CommandId::SelectMux => self.cmd_select_mux(command.args),
            CommandId::WriteBus => self.cmd_write_bus(command.args),
            CommandId::WriteFabric => self.cmd_write_fabric(command.args),
            CommandId::WriteFrontEnd => self.cmd_write_front_end(command.args),
            CommandId::WriteTxDriver => self.cmd_write_tx_driver(command.args),
            CommandId::DelayNs => self.cmd_delay_ns(command.args),
            CommandId::SleepMs => self.cmd_sleep_ms(command.args),
            CommandId::SetPowerDomain => self.cmd_set_power_domain(command.args),
            CommandId::TriggerShot => self.cmd_trigger_shot(command.args),
        }
    }

    // ── Handlers ──────────────────────────────────────────────

    fn cmd_ping(&mut self) -> Result<()> {
        let peer = self.peer.ok_or(Error::Net(NetError::NotBound))?;
        let reply = format!("SonoProbe {}", self.config.probe_id);
        self.net.send_to(reply.as_bytes(), peer)?;
        Ok(())
    }

    fn cmd_enable_replies(&mut self, args: &[u8]) -> Result<()> {
        self.replies_enabled = args[0] != 0;
        Ok(())
    }

    fn cmd_select_mux(&mut self, args: &[u8]) -> Result<()> {
        match MuxTarget::from_u8(args[0]) {
            Some(target) => self.board.select_mux(target),
            None => warn!("{} is not a mux target", args[0]),
        }
        Ok(())
    }

    fn cmd_write_bus(&mut self, args: &[u8]) -> Result<()> {
        let mut rx = vec![0u8; args.len()];
        self.bus.transfer(args, &mut rx, true)?;
        Ok(())
    }

    fn cmd_write_fabric(&mut self, args: &[u8]) -> Result<()> {
        let addr = args[0];
        let value = u32::from_le_bytes([args[1], args[2], args[3], args[4]]);
        self.fabric
            .write_register_verified(&mut self.bus, addr, value)
    }

    fn cmd_write_front_end(&mut self, args: &[u8]) -> Result<()> {
        let tgc_space = args[0] != 0;
        let addr = args[1];
        let value = u16::from_le_bytes([args[2], args[3]]);

        if tgc_space {
            self.front_end
                .write_tgc_register(&mut self.bus, &mut self.board, addr, value)
        } else {
            self.front_end
                .write_register(&mut self.bus, &mut self.board, addr, value)
        }
    }

    fn cmd_write_tx_driver(&mut self, args: &[u8]) -> Result<()> {
        let addr = u16::from_le_bytes([args[0], args[1]]);
        let value = u32::from_le_bytes([args[2], args[3], args[4], args[5]]);
        self.tx_driver.write_register(&mut self.bus, addr, value)
    }

    fn cmd_delay_ns(&mut self, args: &[u8]) -> Result<()> {
        let ns = u32::from_le_bytes([args[0], args[1], args[2], args[3]]);
        self.board.delay_ns(ns);
        Ok(())
    }

    fn cmd_sleep_ms(&mut self, args: &[u8]) -> Result<()> {
        let ms = u32::from_le_bytes([args[0], args[1], args[2], args[3]]);
        self.board.delay_ms(ms);
        Ok(())
    }

    fn cmd_set_power_domain(&mut self, args: &[u8]) -> Result<()> {
        let enabled = args[1] != 0;
        match PowerDomain::from_u8(args[0]) {
            Some(domain) => self.board.set_power_domain(domain, enabled),
            None => warn!("{} is not a power domain", args[0]),
        }
        Ok(())
    }

    fn cmd_trigger_shot(&mut self, args: &[u8]) -> Result<()> {
        let plan = ShotPlan::parse(args);
        let report = self.trigger_shot(&plan)?;

        info!("Shot time:  {} ms", report.elapsed_ms);
        info!("Shot count: {}", report.shots_seen);
        Ok(())
    }
}
