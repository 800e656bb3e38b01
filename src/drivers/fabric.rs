//! Controller-fabric driver.
//!
//! The fabric sits between the firmware and the acquisition chain: it owns
//! the sample FIFOs, the shot sequencer, and a small register file reached
//! through its internal SPI slave.  Every frame starts with an opcode byte
//! and a dummy address byte; register traffic goes through the memory
//! controller sub-commands, sequencer control through register 0.
//!
//! Register writes used during bring-up are verified: write, flush, read
//! back, compare.  What a mismatch does is decided by the configured
//! [`VerifyPolicy`].

use log::{error, warn};

use crate::app::ports::{BoardPort, BusPort};
use crate::config::VerifyPolicy;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// SPI frame opcodes
// ---------------------------------------------------------------------------

/// Read the fabric configuration register.
const OP_READ_CFG: u8 = 1;
/// Write the fabric configuration register.
const OP_WRITE_CFG: u8 = 2;
/// Stream bytes out of the sample FIFO.
pub(crate) const OP_READ_FIFO: u8 = 16;
/// Push a command frame into the control FIFO.
const OP_WRITE_FIFO: u8 = 17;
/// Filler for the address byte of FIFO frames.
pub(crate) const DUMMY_ADDR: u8 = 0;

// Memory-controller sub-commands (third frame byte).
const MEM_WRITE: u8 = 1;
const MEM_READ: u8 = 0;

// System-control commands, written as values to register 0.
const SYS_START: u32 = 1;
const SYS_RESET: u32 = 2;
const SYS_READ_ENABLE: u32 = 3;

/// Expected configuration register value after the bring-up handshake.
const CFG_EXPECTED: u8 = 6;

/// Number of registers configured to defaults at bring-up.
const NUM_DEFAULT_REGS: usize = 10;

/// Default register file at bring-up, `(address, value)`.
const DEFAULT_REGS: [(u8, u32); NUM_DEFAULT_REGS] = [
    // PLL settings: all clock muxes in the low-frequency position,
    // PLL outputs for the TX and AFE clocks turned on.
    (1, 0x0000_0050),
    // Enable all channels; TX and AFE clocks permanently on.
    (2, 0xC000_FFFF),
    // PRF period corresponding to 666 Hz (faster sync; 900 Hz and above
    // does not lock).
    (3, 0x3A98_6420),
    (4, 0x001E_01F4),
    (5, 0x0000_1792),
    (6, 0x0000_0002),
    // Double the acquisition depth of the previous settings.
    (7, 0x0000_02F8),
    (8, 0x0000_0008),
    (9, 0x0000_001E),
    // AFE and TX resets inactive; global and fast power-down pins under
    // register control and low; TR_EN driven by the fabric, low.
    (10, 0x0000_0054),
];

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct Fabric {
    policy: VerifyPolicy,
}

impl Fabric {
    pub fn new(policy: VerifyPolicy) -> Self {
        Self { policy }
    }

    /// Write one register through the memory controller.
    ///
    /// Returns the fabric's answer byte from the same frame.
    pub fn write_register<B: BusPort>(&self, bus: &mut B, addr: u8, value: u32) -> Result<u8> {
        let mut tx = [0u8; 8];
        let mut rx = [0u8; 8];
        tx[0] = OP_WRITE_FIFO;
        tx[1] = DUMMY_ADDR;
        tx[2] = MEM_WRITE;
        tx[3] = addr;
        tx[4..8].copy_from_slice(&value.to_le_bytes());

        bus.transfer(&tx, &mut rx, true)?;

        Ok(rx[2])
    }

    /// Queue a register read; the value arrives with the next FIFO read.
    fn send_read_register<B: BusPort>(&self, bus: &mut B, addr: u8) -> Result<()> {
        let mut tx = [0u8; 8];
        let mut rx = [0u8; 8];
        tx[0] = OP_WRITE_FIFO;
        tx[1] = DUMMY_ADDR;
        tx[2] = MEM_READ;
        tx[3] = addr;

        bus.transfer(&tx, &mut rx, true)?;

        Ok(())
    }

    /// Clock `rx.len()` bytes out of the sample FIFO.
    fn read_fifo<B: BusPort>(&self, bus: &mut B, rx: &mut [u8]) -> Result<()> {
        let mut tx = [0u8; 10];
        debug_assert!(rx.len() <= tx.len());
        tx[0] = OP_READ_FIFO;
        tx[1] = DUMMY_ADDR;

        bus.transfer(&tx[..rx.len()], rx, true)?;

        Ok(())
    }

    /// Read one register through the memory controller.
    pub fn read_register<B: BusPort>(&self, bus: &mut B, addr: u8) -> Result<u32> {
        self.send_read_register(bus, addr)?;

        let mut rx = [0u8; 10];
        self.read_fifo(bus, &mut rx)?;

        Ok(u32::from_le_bytes([rx[2], rx[3], rx[4], rx[5]]))
    }

    /// Write a register, read it back, and compare.
    pub fn write_register_verified<B: BusPort>(
        &self,
        bus: &mut B,
        addr: u8,
        value: u32,
    ) -> Result<()> {
        self.write_register(bus, addr, value)?;
        // Flush the answer path before queueing the read-back.
        self.write_register(bus, 0, 0)?;
        self.drain_tx_fifo(bus)?;

        let read = self.read_register(bus, addr)?;
        if read != value {
            error!("Fabric reg 0x{addr:02X}: expected 0x{value:08X}, got 0x{read:08X}");
            if self.policy == VerifyPolicy::Strict {
                return Err(Error::VerifyMismatch {
                    addr: addr as u16,
                    expected: value,
                    read,
                });
            }
        }

        Ok(())
    }

    /// Write the fabric configuration register.
    pub fn write_cfg<B: BusPort>(&self, bus: &mut B, value: u8) -> Result<()> {
        let tx = [OP_WRITE_CFG, value];
        let mut rx = [0u8; 2];

        bus.transfer(&tx, &mut rx, true)?;

        Ok(())
    }

    /// Read the fabric configuration register.
    pub fn read_cfg<B: BusPort>(&self, bus: &mut B) -> Result<u8> {
        let tx = [OP_READ_CFG, DUMMY_ADDR, 0];
        let mut rx = [0u8; 3];

        bus.transfer(&tx, &mut rx, true)?;

        Ok(rx[2])
    }

    /// Bring-up: CFG handshake, then the default register file.
    ///
    /// The CFG mismatch is a hard error regardless of policy — if the
    /// handshake fails, nothing else on this link can be trusted.
    pub fn init<B: BusPort, D: BoardPort>(&self, bus: &mut B, board: &mut D) -> Result<()> {
        self.write_cfg(bus, CFG_EXPECTED)?;
        board.delay_ms(1);
        let answer = self.read_cfg(bus)?;
        board.delay_ms(1);
        if (answer & 0b111) != CFG_EXPECTED {
            warn!("Fabric CFG reg expected {CFG_EXPECTED}, got {}", answer & 0b111);
            return Err(Error::Init("fabric CFG handshake failed"));
        }

        for (addr, value) in DEFAULT_REGS {
            self.write_register_verified(bus, addr, value)?;
            board.delay_ms(1);
        }

        Ok(())
    }

    /// Start the shot sequencer.
    pub fn start_sequencer<B: BusPort>(&self, bus: &mut B) -> Result<()> {
        self.write_register(bus, 0, SYS_START)?;
        Ok(())
    }

    /// Reset the multi-FIFO pipeline between shots.
    pub fn reset_pipeline<B: BusPort>(&self, bus: &mut B) -> Result<()> {
        self.write_register(bus, 0, SYS_RESET)?;
        Ok(())
    }

    /// Let the fabric push the staged packet into its SPI transmit buffer.
    pub fn enable_read<B: BusPort>(&self, bus: &mut B) -> Result<()> {
        self.write_register(bus, 0, SYS_READ_ENABLE)?;
        Ok(())
    }

    /// Discard whatever sits in the fabric's SPI transmit buffer.
    pub fn drain_tx_fifo<B: BusPort>(&self, bus: &mut B) -> Result<()> {
        let mut rx = [0u8; 10];
        self.read_fifo(bus, &mut rx)
    }
}
