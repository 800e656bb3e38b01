//! Transmit-driver (pulser) chip driver.
//!
//! The TX chip takes 42-bit register packets: a 10-bit address, a 32-bit
//! value, left-aligned into a 48-bit (6-byte) SPI frame.  Reads are
//! two-phase: the read-enable command latches half the register onto the
//! output shifter per phase, and the halves are OR-combined.

use log::{debug, error};

use crate::app::ports::{BoardPort, BusPort};
use crate::config::VerifyPolicy;
use crate::error::{Error, Result};

/// 42-bit packets ride in 48-bit (6-byte) SPI frames.
const XFER_PACK_LEN: usize = 6;

/// Settle delay between read phases.
const READ_SETTLE_NS: u32 = 500_000;

// Pattern-generator output levels.
const LVL_PHV: u32 = 0b010;
const LVL_ZERO: u32 = 0b011;
const LVL_MHV: u32 = 0b001;
const LVL_TERMINATE: u32 = 0b111;

// Read-enable phases, written as values to register 0.
const CMD_READEN_0: u32 = 0;
const CMD_READEN_1: u32 = 1 << 1;
const CMD_READEN_2: u32 = 1 << 2;

/// Pack an address/value pair into the left-aligned 48-bit frame.
fn pack_frame(addr: u16, value: u32) -> [u8; XFER_PACK_LEN] {
    let packet = (((addr as u64) << 32) | value as u64) << 6;
    let mut frame = [0u8; XFER_PACK_LEN];
    for (i, byte) in frame.iter_mut().enumerate() {
        *byte = (packet >> (8 * (XFER_PACK_LEN - 1 - i))) as u8;
    }
    frame
}

/// Recover one read phase from a received frame (still left-aligned).
fn unpack_phase(rx: &[u8; XFER_PACK_LEN]) -> u64 {
    let mut value = ((rx[1] & 0b11_1111) as u64) << 32;
    value |= (rx[2] as u64) << 24;
    value |= (rx[3] as u64) << 16;
    value |= (rx[4] as u64) << 8;
    value |= rx[5] as u64;
    value
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct TxDriver {
    policy: VerifyPolicy,
}

impl TxDriver {
    pub fn new(policy: VerifyPolicy) -> Self {
        Self { policy }
    }

    /// Write one register.
    pub fn write_register<B: BusPort>(&self, bus: &mut B, addr: u16, value: u32) -> Result<()> {
        let tx = pack_frame(addr, value);
        let mut rx = [0u8; XFER_PACK_LEN];

        bus.transfer(&tx, &mut rx, true)?;

        Ok(())
    }

    /// Read one register via the two read-enable phases.
    pub fn read_register<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u16,
    ) -> Result<u32> {
        let probe = pack_frame(addr, 0);
        let mut rx = [0u8; XFER_PACK_LEN];

        self.write_register(bus, 0, CMD_READEN_1)?;
        board.delay_ns(READ_SETTLE_NS);
        bus.transfer(&probe, &mut rx, true)?;
        let phase_1 = unpack_phase(&rx);

        self.write_register(bus, 0, CMD_READEN_2)?;
        board.delay_ns(READ_SETTLE_NS);
        bus.transfer(&probe, &mut rx, true)?;
        let phase_2 = unpack_phase(&rx);

        board.delay_ns(READ_SETTLE_NS);
        self.write_register(bus, 0, CMD_READEN_0)?;

        Ok(((phase_1 >> 6) | (phase_2 >> 6)) as u32)
    }

    /// Write a register and compare the read-back.
    pub fn write_register_verified<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u16,
        value: u32,
    ) -> Result<()> {
        self.write_register(bus, addr, value)?;
        let read = self.read_register(bus, board, addr)?;

        if read != value {
            error!("TX reg 0x{addr:03X}: expected 0x{value:08X}, got 0x{read:08X}");
            if self.policy == VerifyPolicy::Strict {
                return Err(Error::VerifyMismatch {
                    addr,
                    expected: value,
                    read,
                });
            }
        } else {
            debug!("TX 0x{value:08X} at 0x{addr:03X} OK");
        }

        Ok(())
    }

    /// Bring-up: channel delays, pattern profile, dynamic power mode,
    /// turn-on delays, then beamformer mode.
    pub fn init<B: BusPort, D: BoardPort>(&self, bus: &mut B, board: &mut D) -> Result<()> {
        // Set delays for all the channels to 0.
        for addr in 0x20..=0x2F {
            self.write_register_verified(bus, board, addr, 0)?;
        }
        // Write pattern profile, then TX_BF_MODE = 1.
        self.write_register_verified(bus, board, 0x120, 0x78)?;
        self.write_register_verified(bus, board, 0x18, 1)?;

        // Wait at least 200 beamformer clocks.
        board.delay_ms(1);

        // Software reset.
        self.write_register_verified(bus, board, 0x00, 1)?;

        // Dynamic power mode: EN_DYN_LDO = 1.
        self.write_register_verified(bus, board, 0x19, 1 << 30)?;
        board.delay_ms(1);
        // DIS_DYN_CNTRL_1 = 0, DIS_DYN_CTRL_2 = 0.
        self.write_register_verified(bus, board, 0x0F, 0)?;
        self.write_register_verified(bus, board, 0x06, 0)?;

        // Drive strength controlled by register, 0.6 A.
        self.write_register_verified(bus, board, 0x17, 6 << 2)?;

        // Pattern profile 1: 100 MHz beamformer clock, 8.2 MHz output pulse.
        let mut pat_reg: u32 = 0;
        // LVL_1 = 0, PER_1 = 0
        pat_reg |= LVL_ZERO | (0 << 3);
        // LVL_2 = +HV, PER_2 = 4
        pat_reg |= (LVL_PHV << 8) | (4 << 11);
        // LVL_3 = -HV, PER_3 = 4
        pat_reg |= (LVL_MHV << 16) | (4 << 19);
        // LVL_4 = +HV, PER_4 = 4
        pat_reg |= (LVL_PHV << 24) | (4 << 27);
        self.write_register_verified(bus, board, 0x120, pat_reg)?;
        self.write_register_verified(bus, board, 0x124, pat_reg)?;

        let mut pat_reg: u32 = 0;
        // LVL_5 = -HV, PER_5 = 4
        pat_reg |= LVL_MHV | (4 << 3);
        // LVL_6 = 0, PER_6 = 4
        pat_reg |= (LVL_ZERO << 8) | (4 << 11);
        // LVL_7 = terminate, PER_7 = 0
        pat_reg |= (LVL_TERMINATE << 16) | (0 << 19);
        self.write_register_verified(bus, board, 0x121, pat_reg)?;
        self.write_register_verified(bus, board, 0x125, pat_reg)?;

        // Select pattern profile 1 for channel groups 1 and 2.
        self.write_register_verified(bus, board, 0x1F, 1)?;
        self.write_register_verified(bus, board, 0x1E, 1)?;

        // LOAD_PROF = 1.
        self.write_register_verified(bus, board, 0x00, 1 << 2)?;

        // Turn-on delays (4 * reg_val + 5 + 2) for all four channel groups.
        self.write_register_verified(bus, board, 0x15, (70 << 16) | 70)?;
        self.write_register_verified(bus, board, 0x16, (70 << 16) | 70)?;

        // TX_BF_MODE = 1, TX_START_DELAY for a minimum 2 µs delay, and
        // TR_SW_DEL_MODE so the T/R switch engages at pattern end.
        self.write_register_verified(bus, board, 0x18, 0x008C_0003)?;

        Ok(())
    }
}
