//! Analog-front-end driver.
//!
//! The AFE carries the LNA/VCA analog chain and the 16-channel ADC bank.
//! Its register file is reached with 3-byte SPI frames (`addr, value-hi,
//! value-lo`); global register 0 gates the two special access modes:
//! read-enable, and writes into the separate TGC register space.
//!
//! Every frame is followed by a settle delay — the chip needs time to
//! latch before the next transaction.

use log::{debug, error};

use crate::app::ports::{BoardPort, BusPort};
use crate::config::VerifyPolicy;
use crate::error::{Error, Result};

// Global register 0 bits.
const TGC_WR_EN: u16 = 0x10;
const REG_READ_EN: u16 = 0x02;

// PLL reset bits of ADC registers 0x41/0x42.
const ADC_PLL_RST: u16 = 0x4000;

/// Settle delay after each SPI frame.
const XFER_SETTLE_NS: u32 = 500_000;

/// Digital output test patterns of the ADC bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TestPattern {
    /// No test pattern.
    NormalOperation = 0,
    /// Word replaced by half ones, half zeros (sync).
    HalfZerosHalfOnes = 1,
    /// Alternating zeros and ones (deskew).
    AlternatingZeroOne = 2,
    /// Not supported.
    Custom = 3,
    AllOnes = 4,
    /// All ones, then all zeros.
    Toggle = 5,
    AllZeros = 6,
    /// Output increments every conversion clock, then decrements.
    Ramp = 7,
}

/// ADC and VCA register defaults at bring-up, `(address, value)`.
const ADC_VCA_INIT_SEQ: [(u8, u16); 79] = [
    // Global register.
    (0x00, 0x0000),
    // Standard LVDS rate, LVDS enabled, no global power-down.
    (0x01, 0x0000),
    // No test patterns.
    (0x02, 0x0000),
    // SER_DATA_RATE = 10x, digital gain disabled, no offset.
    (0x03, 0x6008),
    // 10-bit resolution, MSB first, two's complement.
    (0x04, 0x0003),
    (0x05, 0x0000),
    (0x07, 0x0000),
    (0x08, 0x0000),
    // ADC low-power mode.
    (0x0B, 0x0800),
    // Default digital gain/offset for ADC 1-4 odd and even.
    (0x0D, 0x0000),
    (0x0E, 0x0000),
    (0x0F, 0x0000),
    (0x10, 0x0000),
    (0x11, 0x0000),
    (0x12, 0x0000),
    (0x13, 0x0000),
    (0x14, 0x0000),
    // LVDS 1-4: test patterns off, power-down off.
    (0x15, 0x0000),
    (0x17, 0x0000),
    (0x18, 0x0000),
    // Default digital gain/offset for ADC 5-8 odd and even.
    (0x19, 0x0000),
    (0x1A, 0x0000),
    (0x1B, 0x0000),
    (0x1C, 0x0000),
    (0x1D, 0x0000),
    (0x1E, 0x0000),
    (0x1F, 0x0000),
    (0x20, 0x0000),
    // LVDS 5-8: test patterns off, power-down off.
    (0x21, 0x0000),
    (0x23, 0x0000),
    (0x24, 0x0000),
    // Default digital gain/offset for ADC 9-12 odd and even.
    (0x25, 0x0000),
    (0x26, 0x0000),
    (0x27, 0x0000),
    (0x28, 0x0000),
    (0x29, 0x0000),
    (0x2A, 0x0000),
    (0x2B, 0x0000),
    (0x2C, 0x0000),
    // LVDS 9-12: test patterns off, power-down off.
    (0x2D, 0x0000),
    (0x2F, 0x0000),
    (0x30, 0x0000),
    // Default digital gain/offset for ADC 13-16 odd and even.
    (0x31, 0x0000),
    (0x32, 0x0000),
    (0x33, 0x0000),
    (0x34, 0x0000),
    (0x35, 0x0000),
    (0x36, 0x0000),
    (0x37, 0x0000),
    (0x38, 0x0000),
    // LVDS 13-16: test patterns off, power-down off.
    (0x39, 0x0000),
    (0x3B, 0x0000),
    (0x3C, 0x0000),
    // PLL resets inactive, LVDS DCLK delay default.
    (0x41, 0x0000),
    (0x42, 0x0000),
    (0x43, 0x0000),
    // VCA registers.
    (0xC0, 0x0000),
    (0xC1, 0x0000),
    (0xC2, 0x0000),
    (0xC3, 0x0000),
    (0xC4, 0x0000),
    // Per-channel and global power-down defaults.
    (0xC5, 0x0000),
    (0xC6, 0x0000),
    // PGA gain 27 dB, LNA gain 21 dB.
    (0xC7, 0x0005),
    // Low-power VCA mode.
    (0xC8, 0x0001),
    (0xCA, 0x0000),
    (0xCB, 0x0000),
    (0xCC, 0x0000),
    (0xCD, 0x0000),
    // Channels 17-32 power-down default.
    (0xCE, 0x0000),
    (0xD0, 0x0000),
    (0xD1, 0x0007),
    (0xD4, 0x0001),
    // Temperature sensor disabled.
    (0xE0, 0x0000),
    // Default TGC profile settings.
    (0xF9, 0x0000),
    (0xFA, 0x0000),
    (0xFB, 0x0000),
    (0xFC, 0x0000),
    (0xFD, 0x0000),
];

/// TGC-space register defaults at bring-up: start/stop gain, step, index and
/// gain-time pairs for profiles 0-3, then manual-gain and fixed-gain mode.
const TGC_INIT_SEQ: [(u8, u16); 23] = [
    (0xA1, 0x0000),
    (0xA2, 0x0000),
    (0xA3, 0x0000),
    (0xA4, 0x0000),
    (0xA5, 0x0000),
    (0xA6, 0x0000),
    (0xA7, 0x0000),
    (0xA8, 0x0000),
    (0xA9, 0x0000),
    (0xAA, 0x0000),
    (0xAB, 0x0000),
    (0xAC, 0x0000),
    (0xAD, 0x0000),
    (0xAE, 0x0000),
    (0xAF, 0x0000),
    (0xB0, 0x0000),
    (0xB1, 0x0000),
    (0xB2, 0x0000),
    (0xB3, 0x0000),
    (0xB4, 0x0000),
    // Manual-gain TGC is the default.
    (0xB5, 0x0000),
    // Programmable fixed-gain mode.
    (0xB6, 0x8000),
    (0xB7, 0x8000),
];

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct FrontEnd {
    policy: VerifyPolicy,
}

impl FrontEnd {
    pub fn new(policy: VerifyPolicy) -> Self {
        Self { policy }
    }

    /// Write one register in the plain space.
    pub fn write_register<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u8,
        value: u16,
    ) -> Result<()> {
        let tx = [addr, (value >> 8) as u8, value as u8];
        let mut rx = [0u8; 3];

        bus.transfer(&tx, &mut rx, true)?;
        board.delay_ns(XFER_SETTLE_NS);

        Ok(())
    }

    /// Read one register in the plain space.
    pub fn read_register<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u8,
    ) -> Result<u16> {
        self.write_register(bus, board, 0, REG_READ_EN)?;

        let tx = [addr, 0, 0];
        let mut rx = [0u8; 3];
        bus.transfer(&tx, &mut rx, true)?;
        board.delay_ns(XFER_SETTLE_NS);

        self.write_register(bus, board, 0, 0)?;

        Ok(u16::from_be_bytes([rx[1], rx[2]]))
    }

    /// Write a plain-space register and compare the read-back.
    pub fn write_register_verified<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u8,
        value: u16,
    ) -> Result<()> {
        self.write_register(bus, board, addr, value)?;
        let read = self.read_register(bus, board, addr)?;

        if read != value {
            error!("AFE reg 0x{addr:02X}: expected 0x{value:04X}, got 0x{read:04X}");
            if self.policy == VerifyPolicy::Strict {
                return Err(Error::VerifyMismatch {
                    addr: addr as u16,
                    expected: value as u32,
                    read: read as u32,
                });
            }
        } else {
            debug!("AFE 0x{value:04X} at 0x{addr:02X} OK");
        }

        Ok(())
    }

    /// Write one register in the TGC space (gated by global register 0).
    pub fn write_tgc_register<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u8,
        value: u16,
    ) -> Result<()> {
        self.write_register(bus, board, 0, TGC_WR_EN)?;

        let tx = [addr, (value >> 8) as u8, value as u8];
        let mut rx = [0u8; 3];
        bus.transfer(&tx, &mut rx, true)?;
        board.delay_ns(XFER_SETTLE_NS);

        self.write_register(bus, board, 0, 0)?;

        Ok(())
    }

    /// Read one register in the TGC space.
    pub fn read_tgc_register<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u8,
    ) -> Result<u16> {
        self.write_register(bus, board, 0, REG_READ_EN | TGC_WR_EN)?;

        let tx = [addr, 0, 0];
        let mut rx = [0u8; 3];
        bus.transfer(&tx, &mut rx, true)?;
        board.delay_ns(XFER_SETTLE_NS);

        self.write_register(bus, board, 0, TGC_WR_EN)?;

        Ok(u16::from_be_bytes([rx[1], rx[2]]))
    }

    /// Write a TGC-space register and compare the read-back.
    pub fn write_tgc_register_verified<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        addr: u8,
        value: u16,
    ) -> Result<()> {
        self.write_tgc_register(bus, board, addr, value)?;
        let read = self.read_tgc_register(bus, board, addr)?;

        if read != value {
            error!("AFE TGC reg 0x{addr:02X}: expected 0x{value:04X}, got 0x{read:04X}");
            if self.policy == VerifyPolicy::Strict {
                return Err(Error::VerifyMismatch {
                    addr: addr as u16,
                    expected: value as u32,
                    read: read as u32,
                });
            }
        } else {
            debug!("AFE TGC 0x{value:04X} at 0x{addr:02X} OK");
        }

        Ok(())
    }

    /// Bring-up: ADC/VCA defaults, TGC defaults, then a PLL reset pulse.
    pub fn init<B: BusPort, D: BoardPort>(&self, bus: &mut B, board: &mut D) -> Result<()> {
        for (addr, value) in ADC_VCA_INIT_SEQ {
            self.write_register_verified(bus, board, addr, value)?;
        }

        for (addr, value) in TGC_INIT_SEQ {
            self.write_tgc_register_verified(bus, board, addr, value)?;
        }

        // Pulse the ADC PLL reset bits.
        self.write_register(bus, board, 0x41, ADC_PLL_RST)?;
        self.write_register(bus, board, 0x42, ADC_PLL_RST)?;
        board.delay_ns(500_000);
        self.write_register(bus, board, 0x41, ADC_PLL_RST)?;
        self.write_register(bus, board, 0x42, ADC_PLL_RST)?;
        board.delay_ns(500_000);

        Ok(())
    }

    /// Select a digital test pattern, preserving the other bits of the
    /// pattern register.
    pub fn test_pattern<B: BusPort, D: BoardPort>(
        &self,
        bus: &mut B,
        board: &mut D,
        pattern: TestPattern,
    ) -> Result<()> {
        let mut value = self.read_register(bus, board, 0x02)?;
        value |= (pattern as u16) << 7;
        self.write_register(bus, board, 0x02, value)?;

        Ok(())
    }
}
