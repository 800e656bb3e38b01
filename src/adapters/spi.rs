//! SPI bus adapter for the fabric link.
//!
//! - **`target_os = "espidf"`** — wraps an `esp-idf-hal` SPI device.  The
//!   IDF master API is blocking, so a `wait = false` transfer completes
//!   eagerly and `await_completion` is trivially satisfied; the `BusPort`
//!   contract (completion before the receive buffer is read) still holds.
//! - **host** — a simulation bus that clocks in zeros, used when the
//!   library runs without hardware.  Tests use their own recording mocks.

use crate::app::ports::BusPort;
use crate::error::BusError;

// ── ESP-IDF implementation ────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct EspSpiBus {
    device: esp_idf_hal::spi::SpiDeviceDriver<'static, esp_idf_hal::spi::SpiDriver<'static>>,
}

#[cfg(target_os = "espidf")]
impl EspSpiBus {
    pub fn new(
        device: esp_idf_hal::spi::SpiDeviceDriver<'static, esp_idf_hal::spi::SpiDriver<'static>>,
    ) -> Self {
        Self { device }
    }
}

#[cfg(target_os = "espidf")]
impl BusPort for EspSpiBus {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], _wait: bool) -> Result<(), BusError> {
        self.device.transfer(rx, tx).map_err(|e| {
            log::error!("SPI transfer failed: {e}");
            BusError::TransferFailed
        })
    }

    fn await_completion(&mut self) -> Result<(), BusError> {
        Ok(())
    }
}

// ── Host simulation ───────────────────────────────────────────

/// Simulation bus: every transfer succeeds and clocks in zeros.
#[cfg(not(target_os = "espidf"))]
pub struct SimSpiBus {
    in_flight: bool,
}

#[cfg(not(target_os = "espidf"))]
impl SimSpiBus {
    pub fn new() -> Self {
        Self { in_flight: false }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimSpiBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl BusPort for SimSpiBus {
    fn transfer(&mut self, _tx: &[u8], rx: &mut [u8], wait: bool) -> Result<(), BusError> {
        rx.fill(0);
        self.in_flight = !wait;
        Ok(())
    }

    fn await_completion(&mut self) -> Result<(), BusError> {
        if !self.in_flight {
            return Err(BusError::NotStarted);
        }
        self.in_flight = false;
        Ok(())
    }
}
