//! Board-level control adapter.
//!
//! Implements [`BoardPort`] over the mux and power-rail GPIOs, the fabric
//! reset line, the radio power-save switch, and the monotonic clock.  GPIO
//! writes go through [`hw_init`](crate::drivers::hw_init), which no-ops on
//! the host so the adapter runs in simulation unchanged.

use log::debug;

use crate::app::ports::{BoardPort, LinkMode, MuxTarget, PowerDomain};
use crate::drivers::hw_init;
use crate::error::Error;
use crate::pins;

pub struct Board {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Board {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardPort for Board {
    fn select_mux(&mut self, target: MuxTarget) {
        // Two routing bits, decoded per the carrier board's mux wiring.
        let (a, b) = match target {
            MuxTarget::Pll => (false, false),
            MuxTarget::Fabric => (true, false),
            MuxTarget::FrontEnd => (false, true),
            MuxTarget::TxDriver => (true, true),
        };
        hw_init::gpio_write(pins::MUX_A_GPIO, a);
        hw_init::gpio_write(pins::MUX_B_GPIO, b);
        debug!("SPI mux -> {target:?}");
    }

    fn set_power_domain(&mut self, domain: PowerDomain, enabled: bool) {
        let pin = match domain {
            PowerDomain::Lvds2V5 => pins::POWER_LVDS_GPIO,
            PowerDomain::PosHv => pins::POWER_POS_HV_GPIO,
            PowerDomain::NegHv => pins::POWER_NEG_HV_GPIO,
            PowerDomain::Neg5V => pins::POWER_NEG_5V_GPIO,
            PowerDomain::PllPwd => {
                log::warn!("PLL power-down is not wired on this board revision");
                return;
            }
        };
        hw_init::gpio_write(pin, enabled);
        debug!("Power domain {domain:?} -> {enabled}");
    }

    fn pulse_fabric_reset(&mut self) {
        hw_init::gpio_write(pins::FABRIC_RESET_GPIO, false);
        self.delay_ms(10);
        hw_init::gpio_write(pins::FABRIC_RESET_GPIO, true);
    }

    #[cfg(target_os = "espidf")]
    fn set_link_mode(&mut self, mode: LinkMode) -> Result<(), Error> {
        let ps = match mode {
            LinkMode::HighThroughput => esp_idf_svc::sys::wifi_ps_type_t_WIFI_PS_NONE,
            LinkMode::LowPower => esp_idf_svc::sys::wifi_ps_type_t_WIFI_PS_MIN_MODEM,
        };
        // SAFETY: WiFi is started before the worker task runs.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_set_ps(ps) };
        if ret != esp_idf_svc::sys::ESP_OK {
            log::error!("esp_wifi_set_ps failed (rc={ret})");
            return Err(Error::Init("radio power-save switch failed"));
        }
        debug!("Link mode -> {mode:?}");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_link_mode(&mut self, mode: LinkMode) -> Result<(), Error> {
        debug!("Link mode -> {mode:?} (sim)");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        // Sub-microsecond accuracy is not achievable here; round up.
        unsafe { esp_idf_svc::sys::esp_rom_delay_us(ns.div_ceil(1000)) };
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }

    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
