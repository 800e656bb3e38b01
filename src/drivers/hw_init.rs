//! One-shot GPIO initialisation and raw pin helpers.
//!
//! Configures pin directions with raw ESP-IDF sys calls, called once from
//! `main()` before any task starts.  On non-espidf targets every helper is
//! an in-memory no-op so the adapters compile and run on the host.

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

// ── GPIO setup ────────────────────────────────────────────────

/// Every board-control output: mux routing, supply rails, fabric reset.
/// All driven low at boot (rails off, reset asserted is avoided by the
/// bring-up pulse, mux parked on the PLL position).
#[cfg(target_os = "espidf")]
const OUTPUT_PINS: [i32; 7] = [
    pins::MUX_A_GPIO,
    pins::MUX_B_GPIO,
    pins::FABRIC_RESET_GPIO,
    pins::POWER_NEG_5V_GPIO,
    pins::POWER_NEG_HV_GPIO,
    pins::POWER_POS_HV_GPIO,
    pins::POWER_LVDS_GPIO,
];

#[cfg(target_os = "espidf")]
pub fn init_gpio() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before any task starts.
    unsafe {
        for &pin in &OUTPUT_PINS {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode: gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            let ret = gpio_config(&cfg);
            if ret != ESP_OK {
                return Err(HwInitError::GpioConfigFailed(ret));
            }
            gpio_set_level(pin, 0);
        }

        // Fabric data-ready line: input, falling-edge interrupt.
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pins::FABRIC_INT_GPIO,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
        };
        let ret = gpio_config(&cfg);
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    log::info!("hw_init: GPIO configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): GPIO init skipped");
    Ok(())
}

/// Drive one output pin.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output in init_gpio().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

/// Install the shared GPIO ISR service (needed before any per-pin handler).
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before handlers are added.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK {
        return Err(HwInitError::IsrInstallFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    Ok(())
}
