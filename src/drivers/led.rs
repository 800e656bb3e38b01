//! Discrete status LED driver.
//!
//! The probe carries two indicator LEDs: red is lit while a command batch
//! executes, green once the network link is up.  Generic over any
//! `embedded-hal` output pin, so tests drive it with an in-memory pin.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct Led<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Led<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            warn!("status LED pin write failed");
        }
        self.on = on;
    }

    pub fn toggle(&mut self) {
        self.set(!self.on);
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
