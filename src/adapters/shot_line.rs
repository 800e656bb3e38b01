//! Fabric data-ready line.
//!
//! The fabric pulls its INT line low once per shot when a packet is staged.
//! The interrupt handler increments the shot counter and raises the ready
//! condition; the orchestrator consumes the condition through
//! [`ShotPacer`], which waits with an explicit timeout so a silent fabric
//! cannot hang the worker task.

use core::sync::atomic::{AtomicU16, Ordering};
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future::{block_on, or};

use crate::app::ports::PacerPort;
use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Shared interrupt state
// ───────────────────────────────────────────────────────────────

/// Interrupt-side state: one counter, one binary condition.
///
/// Lives in a `static` so the ISR can reach it; everything inside is
/// interrupt-safe.
pub struct ShotLine {
    ready: Signal<CriticalSectionRawMutex, ()>,
    count: AtomicU16,
}

impl ShotLine {
    pub const fn new() -> Self {
        Self {
            ready: Signal::new(),
            count: AtomicU16::new(0),
        }
    }

    /// Interrupt handler body: count the shot, raise the condition.
    pub fn on_trigger(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.ready.signal(());
    }

    pub fn shot_count(&self) -> u16 {
        self.count.load(Ordering::Relaxed)
    }

    /// Zero the counter and clear a stale condition.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.ready.reset();
    }

    /// Block until the condition is raised (consuming it) or the timeout
    /// elapses.
    fn wait(&self, timeout_ms: u32) -> Result<()> {
        let ready = async {
            self.ready.wait().await;
            Ok(())
        };
        let deadline = async {
            async_io_mini::Timer::after(Duration::from_millis(timeout_ms as u64)).await;
            Err(Error::ReadyTimeout)
        };
        block_on(or(ready, deadline))
    }
}

impl Default for ShotLine {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// PacerPort adapter
// ───────────────────────────────────────────────────────────────

/// [`PacerPort`] over a shared [`ShotLine`]; the ISR holds the other
/// reference.
pub struct ShotPacer {
    line: &'static ShotLine,
}

impl ShotPacer {
    pub fn new(line: &'static ShotLine) -> Self {
        Self { line }
    }
}

impl PacerPort for ShotPacer {
    fn wait_ready(&mut self, timeout_ms: u32) -> Result<()> {
        self.line.wait(timeout_ms)
    }

    fn shot_count(&self) -> u16 {
        self.line.shot_count()
    }

    fn reset(&mut self) {
        self.line.reset();
    }
}

// ───────────────────────────────────────────────────────────────
// Interrupt attachment (falling edge)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn attach_interrupt(line: &'static ShotLine) -> Result<()> {
    unsafe extern "C" fn trampoline(arg: *mut core::ffi::c_void) {
        // SAFETY: arg is the &'static ShotLine registered below; on_trigger
        // only touches interrupt-safe state.
        let line = unsafe { &*(arg.cast::<ShotLine>()) };
        line.on_trigger();
    }

    // SAFETY: the ISR service is installed during hw_init; the pin was
    // configured for falling-edge interrupts.
    let ret = unsafe {
        esp_idf_svc::sys::gpio_isr_handler_add(
            crate::pins::FABRIC_INT_GPIO,
            Some(trampoline),
            core::ptr::from_ref(line).cast_mut().cast(),
        )
    };
    if ret != esp_idf_svc::sys::ESP_OK {
        log::error!("fabric INT handler add failed (rc={ret})");
        return Err(Error::Init("fabric interrupt attach failed"));
    }
    Ok(())
}
