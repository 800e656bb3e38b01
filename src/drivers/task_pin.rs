//! Core-pinned thread spawning for the ESP32-S3 dual-core.
//!
//! ESP-IDF implements `std::thread` on top of FreeRTOS tasks, and
//! `esp_pthread_set_cfg()` decides core affinity, priority and stack size
//! for the *next* spawn from the calling thread — so the config/spawn pair
//! below must not interleave with other thread creation.  On non-ESP
//! targets this degrades to a plain named thread.

use core::ffi::CStr;

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU), shared with the WiFi/lwIP stacks.  The command
    /// receiver lives here, next to the network driver.
    Pro = 0,
    /// Core 1 (APP_CPU).  The command worker and the shot loop.
    App = 1,
}

/// Spawn `f` on a thread pinned to `core` with the given FreeRTOS priority
/// and stack size.
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static CStr,
    f: impl FnOnce() + Send + 'static,
) -> std::thread::JoinHandle<()> {
    let display_name = name.to_str().unwrap_or("task");

    configure_next_spawn(core, priority, stack_kb, name);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .expect("spawn_on_core: thread creation failed")
}

#[cfg(target_os = "espidf")]
fn configure_next_spawn(core: Core, priority: u8, stack_kb: usize, name: &'static CStr) {
    // SAFETY: the config is thread-local to this spawner and consumed by
    // the pthread_create inside std::thread::spawn.
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr();
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        assert!(
            ret == esp_idf_sys::ESP_OK,
            "esp_pthread_set_cfg failed: {ret}"
        );
    }

    log::info!(
        "Spawning '{}' on {core:?} (pri={priority}, stack={stack_kb}KB)",
        name.to_str().unwrap_or("task"),
    );
}

#[cfg(not(target_os = "espidf"))]
fn configure_next_spawn(_core: Core, _priority: u8, _stack_kb: usize, _name: &'static CStr) {}
