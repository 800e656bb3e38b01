//! SonoProbe firmware — main entry point.
//!
//! Bring-up order matters: GPIO and the ISR service first, then the SPI
//! link and the front-end chips, then WiFi, and only once the endpoint is
//! bound do the two session tasks start.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Core 0 (PRO)                 Core 1 (APP)               │
//! │  ┌─────────────┐   signals    ┌────────────────────────┐ │
//! │  │ receiver    │◀────────────▶│ worker (main thread)   │ │
//! │  │ UDP rx      │              │ dispatch · shot loop   │ │
//! │  └─────────────┘              └────────────────────────┘ │
//! │         ▲                                ▲               │
//! │     lwIP/WiFi                    fabric INT (ISR)        │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use log::info;

use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_hal::units::FromValueType;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use sonoprobe::adapters::board::Board;
use sonoprobe::adapters::shot_line::{self, ShotLine, ShotPacer};
use sonoprobe::adapters::spi::EspSpiBus;
use sonoprobe::adapters::udp::UdpTransport;
use sonoprobe::adapters::wifi;
use sonoprobe::app::service::ProbeService;
use sonoprobe::app::session::{self, SessionSignals};
use sonoprobe::config::{ProbeConfig, UDP_PORT};
use sonoprobe::drivers::hw_init;
use sonoprobe::drivers::led::Led;
use sonoprobe::drivers::task_pin;

/// Interrupt-side state; a `static` so the ISR trampoline can reach it.
static SHOT_LINE: ShotLine = ShotLine::new();

/// Session handshake between the receiver and the worker.
static SIGNALS: SessionSignals = SessionSignals::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("SonoProbe v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. GPIO, ISR service, data-ready interrupt ────────────
    hw_init::init_gpio().map_err(|e| anyhow!("GPIO init failed: {e}"))?;
    hw_init::init_isr_service().map_err(|e| anyhow!("ISR service init failed: {e}"))?;
    shot_line::attach_interrupt(&SHOT_LINE).map_err(|e| anyhow!("{e}"))?;

    // ── 3. SPI link to the front end ──────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let spi_driver = SpiDriver::new(
        peripherals.spi2,
        peripherals.pins.gpio12, // SCLK
        peripherals.pins.gpio11, // MOSI
        Some(peripherals.pins.gpio13), // MISO
        &SpiDriverConfig::new(),
    )?;
    let spi_device = SpiDeviceDriver::new(
        spi_driver,
        Some(peripherals.pins.gpio14), // CS
        &SpiConfig::new().baudrate(20.MHz().into()),
    )?;
    let bus = EspSpiBus::new(spi_device);

    // ── 4. Status LEDs ────────────────────────────────────────
    let activity_led = Led::new(PinDriver::output(peripherals.pins.gpio7)?);
    let mut link_led = Led::new(PinDriver::output(peripherals.pins.gpio15)?);

    // ── 5. WiFi + command endpoint ────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let _wifi = wifi::connect(peripherals.modem, sysloop, nvs).map_err(|e| anyhow!("{e}"))?;
    link_led.set(true);

    let endpoint = UdpTransport::bind(UDP_PORT).map_err(|e| anyhow!("UDP bind failed: {e}"))?;
    let reply_net = endpoint
        .try_clone()
        .map_err(|e| anyhow!("UDP clone failed: {e}"))?;

    // ── 6. Probe service + front-end bring-up ─────────────────
    let mut service = ProbeService::new(
        bus,
        reply_net,
        Board::new(),
        ShotPacer::new(&SHOT_LINE),
        ProbeConfig::default(),
    );
    service
        .initialize()
        .map_err(|e| anyhow!("front-end bring-up failed: {e}"))?;

    // ── 7. Session tasks ──────────────────────────────────────
    let _receiver = task_pin::spawn_on_core(task_pin::Core::Pro, 5, 8, c"probe-rx", move || {
        session::receiver_loop(endpoint, &SIGNALS);
    });

    // The worker owns the main thread and never returns.
    session::worker_loop(service, &SIGNALS, activity_led)
}
