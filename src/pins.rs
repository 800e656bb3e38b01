//! GPIO / peripheral pin assignments for the SonoProbe carrier board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Acquisition fabric
// ---------------------------------------------------------------------------

/// Digital input: data-ready interrupt from the fabric (falling edge).
pub const FABRIC_INT_GPIO: i32 = 2;
/// Digital output: fabric reset line (active LOW pulse at bring-up).
pub const FABRIC_RESET_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// SPI routing mux
// ---------------------------------------------------------------------------

/// Routing bit A of the SPI destination mux.
pub const MUX_A_GPIO: i32 = 1;
/// Routing bit B of the SPI destination mux.
pub const MUX_B_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// SPI bus (shared by fabric, front end, and TX driver through the mux)
// ---------------------------------------------------------------------------

pub const SPI_SCLK_GPIO: i32 = 12;
pub const SPI_MOSI_GPIO: i32 = 11;
pub const SPI_MISO_GPIO: i32 = 13;
pub const SPI_CS_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Power domains
// ---------------------------------------------------------------------------

/// Digital output: −5 V rail enable.
pub const POWER_NEG_5V_GPIO: i32 = 4;
/// Digital output: −HV pulser rail enable.
pub const POWER_NEG_HV_GPIO: i32 = 5;
/// Digital output: +HV pulser rail enable.
pub const POWER_POS_HV_GPIO: i32 = 6;
/// Digital output: LVDS 2.5 V power switch.
pub const POWER_LVDS_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Status LEDs
// ---------------------------------------------------------------------------

/// Red LED — lit while a command batch is executing.
pub const LED_RED_GPIO: i32 = 7;
/// Green LED — lit once the network link is up.
pub const LED_GREEN_GPIO: i32 = 15;
