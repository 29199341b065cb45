//! GPIO / peripheral pin assignments for the dimmer board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Dimmer outputs (LEDC, one channel each)
// ---------------------------------------------------------------------------

/// Output GPIOs in channel order: index 0 drives channel 0.
pub const DIMMER_GPIOS: [i32; 4] = [12, 13, 15, 23];

// ---------------------------------------------------------------------------
// Tank thermometer (DS18B20, 1-Wire, external 4k7 pull-up)
// ---------------------------------------------------------------------------

pub const ONEWIRE_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  13-bit gives 0 – 8191 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 13;
/// Highest duty the timer accepts at [`PWM_RESOLUTION_BITS`].
pub const PWM_DUTY_MAX: u16 = (1 << PWM_RESOLUTION_BITS) - 1;
/// LEDC base frequency (5 kHz: flicker-free on camera, inaudible on the
/// driver coils).
pub const PWM_FREQ_HZ: u32 = 5_000;
