//! Timing policy of the event resolver.

/// Press/release or release/press pairs closer than this are contact bounce.
pub const DEBOUNCE_TIME: u32 = 10_000; // µs

/// Keys pressed together and all released before any of them was held this
/// long are an accidental multi-switch actuation and are dropped.
pub const OVERLAP_REMOVAL_TIME: u32 = 100_000; // µs

/// Resolve-on-release keys held shorter than this are taps; longer holds
/// only act as layer selectors.
pub const MAX_HOLD_TIME: u32 = 500_000; // µs

/// How long a synthetic single-shot press stays down for the host to read.
pub const KEY_PRESS_LENGTH: u32 = 50; // ms

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timing {
    pub debounce_us: u32,
    pub overlap_removal_us: u32,
    pub max_hold_us: u32,
    pub key_press_length_ms: u32,
}

impl Timing {
    pub const fn new() -> Self {
        Self {
            debounce_us: DEBOUNCE_TIME,
            overlap_removal_us: OVERLAP_REMOVAL_TIME,
            max_hold_us: MAX_HOLD_TIME,
            key_press_length_ms: KEY_PRESS_LENGTH,
        }
    }

    /// Held for at least `max_hold_us`: a hold, not a tap. The boundary
    /// itself counts as a hold.
    #[inline]
    pub fn is_hold(&self, held_us: u32) -> bool {
        held_us >= self.max_hold_us
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}
