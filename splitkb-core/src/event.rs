//! Switch coordinates and timestamped press/release events.

use crate::{NUM_COLUMNS, NUM_LINES};

/// Monotonic timestamp in microseconds. Wraps after ~71 minutes, so
/// durations are always computed with [`elapsed`].
pub type Micros = u32;

/// Time from `since` to `now`, correct across one wrap of the clock.
#[inline]
pub fn elapsed(since: Micros, now: Micros) -> u32 {
    now.wrapping_sub(since)
}

/// A (line, column) position in the virtual key matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub line: u8,
    pub column: u8,
}

impl Coord {
    pub const fn new(line: u8, column: u8) -> Self {
        debug_assert!((line as usize) < NUM_LINES && (column as usize) < NUM_COLUMNS);
        Self { line, column }
    }

    /// Checked constructor for coordinates coming from outside the firmware
    /// (trace files, wiring tables under test).
    pub fn try_new(line: usize, column: usize) -> Option<Self> {
        if line < NUM_LINES && column < NUM_COLUMNS {
            Some(Self {
                line: line as u8,
                column: column as u8,
            })
        } else {
            None
        }
    }

    /// Every coordinate of the matrix, line by line.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..NUM_LINES as u8)
            .flat_map(|line| (0..NUM_COLUMNS as u8).map(move |column| Coord { line, column }))
    }

    #[inline]
    pub(crate) fn line_index(self) -> usize {
        self.line as usize
    }

    #[inline]
    pub(crate) fn column_index(self) -> usize {
        self.column as usize
    }
}

/// One electrical transition of one switch, as seen by the sampler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub pos: Coord,
    pub pressed: bool,
    pub at: Micros,
}

impl Event {
    pub const fn press(pos: Coord, at: Micros) -> Self {
        Self {
            pos,
            pressed: true,
            at,
        }
    }

    pub const fn release(pos: Coord, at: Micros) -> Self {
        Self {
            pos,
            pressed: false,
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_clock_wrap() {
        assert_eq!(elapsed(u32::MAX - 5, 4), 10);
        assert_eq!(elapsed(100, 250), 150);
    }

    #[test]
    fn all_covers_the_matrix_once() {
        assert_eq!(Coord::all().count(), NUM_LINES * NUM_COLUMNS);
        assert_eq!(Coord::all().next(), Some(Coord::new(0, 0)));
        assert_eq!(
            Coord::all().last(),
            Some(Coord::new(NUM_LINES as u8 - 1, NUM_COLUMNS as u8 - 1))
        );
    }

    #[test]
    fn try_new_rejects_out_of_range() {
        assert!(Coord::try_new(NUM_LINES, 0).is_none());
        assert!(Coord::try_new(0, NUM_COLUMNS).is_none());
        assert_eq!(Coord::try_new(1, 1), Some(Coord::new(1, 1)));
    }
}
