//! Switch sampling through MCP23008 I/O expanders.
//!
//! Every switch sits on one expander pin with the internal pull-up enabled,
//! so a pressed switch reads as a cleared bit. Which pin belongs to which
//! matrix coordinate is board data ([`Wiring`]), picked once at start-up.

use log::warn;

use crate::error::{BusFault, SampleError};
use crate::event::Coord;
use crate::{NUM_COLUMNS, NUM_LINES};

/// Pins per expander chip.
pub const PINS_PER_CHIP: usize = 8;

/// Most expanders any board revision carries.
pub const MAX_CHIPS: usize = 8;

/// Access to the expander chips. Implemented by the firmware TWI driver and
/// by scripted buses in tests.
pub trait SwitchBus {
    /// Read the 8 input pins of the chip at `address` (0-7, added to the
    /// chip's base address by the driver).
    fn read_pins(&mut self, address: u8) -> Result<u8, BusFault>;

    /// Reset the bus and configure every chip as pulled-up inputs.
    fn reset(&mut self);
}

/// One expander: its bus address and the coordinate behind each pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipWiring {
    pub address: u8,
    pub pins: [Option<Coord>; PINS_PER_CHIP],
}

/// Which switch each expander pin is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    pub chips: &'static [ChipWiring],
}

/// Hardware revision of the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum BoardRevision {
    Rev1,
    #[default]
    Rev2,
}

const fn p(line: u8, column: u8) -> Option<Coord> {
    Some(Coord::new(line, column))
}

/// Pin not connected.
const NC: Option<Coord> = None;

const fn chip(address: u8, pins: [Option<Coord>; PINS_PER_CHIP]) -> ChipWiring {
    ChipWiring { address, pins }
}

/// First revision: eight chips, four per half, the full 5x12 matrix.
const REV1_CHIPS: [ChipWiring; 8] = [
    chip(0, [p(0, 6), p(1, 6), p(2, 6), p(3, 6), p(4, 6), p(4, 7), p(3, 7), p(2, 7)]),
    chip(1, [p(0, 7), p(1, 7), p(4, 8), p(3, 8), p(2, 8), p(1, 8), p(0, 8), p(4, 9)]),
    chip(2, [p(3, 9), p(2, 9), p(1, 9), p(4, 10), p(3, 10), p(0, 9), p(2, 10), p(1, 10)]),
    chip(3, [p(4, 11), p(3, 11), p(2, 11), p(0, 10), p(1, 11), p(0, 11), NC, NC]),
    chip(4, [p(0, 0), p(1, 0), p(2, 0), p(3, 0), p(4, 0), p(4, 1), p(3, 1), p(2, 1)]),
    chip(5, [p(0, 1), p(1, 1), p(4, 2), p(3, 2), p(2, 2), p(1, 2), p(0, 2), p(4, 3)]),
    chip(6, [p(3, 3), p(2, 3), p(1, 3), p(4, 4), p(3, 4), p(0, 3), p(2, 4), p(1, 4)]),
    chip(7, [p(4, 5), p(3, 5), p(2, 5), p(0, 4), p(1, 5), p(0, 5), NC, NC]),
];

/// Second revision: six chips of six switches, outer columns and the top
/// line dropped.
const REV2_CHIPS: [ChipWiring; 6] = [
    chip(0, [p(4, 8), p(4, 7), p(4, 6), p(3, 7), p(3, 6), p(2, 6), NC, NC]),
    chip(1, [p(2, 7), p(3, 8), p(2, 8), p(1, 8), p(1, 7), p(1, 6), NC, NC]),
    chip(2, [p(3, 9), p(3, 10), p(2, 10), p(1, 10), p(1, 9), p(2, 9), NC, NC]),
    chip(4, [p(4, 3), p(4, 4), p(4, 5), p(3, 4), p(3, 5), p(2, 5), NC, NC]),
    chip(5, [p(2, 4), p(3, 3), p(2, 3), p(1, 3), p(1, 4), p(1, 5), NC, NC]),
    chip(6, [p(3, 2), p(3, 1), p(2, 1), p(1, 1), p(1, 2), p(2, 2), NC, NC]),
];

impl Wiring {
    pub const REV1: Wiring = Wiring { chips: &REV1_CHIPS };
    pub const REV2: Wiring = Wiring { chips: &REV2_CHIPS };

    pub const fn for_revision(revision: BoardRevision) -> Wiring {
        match revision {
            BoardRevision::Rev1 => Wiring::REV1,
            BoardRevision::Rev2 => Wiring::REV2,
        }
    }

    /// Chip index and pin wired to `pos`, if any.
    pub fn locate(&self, pos: Coord) -> Option<(usize, u8)> {
        self.chips.iter().enumerate().find_map(|(index, chip)| {
            chip.pins
                .iter()
                .position(|&wired| wired == Some(pos))
                .map(|pin| (index, pin as u8))
        })
    }
}

type Grid = [[bool; NUM_COLUMNS]; NUM_LINES];

/// Latest committed switch snapshot.
pub struct Sampler {
    wiring: Wiring,
    pressed: Grid,
    changed: Grid,
}

impl Sampler {
    pub const fn new(wiring: Wiring) -> Self {
        Self {
            wiring,
            pressed: [[false; NUM_COLUMNS]; NUM_LINES],
            changed: [[false; NUM_COLUMNS]; NUM_LINES],
        }
    }

    pub fn wiring(&self) -> &Wiring {
        &self.wiring
    }

    /// Reset the bus and forget every switch state.
    pub fn init<B: SwitchBus>(&mut self, bus: &mut B) {
        bus.reset();
        self.pressed = [[false; NUM_COLUMNS]; NUM_LINES];
        self.changed = [[false; NUM_COLUMNS]; NUM_LINES];
    }

    /// Read every chip, then commit.
    ///
    /// All chips are read before anything is committed. If one read fails
    /// the batch is dropped, the bus is reset and the previous snapshot is
    /// kept with no position marked as changed.
    pub fn step<B: SwitchBus>(&mut self, bus: &mut B) -> Result<(), SampleError> {
        let mut samples = [0xFFu8; MAX_CHIPS];
        for (index, chip) in self.wiring.chips.iter().enumerate() {
            match bus.read_pins(chip.address) {
                Ok(pins) => samples[index] = pins,
                Err(source) => {
                    warn!("chip {index} (address {}): {source}, resetting bus", chip.address);
                    self.changed = [[false; NUM_COLUMNS]; NUM_LINES];
                    bus.reset();
                    return Err(SampleError::Chip { chip: index, source });
                }
            }
        }

        for (chip, pins) in self.wiring.chips.iter().zip(samples) {
            for (pin, wired) in chip.pins.iter().enumerate() {
                let Some(pos) = wired else { continue };
                let (line, column) = (pos.line_index(), pos.column_index());
                let pressed = pins & (1 << pin) == 0;
                self.changed[line][column] = self.pressed[line][column] != pressed;
                self.pressed[line][column] = pressed;
            }
        }
        Ok(())
    }

    pub fn is_pressed(&self, pos: Coord) -> bool {
        self.pressed[pos.line_index()][pos.column_index()]
    }

    pub fn has_changed(&self, pos: Coord) -> bool {
        self.changed[pos.line_index()][pos.column_index()]
    }

    /// Positions that changed in the last committed sample, with their new
    /// state, in line-major order.
    pub fn changes(&self) -> impl Iterator<Item = (Coord, bool)> + '_ {
        Coord::all()
            .filter(|&pos| self.has_changed(pos))
            .map(|pos| (pos, self.is_pressed(pos)))
    }
}
