//! Layer banks, per-position bindings and per-position flags.
//!
//! Eight banks are selected by the three layer bits (SHIFT, FUNCTION,
//! ACCENT): the bank index is the mask itself. Several banks may share one
//! authored layer.

use core::ops::{BitOr, BitOrAssign};

use crate::event::Coord;
use crate::keycode::{Keycode, MediaKey};
use crate::{NUM_COLUMNS, NUM_LINES};

/// Number of layer banks addressable by the layer mask.
pub const NUM_BANKS: usize = 8;

/// One authored layer: a binding for every matrix position.
pub type Layer = [[Binding; NUM_COLUMNS]; NUM_LINES];

/// Which layer family a selector position contributes while held.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LayerBit {
    #[default]
    None,
    Shift,
    Function,
    Accent,
}

impl LayerBit {
    pub const fn mask(self) -> LayerMask {
        match self {
            LayerBit::None => LayerMask::EMPTY,
            LayerBit::Shift => LayerMask::SHIFT,
            LayerBit::Function => LayerMask::FUNCTION,
            LayerBit::Accent => LayerMask::ACCENT,
        }
    }
}

/// Set of active layer bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const EMPTY: LayerMask = LayerMask(0);
    pub const SHIFT: LayerMask = LayerMask(0b001);
    pub const FUNCTION: LayerMask = LayerMask(0b010);
    pub const ACCENT: LayerMask = LayerMask(0b100);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bank selected by this mask.
    pub const fn bank(self) -> usize {
        (self.0 as usize) & (NUM_BANKS - 1)
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: LayerMask) {
        self.0 |= rhs.0;
    }
}

/// What one position produces in one layer.
///
/// `secondary` replaces `primary` while SHIFT is active; `forced` is sent
/// together with whichever of the two is chosen (e.g. Alt for a forced
/// Alt+Tab). A media binding carries no keycodes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Binding {
    pub primary: Option<Keycode>,
    pub secondary: Option<Keycode>,
    pub forced: Option<Keycode>,
    pub media: Option<MediaKey>,
}

impl Binding {
    pub const NONE: Binding = Binding {
        primary: None,
        secondary: None,
        forced: None,
        media: None,
    };

    pub const fn key(key: Keycode) -> Self {
        Binding {
            primary: Some(key),
            ..Binding::NONE
        }
    }

    /// `key`, or `shifted` while SHIFT is active.
    pub const fn shifted(key: Keycode, shifted: Keycode) -> Self {
        Binding {
            primary: Some(key),
            secondary: Some(shifted),
            ..Binding::NONE
        }
    }

    /// `key` sent together with `with`, typically a modifier.
    pub const fn forced(key: Keycode, with: Keycode) -> Self {
        Binding {
            primary: Some(key),
            forced: Some(with),
            ..Binding::NONE
        }
    }

    pub const fn media(key: MediaKey) -> Self {
        Binding {
            media: Some(key),
            ..Binding::NONE
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.media.is_none()
    }

    /// The keys this binding asserts, given whether SHIFT is active.
    pub fn resolve(&self, shift: bool) -> Resolved {
        let key = match (shift, self.secondary) {
            (true, Some(secondary)) => Some(secondary),
            _ => self.primary,
        };
        Resolved {
            key,
            forced: self.forced,
            media: self.media,
        }
    }

    /// The keys this binding asserts as a tap, ignoring the shifted variant.
    pub fn resolve_primary(&self) -> Resolved {
        self.resolve(false)
    }
}

/// The concrete keys a position asserts while logically pressed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolved {
    pub key: Option<Keycode>,
    pub forced: Option<Keycode>,
    pub media: Option<MediaKey>,
}

impl Resolved {
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.forced.is_none() && self.media.is_none()
    }

    /// Keycodes asserted, forced key first so a forced modifier is down no
    /// later than the key it decorates.
    pub fn keys(&self) -> impl Iterator<Item = Keycode> {
        self.forced.into_iter().chain(self.key)
    }
}

/// Static behaviour flags of one position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionFlags {
    pub selector: LayerBit,
    pub resolves_on_release: bool,
    pub reset_immune: bool,
}

/// The full, read-only key map: eight banks plus the flag tables.
pub struct Keymap {
    pub banks: [&'static Layer; NUM_BANKS],
    pub selectors: [[LayerBit; NUM_COLUMNS]; NUM_LINES],
    pub on_release: [[bool; NUM_COLUMNS]; NUM_LINES],
    pub reset_immune: [[bool; NUM_COLUMNS]; NUM_LINES],
}

impl Keymap {
    pub fn binding(&self, bank: usize, pos: Coord) -> &Binding {
        &self.banks[bank % NUM_BANKS][pos.line_index()][pos.column_index()]
    }

    /// Resolve `pos` against the bank selected by `mask`.
    pub fn resolve(&self, mask: LayerMask, pos: Coord) -> Resolved {
        self.binding(mask.bank(), pos)
            .resolve(mask.contains(LayerMask::SHIFT))
    }

    pub fn flags(&self, pos: Coord) -> PositionFlags {
        let (line, column) = (pos.line_index(), pos.column_index());
        PositionFlags {
            selector: self.selectors[line][column],
            resolves_on_release: self.on_release[line][column],
            reset_immune: self.reset_immune[line][column],
        }
    }
}
