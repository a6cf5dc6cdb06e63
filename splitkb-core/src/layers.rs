//! Default key map for the 5x12 split board, authored for an AZERTY host.
//!
//! Matrix: lines 0-4, columns 0-5 = left half, columns 6-11 = right half.
//! Line 0 and the outer columns are not wired on this board.

use crate::keycode::{azerty, Keycode, MediaKey};
use crate::keymap::{Binding, Keymap, Layer, LayerBit};
use crate::{NUM_COLUMNS, NUM_LINES};

/// Number of authored layers behind the eight banks.
pub const NUM_LAYERS: usize = 5;

/// Position is unused in this layer.
const ___: Binding = Binding::NONE;

const fn k(key: Keycode) -> Binding {
    Binding::key(key)
}

/// Key sent with Shift forced on.
const fn sh(key: Keycode) -> Binding {
    Binding::forced(key, Keycode::LShift)
}

/// Key sent with AltGr forced on.
const fn ag(key: Keycode) -> Binding {
    Binding::forced(key, Keycode::RAlt)
}

const fn media(key: MediaKey) -> Binding {
    Binding::media(key)
}

const ENT: Binding = k(Keycode::Enter);
const SPC: Binding = k(Keycode::Space);
const BSP: Binding = k(Keycode::Backspace);
const LCTL: Binding = k(Keycode::LCtrl);
const LSFT: Binding = k(Keycode::LShift);
const LALT: Binding = k(Keycode::LAlt);
const LGUI: Binding = k(Keycode::LGui);

/// Layer 0: base letters. The SHIFT selector at (4,4) also sends Shift.
pub static BASE: Layer = [
    [___; NUM_COLUMNS],
    // Left: A Z E R T                 Right: Y U I O P
    [___, k(azerty::A), k(azerty::Z), k(Keycode::E), k(Keycode::R), k(Keycode::T),
     k(Keycode::Y), k(Keycode::U), k(Keycode::I), k(Keycode::O), k(Keycode::P), ___],
    // Left: Q S D F G                 Right: H J K L M
    [___, k(azerty::Q), k(Keycode::S), k(Keycode::D), k(Keycode::F), k(Keycode::G),
     k(Keycode::H), k(Keycode::J), k(Keycode::K), k(Keycode::L), k(azerty::M), ___],
    // Left: W X C V B                 Right: Bksp N . , ;
    [___, k(azerty::W), k(Keycode::X), k(Keycode::C), k(Keycode::V), k(Keycode::B),
     BSP, k(Keycode::N), sh(azerty::SEMICOLON), k(azerty::COMMA), k(azerty::SEMICOLON), ___],
    // Thumbs: Ctrl, Shift, Space/Accent, Enter/Function, Alt, Win
    [___, ___, ___, LCTL, LSFT, SPC,
     ENT, LALT, LGUI, ___, ___, ___],
];

/// Layer 1: everything with Shift forced.
pub static SHIFT: Layer = [
    [___; NUM_COLUMNS],
    [___, sh(azerty::A), sh(azerty::Z), sh(Keycode::E), sh(Keycode::R), sh(Keycode::T),
     sh(Keycode::Y), sh(Keycode::U), sh(Keycode::I), sh(Keycode::O), sh(Keycode::P), ___],
    [___, sh(azerty::Q), sh(Keycode::S), sh(Keycode::D), sh(Keycode::F), sh(Keycode::G),
     sh(Keycode::H), sh(Keycode::J), sh(Keycode::K), sh(Keycode::L), sh(azerty::M), ___],
    // Right: Bksp N ! ? :
    [___, sh(azerty::W), sh(Keycode::X), sh(Keycode::C), sh(Keycode::V), sh(Keycode::B),
     sh(Keycode::Backspace), sh(Keycode::N), k(azerty::EXCLAIM), sh(azerty::COMMA),
     k(azerty::COLON), ___],
    [___, ___, ___, sh(Keycode::LCtrl), ___, sh(Keycode::Space),
     sh(Keycode::Enter), sh(Keycode::LAlt), sh(Keycode::LGui), ___, ___, ___],
];

/// Layer 2: function keys, navigation and media.
pub static FUNCTION: Layer = [
    [___; NUM_COLUMNS],
    // Left: F1-F4 Esc                 Right: Vol+ Alt+Tab Up Menu Home
    [___, k(Keycode::F1), k(Keycode::F2), k(Keycode::F3), k(Keycode::F4), k(Keycode::Escape),
     media(MediaKey::VolumeUp), Binding::forced(Keycode::Tab, Keycode::LAlt), k(Keycode::Up),
     k(Keycode::Menu), k(Keycode::Home), ___],
    // Left: F5-F8 Tab                 Right: Vol- Left Down Right End
    [___, k(Keycode::F5), k(Keycode::F6), k(Keycode::F7), k(Keycode::F8), k(Keycode::Tab),
     media(MediaKey::VolumeDown), k(Keycode::Left), k(Keycode::Down), k(Keycode::Right),
     k(Keycode::End), ___],
    // Left: F9-F12                    Right: Del Enter PgUp PgDn Pause
    [___, k(Keycode::F9), k(Keycode::F10), k(Keycode::F11), k(Keycode::F12), ___,
     k(Keycode::Delete), ENT, k(Keycode::PageUp), k(Keycode::PageDown), k(Keycode::Pause), ___],
    [___, ___, ___, LCTL, LSFT, SPC,
     ENT, LALT, LGUI, ___, ___, ___],
];

/// Layer 3: accents and symbols on the left, keypad on the right.
pub static ACCENT: Layer = [
    [___; NUM_COLUMNS],
    // Left: à é è | '                 Right: / 7 8 9 -
    [___, k(azerty::A_GRAVE), k(azerty::E_ACUTE), k(azerty::E_GRAVE), ag(azerty::MINUS),
     k(azerty::APOSTROPHE),
     sh(azerty::COLON), k(Keycode::Kp7), k(Keycode::Kp8), k(Keycode::Kp9), k(Keycode::KpMinus), ___],
    // Left: @ $ € # "                 Right: * 4 5 6 +
    [___, ag(azerty::A_GRAVE), k(azerty::DOLLAR), ag(Keycode::E), ag(azerty::DQUOTE),
     k(azerty::DQUOTE),
     k(azerty::ASTERISK), k(Keycode::Kp4), k(Keycode::Kp5), k(Keycode::Kp6), k(Keycode::KpPlus), ___],
    // Left: ç _ &                     Right: Bksp 1 2 3 =
    [___, ___, ___, k(azerty::C_CEDILLA), k(azerty::UNDERSCORE), k(azerty::AMPERSAND),
     BSP, k(Keycode::Kp1), k(Keycode::Kp2), k(Keycode::Kp3), k(azerty::EQUAL), ___],
    // Thumbs: Win, Ctrl, Shift, Enter, 0, .
    [___, LGUI, ___, LCTL, LSFT, ___,
     ENT, k(Keycode::Kp0), sh(azerty::SEMICOLON), ___, ___, ___],
];

/// Layer 4: brackets and AltGr symbols, reached with ACCENT and FUNCTION
/// together.
pub static ACCENT2: Layer = [
    [___; NUM_COLUMNS],
    // Left: `                         Right: \ } ) ] >
    [___, ___, ___, ___, ___, ag(azerty::E_GRAVE),
     ag(azerty::UNDERSCORE), ag(azerty::EQUAL), k(azerty::RPAREN), ag(azerty::RPAREN),
     sh(azerty::ANGLE_BRACKETS), ___],
    // Left: ^                         Right: ~ { ( [ <
    [___, ___, ___, ___, ___, k(azerty::CARET),
     ag(azerty::E_ACUTE), ag(azerty::APOSTROPHE), k(azerty::LPAREN), ag(azerty::LPAREN),
     k(azerty::ANGLE_BRACKETS), ___],
    // Left: %
    [___, ___, ___, ___, ___, sh(azerty::U_GRAVE),
     ___, ___, ___, ___, ___, ___],
    [___; NUM_COLUMNS],
];

/// Authored layers, in display order.
pub static LAYERS: [(&str, &Layer); NUM_LAYERS] = [
    ("Base", &BASE),
    ("Shift", &SHIFT),
    ("Function", &FUNCTION),
    ("Accent", &ACCENT),
    ("Accent 2", &ACCENT2),
];

const NO: LayerBit = LayerBit::None;

pub const SELECTORS: [[LayerBit; NUM_COLUMNS]; NUM_LINES] = [
    [NO; NUM_COLUMNS],
    [NO; NUM_COLUMNS],
    [NO; NUM_COLUMNS],
    [NO; NUM_COLUMNS],
    [NO, NO, NO, NO, LayerBit::Shift, LayerBit::Accent,
     LayerBit::Function, NO, NO, NO, NO, NO],
];

pub const ON_RELEASE: [[bool; NUM_COLUMNS]; NUM_LINES] = [
    [false; NUM_COLUMNS],
    [false; NUM_COLUMNS],
    [false; NUM_COLUMNS],
    [false; NUM_COLUMNS],
    [false, false, false, false, false, true,
     true, false, false, false, false, false],
];

pub const RESET_IMMUNE: [[bool; NUM_COLUMNS]; NUM_LINES] = [
    [false; NUM_COLUMNS],
    [false; NUM_COLUMNS],
    [false; NUM_COLUMNS],
    [false; NUM_COLUMNS],
    [false, false, false, true, true, false,
     false, false, true, false, false, false],
];

/// The key map the firmware ships with.
///
/// Bank index is the layer mask (bit 0 SHIFT, bit 1 FUNCTION, bit 2 ACCENT).
/// SHIFT on top of FUNCTION or ACCENT keeps that layer.
pub static DEFAULT_KEYMAP: Keymap = Keymap {
    banks: [
        &BASE, &SHIFT, &FUNCTION, &FUNCTION, &ACCENT, &ACCENT, &ACCENT2, &ACCENT2,
    ],
    selectors: SELECTORS,
    on_release: ON_RELEASE,
    reset_immune: RESET_IMMUNE,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Coord;
    use crate::keymap::{LayerMask, Resolved};

    const SHIFT_SELECTOR: Coord = Coord::new(4, 4);

    fn at(mask: LayerMask, line: u8, column: u8) -> Resolved {
        DEFAULT_KEYMAP.resolve(mask, Coord::new(line, column))
    }

    #[test]
    fn base_layer_is_azerty() {
        let a = at(LayerMask::EMPTY, 1, 1);
        assert_eq!(a.key, Some(Keycode::Q));
        assert_eq!(a.key.map(Keycode::display_name), Some("A"));
    }

    #[test]
    fn base_punctuation_row() {
        // `.` is Shift + `;` on AZERTY
        let dot = at(LayerMask::EMPTY, 3, 8);
        assert_eq!(dot.key, Some(Keycode::Comma));
        assert_eq!(dot.forced, Some(Keycode::LShift));
        assert_eq!(at(LayerMask::EMPTY, 3, 9).key, Some(azerty::COMMA));
        assert_eq!(at(LayerMask::EMPTY, 3, 10).key, Some(azerty::SEMICOLON));
        assert_eq!(at(LayerMask::EMPTY, 3, 10).forced, None);
    }

    #[test]
    fn shift_bank_forces_shift() {
        let a = at(LayerMask::SHIFT, 1, 1);
        assert_eq!(a.key, Some(azerty::A));
        assert_eq!(a.forced, Some(Keycode::LShift));
    }

    #[test]
    fn shift_bank_punctuation_is_not_shifted() {
        let bang = at(LayerMask::SHIFT, 3, 8);
        assert_eq!(bang.key, Some(azerty::EXCLAIM));
        assert_eq!(bang.forced, None);
        let question = at(LayerMask::SHIFT, 3, 9);
        assert_eq!(question.key, Some(azerty::COMMA));
        assert_eq!(question.forced, Some(Keycode::LShift));
    }

    #[test]
    fn shift_bank_control_is_shift_control() {
        let ctrl = at(LayerMask::SHIFT, 4, 3);
        assert_eq!(ctrl.key, Some(Keycode::LCtrl));
        assert_eq!(ctrl.forced, Some(Keycode::LShift));
    }

    #[test]
    fn shift_selector_sends_shift_outside_the_shift_bank() {
        for mask in [LayerMask::EMPTY, LayerMask::FUNCTION, LayerMask::ACCENT] {
            let shift = DEFAULT_KEYMAP.resolve(mask, SHIFT_SELECTOR);
            assert_eq!(shift.key, Some(Keycode::LShift), "{mask:?}");
        }
        assert!(DEFAULT_KEYMAP.resolve(LayerMask::SHIFT, SHIFT_SELECTOR).is_empty());
    }

    #[test]
    fn accent_layer_accents_and_altgr_symbols() {
        assert_eq!(at(LayerMask::ACCENT, 1, 1).key, Some(azerty::A_GRAVE));
        assert_eq!(at(LayerMask::ACCENT, 1, 2).key, Some(azerty::E_ACUTE));
        assert_eq!(at(LayerMask::ACCENT, 1, 3).key, Some(azerty::E_GRAVE));

        let at_sign = at(LayerMask::ACCENT, 2, 1);
        assert_eq!(at_sign.key, Some(azerty::A_GRAVE));
        assert_eq!(at_sign.forced, Some(Keycode::RAlt));
        let euro = at(LayerMask::ACCENT, 2, 3);
        assert_eq!(euro.key, Some(Keycode::E));
        assert_eq!(euro.forced, Some(Keycode::RAlt));
        assert_eq!(at(LayerMask::ACCENT, 2, 2).key, Some(azerty::DOLLAR));
    }

    #[test]
    fn shift_on_accent_keeps_the_keypad() {
        let plain = at(LayerMask::ACCENT, 1, 7);
        let shifted = at(LayerMask::ACCENT | LayerMask::SHIFT, 1, 7);
        assert_eq!(plain.key, Some(Keycode::Kp7));
        assert_eq!(shifted, plain);
    }

    #[test]
    fn function_layer_has_media_and_forced_alt_tab() {
        let vol = at(LayerMask::FUNCTION, 1, 6);
        assert_eq!(vol.media, Some(MediaKey::VolumeUp));
        let alt_tab = at(LayerMask::FUNCTION, 1, 7);
        assert_eq!(alt_tab.key, Some(Keycode::Tab));
        assert_eq!(alt_tab.forced, Some(Keycode::LAlt));
    }

    #[test]
    fn thumb_flags() {
        let shift = DEFAULT_KEYMAP.flags(SHIFT_SELECTOR);
        assert_eq!(shift.selector, LayerBit::Shift);
        assert!(shift.reset_immune);
        assert!(!shift.resolves_on_release);

        let accent = DEFAULT_KEYMAP.flags(Coord::new(4, 5));
        assert_eq!(accent.selector, LayerBit::Accent);
        assert!(accent.resolves_on_release);

        let function = DEFAULT_KEYMAP.flags(Coord::new(4, 6));
        assert_eq!(function.selector, LayerBit::Function);
        assert!(function.resolves_on_release);
        assert!(!function.reset_immune);
    }

    #[test]
    fn accent_and_function_share_a_bank() {
        // `}` is AltGr + `=`
        let both = at(LayerMask::ACCENT | LayerMask::FUNCTION, 1, 7);
        assert_eq!(both.key, Some(azerty::EQUAL));
        assert_eq!(both.forced, Some(Keycode::RAlt));
        assert_eq!(at(LayerMask::ACCENT | LayerMask::FUNCTION, 2, 8).key, Some(azerty::LPAREN));
    }
}
