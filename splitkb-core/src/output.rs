//! Report assembly: resolved keys to the HID report shape.

use log::trace;

use crate::keycode::{Keycode, MediaKey};
use crate::keymap::Resolved;
use crate::resolver::ResolverState;

/// Keycode slots in a boot keyboard report.
pub const REPORT_KEYS: usize = 6;

/// Keyboard report plus the media byte.
/// Unused key slots are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub modifiers: u8,
    pub keys: [u8; REPORT_KEYS],
    pub media: u8,
}

impl Report {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            keys: [0; REPORT_KEYS],
            media: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Boot keyboard layout.
    /// Byte 0: modifier keys bitmask
    /// Byte 1: reserved (0x00)
    /// Bytes 2-7: up to 6 simultaneous keycodes
    pub fn keyboard_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.modifiers;
        bytes[2..].copy_from_slice(&self.keys);
        bytes
    }

    /// Keycodes in use, in slot order.
    pub fn pressed_keys(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys.iter().copied().take_while(|&key| key != 0)
    }
}

/// Where finished reports go: the USB endpoint on the board, a recorder on
/// the host.
pub trait HidTransport {
    fn send(&mut self, report: &Report);
}

/// The report being assembled.
#[derive(Debug, Default)]
pub struct Output {
    report: Report,
}

impl Output {
    pub const fn new() -> Self {
        Self {
            report: Report::empty(),
        }
    }

    /// Add one key. Modifiers go to the modifier byte; other keys take the
    /// next free slot and are left out once all six are used.
    pub fn add(&mut self, key: Keycode) {
        if key.is_modifier() {
            self.report.modifiers |= key.modifier_bit();
            return;
        }
        let code = key as u8;
        if self.report.keys.contains(&code) {
            return;
        }
        match self.report.keys.iter_mut().find(|slot| **slot == 0) {
            Some(slot) => *slot = code,
            None => trace!("report full, {key:?} left out"),
        }
    }

    pub fn add_media(&mut self, key: MediaKey) {
        self.report.media |= key.bit();
    }

    pub fn add_resolved(&mut self, resolved: &Resolved) {
        for key in resolved.keys() {
            self.add(key);
        }
        if let Some(media) = resolved.media {
            self.add_media(media);
        }
    }

    pub fn release_all(&mut self) {
        self.report = Report::empty();
    }

    /// Hand the assembled report to the transport.
    pub fn send<T: HidTransport>(&self, transport: &mut T) {
        transport.send(&self.report);
    }

    pub fn is_any_key_pressed(&self) -> bool {
        !self.report.is_empty()
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Rebuild the report from the keys the resolver holds, oldest first.
    pub fn project(&mut self, state: &ResolverState) {
        self.release_all();
        for (_, resolved) in state.pressed() {
            self.add_resolved(&resolved);
        }
    }

    /// Send `key` alone for `length_ms`, then an empty report.
    pub fn tap<T, D>(&mut self, key: Keycode, length_ms: u32, transport: &mut T, mut delay_ms: D)
    where
        T: HidTransport,
        D: FnMut(u32),
    {
        self.release_all();
        self.add(key);
        self.send(transport);
        delay_ms(length_ms);
        self.release_all();
        self.send(transport);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<Report>);

    impl HidTransport for Recorder {
        fn send(&mut self, report: &Report) {
            self.0.push(*report);
        }
    }

    #[test]
    fn modifiers_go_to_the_modifier_byte() {
        let mut output = Output::new();
        output.add(Keycode::LShift);
        output.add(Keycode::RAlt);
        assert_eq!(output.report().modifiers, 0x42);
        assert_eq!(output.report().pressed_keys().count(), 0);
        assert!(output.is_any_key_pressed());
    }

    #[test]
    fn saturates_at_six_keys() {
        let mut output = Output::new();
        for key in [
            Keycode::A,
            Keycode::B,
            Keycode::C,
            Keycode::D,
            Keycode::E,
            Keycode::F,
            Keycode::G,
        ] {
            output.add(key);
        }
        assert_eq!(output.report().keys, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn duplicate_keys_take_one_slot() {
        let mut output = Output::new();
        output.add(Keycode::Tab);
        output.add(Keycode::Tab);
        assert_eq!(output.report().pressed_keys().collect::<Vec<_>>(), [Keycode::Tab as u8]);
    }

    #[test]
    fn media_bits_accumulate() {
        let mut output = Output::new();
        output.add_media(MediaKey::VolumeUp);
        output.add_media(MediaKey::Mute);
        assert_eq!(output.report().media, 0x30);
        assert!(output.is_any_key_pressed());
    }

    #[test]
    fn release_all_is_idempotent() {
        let mut output = Output::new();
        output.add(Keycode::A);
        output.release_all();
        let once = *output.report();
        output.release_all();
        assert_eq!(*output.report(), once);
        assert!(!output.is_any_key_pressed());
    }

    #[test]
    fn keyboard_bytes_follow_boot_layout() {
        let mut output = Output::new();
        output.add(Keycode::LCtrl);
        output.add(Keycode::Z);
        assert_eq!(
            output.report().keyboard_bytes(),
            [0x01, 0x00, 0x1D, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn tap_sends_press_then_empty() {
        let mut output = Output::new();
        let mut recorder = Recorder::default();
        let mut waited = 0;
        output.tap(Keycode::Enter, 50, &mut recorder, |ms| waited += ms);
        assert_eq!(waited, 50);
        assert_eq!(recorder.0.len(), 2);
        assert_eq!(recorder.0[0].keys[0], Keycode::Enter as u8);
        assert!(recorder.0[1].is_empty());
    }
}
