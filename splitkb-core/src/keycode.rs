//! USB HID key codes and host-layout label aliases.

/// USB HID keycodes.
/// See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Keycode {
    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Numbers
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control keys
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    LBracket = 0x2F,
    RBracket = 0x30,
    Backslash = 0x31,
    /// Non-US # and ~ (ISO key left of Enter)
    NonUsHash = 0x32,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,

    // Function keys
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Keypad
    NumLock = 0x53,
    KpSlash = 0x54,
    KpAsterisk = 0x55,
    KpMinus = 0x56,
    KpPlus = 0x57,
    KpEnter = 0x58,
    Kp1 = 0x59,
    Kp2 = 0x5A,
    Kp3 = 0x5B,
    Kp4 = 0x5C,
    Kp5 = 0x5D,
    Kp6 = 0x5E,
    Kp7 = 0x5F,
    Kp8 = 0x60,
    Kp9 = 0x61,
    Kp0 = 0x62,
    KpDot = 0x63,

    /// Non-US \ and | (ISO key left of Z, produces < > on AZERTY)
    NonUsBackslash = 0x64,
    Menu = 0x65,

    // Modifiers (used in the modifier byte, not in keycode array)
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,
}

impl Keycode {
    /// Check if this keycode is a modifier (LCtrl..RGui).
    pub fn is_modifier(self) -> bool {
        let v = self as u8;
        (0xE0..=0xE7).contains(&v)
    }

    /// Get the modifier bit mask (bit 0 = LCtrl, bit 7 = RGui).
    pub fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self as u8 - 0xE0)
        } else {
            0
        }
    }

    /// Display name for use in layout visualizations, as printed on an
    /// AZERTY keycap.
    pub fn display_name(self) -> &'static str {
        match self {
            Keycode::A => "Q",
            Keycode::B => "B",
            Keycode::C => "C",
            Keycode::D => "D",
            Keycode::E => "E",
            Keycode::F => "F",
            Keycode::G => "G",
            Keycode::H => "H",
            Keycode::I => "I",
            Keycode::J => "J",
            Keycode::K => "K",
            Keycode::L => "L",
            Keycode::M => ",",
            Keycode::N => "N",
            Keycode::O => "O",
            Keycode::P => "P",
            Keycode::Q => "A",
            Keycode::R => "R",
            Keycode::S => "S",
            Keycode::T => "T",
            Keycode::U => "U",
            Keycode::V => "V",
            Keycode::W => "Z",
            Keycode::X => "X",
            Keycode::Y => "Y",
            Keycode::Z => "W",
            Keycode::N1 => "&",
            Keycode::N2 => "\u{e9}",
            Keycode::N3 => "\"",
            Keycode::N4 => "'",
            Keycode::N5 => "(",
            Keycode::N6 => "-",
            Keycode::N7 => "\u{e8}",
            Keycode::N8 => "_",
            Keycode::N9 => "\u{e7}",
            Keycode::N0 => "\u{e0}",
            Keycode::Enter => "Ent",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Spc",
            Keycode::Minus => ")",
            Keycode::Equal => "=",
            Keycode::LBracket => "^",
            Keycode::RBracket => "$",
            Keycode::Backslash => "\\",
            Keycode::NonUsHash => "*",
            Keycode::Semicolon => "M",
            Keycode::Quote => "\u{f9}",
            Keycode::Grave => "\u{b2}",
            Keycode::Comma => ";",
            Keycode::Dot => ":",
            Keycode::Slash => "!",
            Keycode::CapsLock => "Caps",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::F5 => "F5",
            Keycode::F6 => "F6",
            Keycode::F7 => "F7",
            Keycode::F8 => "F8",
            Keycode::F9 => "F9",
            Keycode::F10 => "F10",
            Keycode::F11 => "F11",
            Keycode::F12 => "F12",
            Keycode::PrintScreen => "PScr",
            Keycode::ScrollLock => "ScrL",
            Keycode::Pause => "Paus",
            Keycode::Insert => "Ins",
            Keycode::Home => "Home",
            Keycode::PageUp => "PgUp",
            Keycode::Delete => "Del",
            Keycode::End => "End",
            Keycode::PageDown => "PgDn",
            Keycode::Right => "\u{2192}",
            Keycode::Left => "\u{2190}",
            Keycode::Down => "\u{2193}",
            Keycode::Up => "\u{2191}",
            Keycode::NumLock => "Num",
            Keycode::KpSlash => "/",
            Keycode::KpAsterisk => "*",
            Keycode::KpMinus => "-",
            Keycode::KpPlus => "+",
            Keycode::KpEnter => "KEnt",
            Keycode::Kp1 => "1",
            Keycode::Kp2 => "2",
            Keycode::Kp3 => "3",
            Keycode::Kp4 => "4",
            Keycode::Kp5 => "5",
            Keycode::Kp6 => "6",
            Keycode::Kp7 => "7",
            Keycode::Kp8 => "8",
            Keycode::Kp9 => "9",
            Keycode::Kp0 => "0",
            Keycode::KpDot => ".",
            Keycode::NonUsBackslash => "<>",
            Keycode::Menu => "Menu",
            Keycode::LCtrl => "Ctrl",
            Keycode::LShift => "Shft",
            Keycode::LAlt => "Alt",
            Keycode::LGui => "Win",
            Keycode::RCtrl => "RCtl",
            Keycode::RShift => "RSft",
            Keycode::RAlt => "AltG",
            Keycode::RGui => "RWin",
        }
    }
}

/// Consumer-page keys carried in the media report, one bit each.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MediaKey {
    NextTrack = 0x01,
    PreviousTrack = 0x02,
    Stop = 0x04,
    PlayPause = 0x08,
    Mute = 0x10,
    VolumeUp = 0x20,
    VolumeDown = 0x40,
}

impl MediaKey {
    /// Bit of this key in the media report byte.
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MediaKey::NextTrack => "Next",
            MediaKey::PreviousTrack => "Prev",
            MediaKey::Stop => "Stop",
            MediaKey::PlayPause => "Play",
            MediaKey::Mute => "Mute",
            MediaKey::VolumeUp => "Vol+",
            MediaKey::VolumeDown => "Vol-",
        }
    }
}

/// Maps AZERTY (French) key labels to their HID keycodes.
///
/// HID keycodes name the physical US position; the host applies its input
/// language on top. These aliases let the layer tables be written with the
/// labels printed on an AZERTY keyboard.
pub mod azerty {
    use super::Keycode;

    pub const A: Keycode = Keycode::Q;
    pub const Z: Keycode = Keycode::W;
    pub const Q: Keycode = Keycode::A;
    pub const W: Keycode = Keycode::Z;
    pub const M: Keycode = Keycode::Semicolon;

    /// `,` (unshifted) / `?` (shifted)
    pub const COMMA: Keycode = Keycode::M;
    /// `;` (unshifted) / `.` (shifted)
    pub const SEMICOLON: Keycode = Keycode::Comma;
    /// `:` (unshifted) / `/` (shifted)
    pub const COLON: Keycode = Keycode::Dot;
    /// `!` (unshifted) / `§` (shifted)
    pub const EXCLAIM: Keycode = Keycode::Slash;
    /// `ù` (unshifted) / `%` (shifted)
    pub const U_GRAVE: Keycode = Keycode::Quote;
    /// `^` dead key (unshifted) / `¨` (shifted)
    pub const CARET: Keycode = Keycode::LBracket;
    /// `$` (unshifted) / `£` (shifted)
    pub const DOLLAR: Keycode = Keycode::RBracket;
    /// `*` (unshifted) / `µ` (shifted)
    pub const ASTERISK: Keycode = Keycode::NonUsHash;
    /// `<` (unshifted) / `>` (shifted)
    pub const ANGLE_BRACKETS: Keycode = Keycode::NonUsBackslash;
    /// `)` (unshifted) / `°` (shifted), `]` with AltGr
    pub const RPAREN: Keycode = Keycode::Minus;
    /// `=` (unshifted) / `+` (shifted), `}` with AltGr
    pub const EQUAL: Keycode = Keycode::Equal;

    // Number row, unshifted symbols. Digits need Shift on AZERTY.
    /// `&` / `1`
    pub const AMPERSAND: Keycode = Keycode::N1;
    /// `é` / `2`, `~` with AltGr
    pub const E_ACUTE: Keycode = Keycode::N2;
    /// `"` / `3`, `#` with AltGr
    pub const DQUOTE: Keycode = Keycode::N3;
    /// `'` / `4`, `{` with AltGr
    pub const APOSTROPHE: Keycode = Keycode::N4;
    /// `(` / `5`, `[` with AltGr
    pub const LPAREN: Keycode = Keycode::N5;
    /// `-` / `6`, `|` with AltGr
    pub const MINUS: Keycode = Keycode::N6;
    /// `è` / `7`, `` ` `` with AltGr
    pub const E_GRAVE: Keycode = Keycode::N7;
    /// `_` / `8`, `\` with AltGr
    pub const UNDERSCORE: Keycode = Keycode::N8;
    /// `ç` / `9`
    pub const C_CEDILLA: Keycode = Keycode::N9;
    /// `à` / `0`, `@` with AltGr
    pub const A_GRAVE: Keycode = Keycode::N0;
}
