//! Host key → device key translation.

use std::fmt;

use tracing::{debug, info, warn};

use crate::control::ControlAction;
use crate::event::{scancode, Edge, HostKey, KeyEvent, Modifiers};

/// Single-byte device codes for the full keypad's non-character keys.
pub mod codes {
    pub const LEFT: u8 = 0x03;
    pub const RIGHT: u8 = 0x04;
    pub const UP: u8 = 0x05;
    pub const DOWN: u8 = 0x06;
    pub const NFC: u8 = 0x0e;
    pub const LAMP: u8 = 0x0f;
    pub const QR: u8 = 0x11;
    pub const HOME: u8 = 0x12;
    pub const END: u8 = 0x13;
    pub const PAGE_UP: u8 = 0x14;
    pub const PAGE_DOWN: u8 = 0x15;
    pub const F1: u8 = 0x16;
    pub const F2: u8 = 0x17;
    pub const F3: u8 = 0x18;
    pub const F4: u8 = 0x19;
    // 0x1a and 0x1b are skipped so ESC stays unambiguous.
    pub const F5: u8 = 0x1c;
    pub const F6: u8 = 0x1d;
}

/// Keys of the numeric keypad, in grid order.
const NUMERIC_GRID: &[u8; 12] = b"123456789x0y";
const GRID_ORIGIN: (i32, i32) = (52, 216);
const GRID_PITCH: i32 = 73;
const GRID_COLUMNS: i32 = 3;
const GRID_ROWS: i32 = 4;

const SHIFT_FROM: &str = "1234567890-=\\`[];',./";
const SHIFT_TO: &str = "!@#$%^&*()_+|~{}:\"<>?";

/// One byte of the firmware's key alphabet. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey(u8);

impl DeviceKey {
    /// Wrap a device code. Zero is reserved for the all-up marker.
    pub fn new(code: u8) -> Option<Self> {
        (code != 0).then_some(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_ascii_graphic() {
            write!(f, "{}", self.0 as char)
        } else {
            write!(f, "0x{:02x}", self.0)
        }
    }
}

/// Which key alphabet the firmware expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keypad {
    /// `0-9`, `x` (cancel) and `y` (ok), plus a clickable on-screen grid.
    Numeric,
    /// Printable ASCII plus navigation, function and a few special keys.
    Full,
}

/// Result of translating one host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    Key { key: DeviceKey, edge: Edge },
    Action(ControlAction),
}

/// A host key and what it becomes, for key-map listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub host: String,
    pub translation: Translation,
}

/// Maps host key events onto one keypad's alphabet.
#[derive(Debug, Clone, Copy)]
pub struct KeyTranslator {
    keypad: Keypad,
}

impl KeyTranslator {
    pub fn new(keypad: Keypad) -> Self {
        Self { keypad }
    }

    pub fn keypad(&self) -> Keypad {
        self.keypad
    }

    /// Translate a key event, or `None` if it means nothing to the device.
    pub fn translate(&self, event: &KeyEvent) -> Option<Translation> {
        let mods = event.modifiers;

        // `mapped` marks device codes produced by a binding table rather
        // than typed by the host.
        let (ch, mapped) = match event.key {
            HostKey::Char(c) => {
                let c = if mods.shift() { shift_up(c) } else { c };
                if mods.alt() {
                    match alt_up(c) {
                        Some(code) => (code as char, true),
                        None => {
                            debug!(key = ?c, "no alt binding");
                            return None;
                        }
                    }
                } else {
                    (c, false)
                }
            }
            HostKey::Scancode(sc) => match self.keypad {
                Keypad::Full => (full_scancode(sc)? as char, true),
                Keypad::Numeric => match numeric_scancode(sc) {
                    Some(c) => (c, true),
                    None => {
                        info!(scancode = sc, "ignoring non-character key");
                        return None;
                    }
                },
            },
        };

        if mods.is_control_accelerator() {
            if event.edge == Edge::Down {
                return ControlAction::from_accelerator(ch).map(Translation::Action);
            }
            return None;
        }

        let key = match self.keypad {
            Keypad::Numeric => numeric_key(ch)?,
            Keypad::Full if mapped => DeviceKey::new(ch as u8)?,
            Keypad::Full => full_key(ch)?,
        };
        Some(Translation::Key {
            key,
            edge: event.edge,
        })
    }

    /// Key under a pointer click at window coordinates, if any.
    pub fn click_to_key(&self, x: i32, y: i32) -> Option<DeviceKey> {
        if self.keypad != Keypad::Numeric {
            return None;
        }
        let col = (x - GRID_ORIGIN.0).div_euclid(GRID_PITCH);
        let row = (y - GRID_ORIGIN.1).div_euclid(GRID_PITCH);
        if !(0..GRID_ROWS).contains(&row) || !(0..GRID_COLUMNS).contains(&col) {
            return None;
        }
        DeviceKey::new(NUMERIC_GRID[(row * GRID_COLUMNS + col) as usize])
    }

    /// The notable host keys of this keypad and what they translate to.
    pub fn bindings(&self) -> Vec<Binding> {
        let mut samples: Vec<(String, KeyEvent)> = Vec::new();
        let plain = |c: char| KeyEvent::down(HostKey::Char(c));
        let scan = |sc: u16| KeyEvent::down(HostKey::Scancode(sc));

        match self.keypad {
            Keypad::Numeric => {
                for c in "0123456789xy".chars() {
                    samples.push((c.to_string(), plain(c)));
                }
                samples.push(("Esc".into(), plain('\x1b')));
                samples.push(("Enter".into(), plain('\r')));
            }
            Keypad::Full => {
                samples.push(("Esc".into(), plain('\x1b')));
                samples.push(("Enter".into(), plain('\r')));
                samples.push(("Tab".into(), plain('\t')));
                samples.push(("Backspace".into(), plain('\x08')));
                for c in ['n', 'q', 'l'] {
                    samples.push((
                        format!("Alt+{}", c.to_ascii_uppercase()),
                        plain(c).with_modifiers(Modifiers::LALT),
                    ));
                }
                for (name, sc) in [
                    ("Home", scancode::HOME),
                    ("End", scancode::END),
                    ("PageUp", scancode::PAGE_UP),
                    ("PageDown", scancode::PAGE_DOWN),
                    ("F1", scancode::F1),
                    ("F2", scancode::F2),
                    ("F3", scancode::F3),
                    ("F4", scancode::F4),
                    ("F5", scancode::F5),
                    ("F6", scancode::F6),
                ] {
                    samples.push((name.into(), scan(sc)));
                }
            }
        }
        for (name, sc) in [
            ("Right", scancode::RIGHT),
            ("Left", scancode::LEFT),
            ("Down", scancode::DOWN),
            ("Up", scancode::UP),
        ] {
            samples.push((name.into(), scan(sc)));
        }
        for action in ControlAction::ALL {
            let c = action.accelerator();
            samples.push((
                format!("Ctrl+{}", c.to_ascii_uppercase()),
                plain(c).with_modifiers(Modifiers::LCTRL),
            ));
        }

        samples
            .into_iter()
            .filter_map(|(host, event)| {
                self.translate(&event)
                    .map(|translation| Binding { host, translation })
            })
            .collect()
    }
}

fn shift_up(c: char) -> char {
    if c.is_ascii_lowercase() {
        return c.to_ascii_uppercase();
    }
    match SHIFT_FROM.chars().position(|f| f == c) {
        Some(i) => SHIFT_TO.chars().nth(i).unwrap_or(c),
        None => c,
    }
}

fn alt_up(c: char) -> Option<u8> {
    match c {
        'n' => Some(codes::NFC),
        'q' => Some(codes::QR),
        'l' => Some(codes::LAMP),
        _ => None,
    }
}

fn full_scancode(sc: u16) -> Option<u8> {
    let code = match sc {
        scancode::LEFT => codes::LEFT,
        scancode::RIGHT => codes::RIGHT,
        scancode::UP => codes::UP,
        scancode::DOWN => codes::DOWN,
        scancode::HOME => codes::HOME,
        scancode::END => codes::END,
        scancode::PAGE_UP => codes::PAGE_UP,
        scancode::PAGE_DOWN => codes::PAGE_DOWN,
        scancode::F1 => codes::F1,
        scancode::F2 => codes::F2,
        scancode::F3 => codes::F3,
        scancode::F4 => codes::F4,
        scancode::F5 => codes::F5,
        scancode::F6 => codes::F6,
        _ => return None,
    };
    Some(code)
}

fn numeric_scancode(sc: u16) -> Option<char> {
    match sc {
        scancode::RIGHT => Some('9'),
        scancode::LEFT => Some('7'),
        scancode::DOWN => Some('8'),
        scancode::UP => Some('5'),
        _ => None,
    }
}

fn numeric_key(ch: char) -> Option<DeviceKey> {
    let ch = match ch {
        '\x1b' => 'x',
        '\r' => 'y',
        c => c,
    };
    if ch.is_ascii() && NUMERIC_GRID.contains(&(ch as u8)) {
        return DeviceKey::new(ch as u8);
    }
    if ch.is_control() {
        debug!(key = ?ch, "dropping control key");
    } else {
        warn!(key = %ch, "invalid key for numeric keypad");
    }
    None
}

fn full_key(ch: char) -> Option<DeviceKey> {
    if !ch.is_ascii() {
        debug!(key = ?ch, "dropping non-ascii key");
        return None;
    }
    if ch.is_ascii_control() && !matches!(ch, '\r' | '\t' | '\x08' | '\x1b') {
        debug!(key = ?ch, "dropping control character");
        return None;
    }
    DeviceKey::new(ch as u8)
}
