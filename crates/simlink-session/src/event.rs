//! Host input events, as delivered by a window system or terminal.

use std::ops::BitOr;

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Down,
    Up,
}

/// The key a host event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKey {
    /// A key with a character form, control characters included.
    Char(char),
    /// A key with no character form, identified by its USB HID scancode.
    Scancode(u16),
}

/// USB HID scancodes for the non-character keys the bridge understands.
pub mod scancode {
    pub const F1: u16 = 58;
    pub const F2: u16 = 59;
    pub const F3: u16 = 60;
    pub const F4: u16 = 61;
    pub const F5: u16 = 62;
    pub const F6: u16 = 63;
    pub const HOME: u16 = 74;
    pub const PAGE_UP: u16 = 75;
    pub const END: u16 = 77;
    pub const PAGE_DOWN: u16 = 78;
    pub const RIGHT: u16 = 79;
    pub const LEFT: u16 = 80;
    pub const DOWN: u16 = 81;
    pub const UP: u16 = 82;
}

/// Raw host modifier bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const LSHIFT: Modifiers = Modifiers(0x0001);
    pub const RSHIFT: Modifiers = Modifiers(0x0002);
    pub const LCTRL: Modifiers = Modifiers(0x0040);
    pub const RCTRL: Modifiers = Modifiers(0x0080);
    pub const LALT: Modifiers = Modifiers(0x0100);
    pub const RALT: Modifiers = Modifiers(0x0200);

    const SHIFT_MASK: u16 = 0x0003;
    const ALT_MASK: u16 = 0x0300;
    // Shift, control, alt and GUI; lock states (num/caps) sit above this.
    const HELD_MASK: u16 = 0x0fff;

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn shift(self) -> bool {
        self.0 & Self::SHIFT_MASK != 0
    }

    pub fn alt(self) -> bool {
        self.0 & Self::ALT_MASK != 0
    }

    /// True when left control is the only modifier held.
    pub fn is_control_accelerator(self) -> bool {
        self.0 & Self::HELD_MASK == Self::LCTRL.0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

/// A key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub edge: Edge,
    pub key: HostKey,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(edge: Edge, key: HostKey, modifiers: Modifiers) -> Self {
        Self {
            edge,
            key,
            modifiers,
        }
    }

    pub fn down(key: HostKey) -> Self {
        Self::new(Edge::Down, key, Modifiers::NONE)
    }

    pub fn up(key: HostKey) -> Self {
        Self::new(Edge::Up, key, Modifiers::NONE)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Anything the host can tell the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Key(KeyEvent),
    /// Pointer pressed at window coordinates.
    PointerDown { x: i32, y: i32 },
    /// Pointer released anywhere.
    PointerUp,
    /// Window closed or the operator asked to stop.
    Quit,
}
