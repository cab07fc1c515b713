use tracing::trace;

use crate::keys::DeviceKey;

/// Byte written to key-out when the last held key is released.
pub const ALL_UP: u8 = 0x00;

/// The set of device keys currently held.
///
/// Only transitions produce output: a key already held emits nothing on a
/// repeated press, and the all-up marker is emitted once when the set goes
/// from non-empty to empty.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pressed: Vec<DeviceKey>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as held. Returns the byte to send, if any.
    pub fn press(&mut self, key: DeviceKey) -> Option<u8> {
        if self.pressed.contains(&key) {
            trace!(%key, "ignoring key repeat");
            return None;
        }
        self.pressed.push(key);
        Some(key.code())
    }

    /// Mark `key` as released. Returns [`ALL_UP`] when nothing is left held.
    pub fn release(&mut self, key: DeviceKey) -> Option<u8> {
        let before = self.pressed.len();
        self.pressed.retain(|&k| k != key);
        self.emptied(before)
    }

    /// Release everything, e.g. when the pointer lifts.
    pub fn release_all(&mut self) -> Option<u8> {
        let before = self.pressed.len();
        self.pressed.clear();
        self.emptied(before)
    }

    fn emptied(&self, before: usize) -> Option<u8> {
        (before > 0 && self.pressed.is_empty()).then_some(ALL_UP)
    }

    pub fn is_pressed(&self, key: DeviceKey) -> bool {
        self.pressed.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }

    /// Held keys in press order.
    pub fn iter(&self) -> impl Iterator<Item = DeviceKey> + '_ {
        self.pressed.iter().copied()
    }
}
