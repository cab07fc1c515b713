use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::error::{ProtocolError, Result};

/// Set of currently lit status LEDs.
///
/// Built from one status byte: the high nibble says which LEDs the byte
/// speaks for, the low nibble which of those are lit. Only LEDs present in
/// both are active. The mask is a snapshot, not a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LedMask(u8);

/// How the genuine/caution indicator is drawn. It is never dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenuineLight {
    Green,
    Red,
}

impl LedMask {
    pub const EMPTY: LedMask = LedMask(0);
    pub const GENUINE: LedMask = LedMask(0x1);
    pub const SD_CARD: LedMask = LedMask(0x2);
    pub const USB: LedMask = LedMask(0x4);

    /// Decode a status byte.
    pub fn from_status(status: u8) -> Self {
        Self((status >> 4) & status & 0x0f)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: LedMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn genuine_light(self) -> GenuineLight {
        if self.contains(Self::GENUINE) {
            GenuineLight::Green
        } else {
            GenuineLight::Red
        }
    }

    pub fn sd_card(self) -> bool {
        self.contains(Self::SD_CARD)
    }

    pub fn usb(self) -> bool {
        self.contains(Self::USB)
    }
}

/// Tracks the LED state reported on the LED channel.
#[derive(Debug, Default)]
pub struct LedDecoder {
    current: LedMask,
}

impl LedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently decoded mask.
    pub fn current(&self) -> LedMask {
        self.current
    }

    /// Read one status byte.
    ///
    /// Returns `Ok(None)` when nothing is pending; the current mask is kept.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<Option<LedMask>> {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(ProtocolError::Io(err)),
            }
        }

        let mask = LedMask::from_status(byte[0]);
        debug!(status = byte[0], active = mask.bits(), "led status");
        self.current = mask;
        Ok(Some(mask))
    }
}
