use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simlink_display::{BitplaneDecoder, Decoder, DecoderConfig, IndexedDecoder};

use crate::keys::Keypad;

/// The simulated hardware. Fixes the display encoding and key alphabet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    /// 128×64 monochrome panel, numeric keypad.
    #[default]
    Mk4,
    /// 320×240 color panel, full keyboard.
    Q1,
}

impl DeviceModel {
    pub fn name(self) -> &'static str {
        match self {
            Self::Mk4 => "mk4",
            Self::Q1 => "q1",
        }
    }

    pub fn keypad(self) -> Keypad {
        match self {
            Self::Mk4 => Keypad::Numeric,
            Self::Q1 => Keypad::Full,
        }
    }

    /// A fresh display decoder for this model.
    pub fn decoder(self, config: DecoderConfig) -> Decoder {
        match self {
            Self::Mk4 => Decoder::Bitplane(BitplaneDecoder::new()),
            Self::Q1 => Decoder::Indexed(IndexedDecoder::with_config(config)),
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mk4" => Ok(Self::Mk4),
            "q1" => Ok(Self::Q1),
            other => Err(format!("unknown device model: {other}")),
        }
    }
}
