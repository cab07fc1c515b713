use std::io::Read;
use std::time::Duration;

use crate::bitplane::BitplaneDecoder;
use crate::error::Result;
use crate::indexed::IndexedDecoder;
use crate::pixels::{Palette, PixelBuffer};

/// Default time a started update record may stall before it is fatal.
pub const DEFAULT_PAYLOAD_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for display decoders.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// How long a partially received indexed record may stall. Default: 250ms.
    pub payload_timeout: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            payload_timeout: DEFAULT_PAYLOAD_TIMEOUT,
        }
    }
}

/// The display decoder of one device, chosen once at startup.
///
/// The two panel protocols share no decoding logic.
pub enum Decoder {
    Bitplane(BitplaneDecoder),
    Indexed(IndexedDecoder),
}

impl Decoder {
    /// Read pending display traffic.
    ///
    /// Returns true if the pixel buffer changed.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<bool> {
        match self {
            Decoder::Bitplane(decoder) => decoder.read_from(reader),
            Decoder::Indexed(decoder) => Ok(decoder.apply(reader)? > 0),
        }
    }

    pub fn pixels(&self) -> &PixelBuffer {
        match self {
            Decoder::Bitplane(decoder) => decoder.pixels(),
            Decoder::Indexed(decoder) => decoder.pixels(),
        }
    }

    pub fn palette(&self) -> &Palette {
        match self {
            Decoder::Bitplane(decoder) => decoder.palette(),
            Decoder::Indexed(decoder) => decoder.palette(),
        }
    }

    /// Short name of the wire encoding.
    pub fn encoding(&self) -> &'static str {
        match self {
            Decoder::Bitplane(_) => "bitplane",
            Decoder::Indexed(_) => "indexed",
        }
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("encoding", &self.encoding())
            .field("width", &self.pixels().width())
            .field("height", &self.pixels().height())
            .finish()
    }
}
