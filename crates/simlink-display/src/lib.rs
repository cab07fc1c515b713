//! Display-side wire protocol of the simulated device.
//!
//! The firmware pushes raw framebuffer updates and LED status bytes; this
//! crate turns them into pixel state:
//! - [`BitplaneDecoder`]: 128×64 monochrome, one full 1024-byte frame per
//!   update, only the most recent frame of a backlog is kept
//! - [`IndexedDecoder`]: 320×240, 16-color palette, a batch of
//!   rectangle records (`<4H` header + one index byte per pixel)
//! - [`LedDecoder`]: single status bytes → [`LedMask`]
//!
//! Empty reads are never errors. Anything that breaks framing is fatal,
//! since the stream has no resynchronization marker.

pub mod bitplane;
pub mod decoder;
pub mod error;
pub mod indexed;
pub mod led;
pub mod pixels;

pub use bitplane::BitplaneDecoder;
pub use decoder::{Decoder, DecoderConfig};
pub use error::{ProtocolError, Result};
pub use indexed::{IndexedDecoder, UpdateRect};
pub use led::{GenuineLight, LedDecoder, LedMask};
pub use pixels::{Palette, PixelBuffer, Rgb, PALETTE_SIZE};
