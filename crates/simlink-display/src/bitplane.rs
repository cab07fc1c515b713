use std::io::{ErrorKind, Read};

use tracing::{debug, trace};

use crate::error::{ProtocolError, Result};
use crate::pixels::{Palette, PixelBuffer};

/// Panel width in pixels.
pub const WIDTH: usize = 128;
/// Panel height in pixels.
pub const HEIGHT: usize = 64;
/// Bytes in one full frame: one bit per pixel.
pub const FRAME_SIZE: usize = WIDTH * HEIGHT / 8;
/// Upper bound for a single read; must exceed one frame so a backlog can be
/// skipped in one pass.
pub const READ_LIMIT: usize = FRAME_SIZE * 1000;

const ROWS_PER_BAND: usize = 8;

/// Decoder for the 128×64 monochrome panel.
///
/// Each update is a complete frame. Rows are grouped in bands of eight: byte
/// `band * 128 + x` holds column `x` of rows `band * 8 ..= band * 8 + 7`,
/// least-significant bit at the top.
pub struct BitplaneDecoder {
    pixels: PixelBuffer,
    palette: Palette,
    scratch: Vec<u8>,
}

impl Default for BitplaneDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BitplaneDecoder {
    pub fn new() -> Self {
        Self {
            pixels: PixelBuffer::new(WIDTH, HEIGHT),
            palette: Palette::monochrome(),
            scratch: Vec::new(),
        }
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Perform one read of whatever is pending and apply it.
    ///
    /// Returns `Ok(false)` if nothing was available.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> Result<bool> {
        if self.scratch.len() < READ_LIMIT {
            self.scratch.resize(READ_LIMIT, 0);
        }

        let read = loop {
            match reader.read(&mut self.scratch) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(err) => return Err(ProtocolError::Io(err)),
            }
        };

        apply_frame(&mut self.pixels, &self.scratch[..read])
    }

    /// Apply raw update bytes.
    ///
    /// Empty input is a no-op. If more than one frame is present only the
    /// last [`FRAME_SIZE`] bytes are used; fewer than that is fatal.
    pub fn apply(&mut self, data: &[u8]) -> Result<bool> {
        apply_frame(&mut self.pixels, data)
    }
}

fn apply_frame(pixels: &mut PixelBuffer, data: &[u8]) -> Result<bool> {
    if data.is_empty() {
        return Ok(false);
    }
    if data.len() < FRAME_SIZE {
        return Err(ProtocolError::ShortFrame {
            len: data.len(),
            expected: FRAME_SIZE,
        });
    }
    if data.len() > FRAME_SIZE {
        debug!(
            discarded = data.len() - FRAME_SIZE,
            "skipping display backlog"
        );
    }

    let frame = &data[data.len() - FRAME_SIZE..];
    for (band, columns) in frame.chunks_exact(WIDTH).enumerate() {
        for (x, &bits) in columns.iter().enumerate() {
            for i in 0..ROWS_PER_BAND {
                let index = if bits & (1 << i) != 0 {
                    Palette::FOREGROUND
                } else {
                    Palette::BACKGROUND
                };
                pixels.set(x, band * ROWS_PER_BAND + i, index);
            }
        }
    }

    trace!("applied monochrome frame");
    Ok(true)
}
