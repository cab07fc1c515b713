use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::Buf;
use tracing::trace;

use crate::decoder::DecoderConfig;
use crate::error::{ProtocolError, Result};
use crate::pixels::{Palette, PixelBuffer};

/// Panel width in pixels.
pub const WIDTH: usize = 320;
/// Panel height in pixels.
pub const HEIGHT: usize = 240;
/// Record header: X, Y, width, height as little-endian `u16`.
pub const HEADER_SIZE: usize = 8;

const RETRY_INTERVAL: Duration = Duration::from_micros(200);

/// Target rectangle of one update record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl UpdateRect {
    /// Parse a record header.
    ///
    /// Wire format:
    /// ```text
    /// ┌─────────┬─────────┬─────────┬─────────┬──────────────────────┐
    /// │ X (2B)  │ Y (2B)  │ W (2B)  │ H (2B)  │ W*H index bytes      │
    /// │ LE      │ LE      │ LE      │ LE      │ low nibble = index   │
    /// └─────────┴─────────┴─────────┴─────────┴──────────────────────┘
    /// ```
    pub fn parse(header: &[u8; HEADER_SIZE]) -> Self {
        let mut buf = &header[..];
        Self {
            x: buf.get_u16_le(),
            y: buf.get_u16_le(),
            width: buf.get_u16_le(),
            height: buf.get_u16_le(),
        }
    }

    /// Number of payload bytes following the header.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn check_bounds(&self) -> Result<()> {
        if self.x as usize + self.width as usize > WIDTH
            || self.y as usize + self.height as usize > HEIGHT
        {
            return Err(ProtocolError::OutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                max_width: WIDTH,
                max_height: HEIGHT,
            });
        }
        Ok(())
    }
}

/// Decoder for the 320×240 palette panel.
///
/// A batch is any number of rectangle records. Decoding stops cleanly when
/// the channel has nothing more at a record boundary; a record that starts
/// but cannot be completed is fatal.
pub struct IndexedDecoder {
    pixels: PixelBuffer,
    palette: Palette,
    config: DecoderConfig,
    payload: Vec<u8>,
}

impl Default for IndexedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexedDecoder {
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            pixels: PixelBuffer::new(WIDTH, HEIGHT),
            palette: Palette::indexed(),
            config,
            payload: Vec::new(),
        }
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Consume every complete record currently available.
    ///
    /// Returns the number of non-empty rectangles applied.
    pub fn apply<R: Read>(&mut self, reader: &mut R) -> Result<usize> {
        let mut applied = 0usize;

        loop {
            let mut header = [0u8; HEADER_SIZE];
            let got = fill(reader, &mut header, self.config.payload_timeout, false)?;
            if got == 0 {
                return Ok(applied);
            }
            if got < HEADER_SIZE {
                return Err(ProtocolError::TruncatedHeader {
                    got,
                    expected: HEADER_SIZE,
                });
            }

            let rect = UpdateRect::parse(&header);
            if rect.is_empty() {
                trace!(?rect, "skipping empty update");
                continue;
            }
            rect.check_bounds()?;

            let expected = rect.area();
            self.payload.resize(expected, 0);
            let got = fill(reader, &mut self.payload, self.config.payload_timeout, true)?;
            if got != expected {
                return Err(ProtocolError::TruncatedPayload { got, expected });
            }

            let (x, w) = (rect.x as usize, rect.width as usize);
            for (row, src) in self.payload.chunks_exact(w).enumerate() {
                let dst = &mut self.pixels.row_mut(rect.y as usize + row)[x..x + w];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = s & 0x0f;
                }
            }

            trace!(?rect, "applied indexed update");
            applied += 1;
        }
    }
}

/// Read until `buf` is full, the stream ends, or it stalls.
///
/// With `started == false` a stream with nothing pending returns 0 at once.
/// Otherwise a stalled stream is retried until `timeout` has passed since
/// the first stall.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8], timeout: Duration, started: bool) -> Result<usize> {
    let mut filled = 0usize;
    let mut deadline: Option<Instant> = None;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                if filled == 0 && !started {
                    break;
                }
                let deadline = *deadline.get_or_insert_with(|| Instant::now() + timeout);
                if Instant::now() >= deadline {
                    break;
                }
                std::thread::sleep(RETRY_INTERVAL);
            }
            Err(err) => return Err(ProtocolError::Io(err)),
        }
    }

    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;

    fn record(x: u16, y: u16, w: u16, h: u16, payload: &[u8], dst: &mut BytesMut) {
        dst.put_u16_le(x);
        dst.put_u16_le(y);
        dst.put_u16_le(w);
        dst.put_u16_le(h);
        dst.put_slice(payload);
    }

    fn fast() -> IndexedDecoder {
        IndexedDecoder::with_config(DecoderConfig {
            payload_timeout: Duration::from_millis(5),
        })
    }

    #[test]
    fn parse_header_little_endian() {
        let rect = UpdateRect::parse(&[0x10, 0x01, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00]);
        assert_eq!(
            rect,
            UpdateRect {
                x: 0x110,
                y: 2,
                width: 3,
                height: 4
            }
        );
        assert_eq!(rect.area(), 12);
    }

    #[test]
    fn empty_stream_is_noop() {
        let mut decoder = IndexedDecoder::new();
        let applied = decoder.apply(&mut Cursor::new(Vec::new())).unwrap();
        assert_eq!(applied, 0);
    }

    #[test]
    fn applies_rectangle_row_major() {
        let mut wire = BytesMut::new();
        record(10, 20, 3, 2, &[1, 2, 3, 4, 5, 6], &mut wire);

        let mut decoder = IndexedDecoder::new();
        let applied = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap();
        assert_eq!(applied, 1);

        let px = decoder.pixels();
        assert_eq!(&px.row(20)[10..13], &[1, 2, 3]);
        assert_eq!(&px.row(21)[10..13], &[4, 5, 6]);
        assert_eq!(px.get(9, 20), 0);
        assert_eq!(px.get(13, 21), 0);
    }

    #[test]
    fn only_low_nibble_is_kept() {
        let mut wire = BytesMut::new();
        record(0, 0, 2, 1, &[0xf3, 0x2f], &mut wire);

        let mut decoder = IndexedDecoder::new();
        decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap();
        assert_eq!(decoder.pixels().row(0)[..2], [0x3, 0xf]);
    }

    #[test]
    fn consumes_multiple_records_in_one_batch() {
        let mut wire = BytesMut::new();
        record(0, 0, 1, 1, &[7], &mut wire);
        record(319, 239, 1, 1, &[9], &mut wire);
        record(0, 0, 1, 1, &[8], &mut wire);

        let mut decoder = IndexedDecoder::new();
        let applied = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap();
        assert_eq!(applied, 3);
        assert_eq!(decoder.pixels().get(0, 0), 8);
        assert_eq!(decoder.pixels().get(319, 239), 9);
    }

    #[test]
    fn full_screen_update() {
        let payload = vec![0x05u8; WIDTH * HEIGHT];
        let mut wire = BytesMut::new();
        record(0, 0, WIDTH as u16, HEIGHT as u16, &payload, &mut wire);

        let mut decoder = IndexedDecoder::new();
        decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap();
        assert_eq!(decoder.pixels().histogram()[5], WIDTH * HEIGHT);
    }

    #[test]
    fn zero_width_or_height_is_degenerate_noop() {
        let mut wire = BytesMut::new();
        record(5, 5, 0, 10, &[], &mut wire);
        record(5, 5, 10, 0, &[], &mut wire);
        record(400, 300, 0, 0, &[], &mut wire);

        let mut decoder = IndexedDecoder::new();
        let applied = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap();
        assert_eq!(applied, 0);
        assert_eq!(decoder.pixels().histogram()[0], WIDTH * HEIGHT);
    }

    #[test]
    fn rectangle_past_right_edge_is_fatal() {
        let mut wire = BytesMut::new();
        record(300, 0, 21, 1, &[0; 21], &mut wire);

        let mut decoder = IndexedDecoder::new();
        let err = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::OutOfBounds {
                x: 300,
                width: 21,
                ..
            }
        ));
    }

    #[test]
    fn rectangle_past_bottom_edge_is_fatal() {
        let mut wire = BytesMut::new();
        record(0, 240, 1, 1, &[0], &mut wire);

        let mut decoder = IndexedDecoder::new();
        let err = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::OutOfBounds { y: 240, .. }));
    }

    #[test]
    fn huge_coordinates_do_not_overflow() {
        let mut wire = BytesMut::new();
        record(u16::MAX, u16::MAX, u16::MAX, u16::MAX, &[], &mut wire);

        let mut decoder = fast();
        let err = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::OutOfBounds { .. }));
    }

    #[test]
    fn truncated_header_is_fatal() {
        let mut decoder = fast();
        let err = decoder
            .apply(&mut Cursor::new(vec![0u8, 0, 1]))
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedHeader {
                got: 3,
                expected: 8
            }
        ));
    }

    #[test]
    fn truncated_payload_is_fatal() {
        let mut wire = BytesMut::new();
        record(0, 0, 4, 4, &[1; 10], &mut wire);

        let mut decoder = fast();
        let err = decoder.apply(&mut Cursor::new(wire.to_vec())).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedPayload {
                got: 10,
                expected: 16
            }
        ));
    }

    #[test]
    fn stalled_payload_times_out() {
        let mut wire = BytesMut::new();
        record(0, 0, 2, 2, &[1, 1], &mut wire);
        let mut reader = DataThenWouldBlock {
            bytes: wire.to_vec(),
            pos: 0,
        };

        let mut decoder = fast();
        let err = decoder.apply(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TruncatedPayload {
                got: 2,
                expected: 4
            }
        ));
    }

    #[test]
    fn would_block_at_boundary_ends_batch() {
        let mut wire = BytesMut::new();
        record(1, 1, 1, 1, &[4], &mut wire);
        let mut reader = DataThenWouldBlock {
            bytes: wire.to_vec(),
            pos: 0,
        };

        let mut decoder = fast();
        assert_eq!(decoder.apply(&mut reader).unwrap(), 1);
        assert_eq!(decoder.pixels().get(1, 1), 4);
    }

    #[test]
    fn byte_by_byte_delivery_is_reassembled() {
        let mut wire = BytesMut::new();
        record(2, 3, 2, 1, &[6, 7], &mut wire);
        let mut reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };

        let mut decoder = IndexedDecoder::new();
        assert_eq!(decoder.apply(&mut reader).unwrap(), 1);
        assert_eq!(decoder.pixels().row(3)[2..4], [6, 7]);
    }

    #[test]
    fn payload_split_across_pipe_writes() {
        use std::io::Write;

        use simlink_channel::{pipe, Channel, ChannelKind};

        let p = pipe().unwrap();
        let mut rx = Channel::new(ChannelKind::DisplayIn, p.read);
        let mut tx = Channel::new(ChannelKind::KeyOut, p.write);
        rx.set_nonblocking(true).unwrap();

        let mut wire = BytesMut::new();
        record(0, 0, 4, 1, &[1, 2, 3, 4], &mut wire);
        let wire = wire.to_vec();

        // The decoder starts with only part of the payload pending.
        tx.write_all(&wire[..10]).unwrap();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            tx.write_all(&wire[10..]).unwrap();
        });

        let mut decoder = IndexedDecoder::new();
        let applied = decoder.apply(&mut rx).unwrap();
        writer.join().unwrap();

        assert_eq!(applied, 1);
        assert_eq!(decoder.pixels().row(0)[..4], [1, 2, 3, 4]);
    }

    struct DataThenWouldBlock {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for DataThenWouldBlock {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }
}
