/// Number of entries in every palette.
pub const PALETTE_SIZE: usize = 16;

/// An opaque 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a `0xRRGGBB` literal.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    /// Approximate perceived brightness (0-255).
    pub fn luma(self) -> u8 {
        ((self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114) / 1000) as u8
    }
}

const INDEXED_COLORS: [u32; PALETTE_SIZE] = [
    0x000000, 0xffffff, // background / foreground
    0xff0000, 0x00ff00, 0x0000ff, // primaries
    0x555555, 0x999999, 0xdddddd, 0x111111, 0x151515, 0x191919, 0x1d1d1d, // greys
    0x220000, 0x440000, 0x880000, // unassigned
    0xf16422, // brand accent
];

const MONO_BACKGROUND: u32 = 0x111111;
const MONO_FOREGROUND: u32 = 0xccccff;

/// A fixed table of 16 colors addressed by 4-bit pixel indices.
///
/// Index 0 is the background and index 1 the foreground on every panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
}

impl Palette {
    pub const BACKGROUND: u8 = 0;
    pub const FOREGROUND: u8 = 1;

    pub fn new(colors: [Rgb; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    /// Palette of the 320×240 color panel.
    pub fn indexed() -> Self {
        Self::new(INDEXED_COLORS.map(Rgb::from_hex))
    }

    /// Palette of the 128×64 monochrome panel. Only indices 0 and 1 are
    /// ever produced; the rest repeat the background.
    pub fn monochrome() -> Self {
        let mut colors = [Rgb::from_hex(MONO_BACKGROUND); PALETTE_SIZE];
        colors[Self::FOREGROUND as usize] = Rgb::from_hex(MONO_FOREGROUND);
        Self::new(colors)
    }

    /// Look up a pixel index; only the low 4 bits are significant.
    pub fn color(&self, index: u8) -> Rgb {
        self.colors[(index & 0x0f) as usize]
    }

    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }
}

/// A fixed-size grid of palette indices, stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// A buffer filled with the background index.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Palette::BACKGROUND; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Palette index at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is outside the buffer.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "pixel ({x},{y}) out of range");
        self.pixels[y * self.width + x]
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, index: u8) {
        self.pixels[y * self.width + x] = index;
    }

    pub(crate) fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }

    /// One row of palette indices.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    /// All rows, top to bottom.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        self.pixels.chunks_exact(self.width)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.pixels
    }

    /// Count of pixels per palette index.
    pub fn histogram(&self) -> [usize; PALETTE_SIZE] {
        let mut counts = [0usize; PALETTE_SIZE];
        for &index in &self.pixels {
            counts[(index & 0x0f) as usize] += 1;
        }
        counts
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
