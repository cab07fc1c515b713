use std::io::Write;

use simlink_display::{GenuineLight, LedMask, Palette, PixelBuffer};
use simlink_session::{FrameView, Renderer};

use crate::cmd::RenderArg;

/// Widest art emitted; wider panels are sampled down.
const MAX_COLUMNS: usize = 160;
/// Colors at or above this brightness draw as ink.
const LIT_LUMA: u8 = 128;

fn lit(pixels: &PixelBuffer, palette: &Palette, x: usize, y: usize) -> bool {
    y < pixels.height() && palette.color(pixels.get(x, y)).luma() >= LIT_LUMA
}

/// Draw a frame with half-block characters, two pixel rows per line.
pub fn half_blocks(pixels: &PixelBuffer, palette: &Palette) -> String {
    let step = pixels.width().div_ceil(MAX_COLUMNS).max(1);
    let mut art = String::new();

    for y in (0..pixels.height()).step_by(2 * step) {
        for x in (0..pixels.width()).step_by(step) {
            let top = lit(pixels, palette, x, y);
            let bottom = lit(pixels, palette, x, y + step);
            art.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        art.push('\n');
    }
    art
}

pub fn led_line(leds: LedMask) -> String {
    let genuine = match leds.genuine_light() {
        GenuineLight::Green => "genuine:green",
        GenuineLight::Red => "genuine:red",
    };
    let mut line = genuine.to_string();
    if leds.sd_card() {
        line.push_str(" sd");
    }
    if leds.usb() {
        line.push_str(" usb");
    }
    line
}

/// Redraws the whole frame in place on stdout.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    frames: u64,
}

impl Renderer for TerminalRenderer {
    fn present(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        let mut out = std::io::stdout().lock();
        let _ = writeln!(
            out,
            "\x1b[H\x1b[2J{}{}",
            half_blocks(frame.pixels, frame.palette),
            led_line(frame.leds)
        );
        let _ = out.flush();
    }
}

/// Renderer picked on the command line.
#[derive(Debug)]
pub enum RenderTarget {
    None,
    Terminal(TerminalRenderer),
}

impl From<RenderArg> for RenderTarget {
    fn from(arg: RenderArg) -> Self {
        match arg {
            RenderArg::None => Self::None,
            RenderArg::Terminal => Self::Terminal(TerminalRenderer::default()),
        }
    }
}

impl Renderer for RenderTarget {
    fn present(&mut self, frame: &FrameView<'_>) {
        match self {
            Self::None => {}
            Self::Terminal(renderer) => renderer.present(frame),
        }
    }
}
