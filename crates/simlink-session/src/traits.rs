//! Seams between the session loop and its surroundings.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::process::ExitStatus;

use serde::Serialize;
use simlink_channel::Channel;
use simlink_display::{LedMask, Palette, PixelBuffer};

use crate::event::HostEvent;
use crate::record::RecordedFrame;

/// What a renderer is asked to show.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub pixels: &'a PixelBuffer,
    pub palette: &'a Palette,
    pub leds: LedMask,
}

/// Presents composed frames. Called once at startup and after every
/// display or LED update.
pub trait Renderer {
    fn present(&mut self, frame: &FrameView<'_>);
}

/// Carries out operator commands that leave the session running.
pub trait ControlHandler {
    fn snapshot(&mut self, frame: &FrameView<'_>);

    fn recording_started(&mut self) {}

    fn recording_finished(&mut self, frames: Vec<RecordedFrame>, palette: &Palette);

    fn read_nfc_dump(&mut self);
}

/// How the firmware process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirmwareExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl FirmwareExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for FirmwareExit {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for FirmwareExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// The firmware process, from the loop's point of view.
pub trait Firmware {
    /// Non-blocking liveness check.
    fn try_exit(&mut self) -> io::Result<Option<FirmwareExit>>;

    /// Stop and reap the process. May be called more than once.
    fn shutdown(&mut self) -> io::Result<()>;
}

/// Source of host input, drained at the start of every tick.
pub trait EventSource {
    /// Next pending event, without blocking.
    fn next_event(&mut self) -> Option<HostEvent>;
}

impl EventSource for VecDeque<HostEvent> {
    fn next_event(&mut self) -> Option<HostEvent> {
        self.pop_front()
    }
}

/// Consumer for the optional passthrough channel.
pub trait PassthroughHandler {
    /// Called when the channel is readable; must not block.
    fn readable(&mut self, channel: &mut Channel) -> io::Result<()>;
}
