//! Files written on operator request: snapshots, recordings, NFC dumps.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use simlink_display::{Palette, PixelBuffer};
use simlink_session::{ControlHandler, FrameView, RecordedFrame};
use tracing::{info, warn};

/// Write a frame as a binary PPM image.
pub fn write_ppm<W: Write>(out: &mut W, pixels: &PixelBuffer, palette: &Palette) -> io::Result<()> {
    write!(out, "P6\n{} {}\n255\n", pixels.width(), pixels.height())?;
    let mut row = Vec::with_capacity(pixels.width() * 3);
    for indices in pixels.rows() {
        row.clear();
        for &index in indices {
            let rgb = palette.color(index);
            row.extend_from_slice(&[rgb.r, rgb.g, rgb.b]);
        }
        out.write_all(&row)?;
    }
    Ok(())
}

pub fn save_ppm(path: &Path, pixels: &PixelBuffer, palette: &Palette) -> io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    write_ppm(&mut out, pixels, palette)?;
    out.flush()
}

#[derive(Serialize)]
struct TimingEntry {
    file: String,
    delay_ms: u64,
}

/// Control handler that writes its artifacts under one directory.
#[derive(Debug)]
pub struct FileStore {
    output_dir: PathBuf,
    nfc_dump: PathBuf,
}

impl FileStore {
    pub fn new(output_dir: impl Into<PathBuf>, nfc_dump: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            nfc_dump: nfc_dump.into(),
        }
    }

    fn snapshot_to(&self, frame: &FrameView<'_>) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("snapshot-{}.ppm", unix_seconds()));
        save_ppm(&path, frame.pixels, frame.palette)?;
        Ok(path)
    }

    fn save_movie(&self, frames: &[RecordedFrame], palette: &Palette) -> io::Result<PathBuf> {
        let dir = self.output_dir.join(format!("movie-{}", unix_seconds()));
        fs::create_dir_all(&dir)?;

        let mut timing = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let file = format!("frame-{i:04}.ppm");
            save_ppm(&dir.join(&file), &frame.pixels, palette)?;
            timing.push(TimingEntry {
                file,
                delay_ms: frame.delay.as_millis() as u64,
            });
        }

        let json = serde_json::to_vec_pretty(&timing).map_err(io::Error::other)?;
        fs::write(dir.join("timing.json"), json)?;
        Ok(dir)
    }

    fn copy_nfc_dump(&self) -> io::Result<Option<PathBuf>> {
        if !self.nfc_dump.is_file() {
            return Ok(None);
        }
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("nfc-{}.bin", unix_seconds()));
        fs::copy(&self.nfc_dump, &path)?;
        Ok(Some(path))
    }
}

impl ControlHandler for FileStore {
    fn snapshot(&mut self, frame: &FrameView<'_>) {
        match self.snapshot_to(frame) {
            Ok(path) => info!(path = %path.display(), "snapshot saved"),
            Err(err) => warn!(error = %err, "snapshot failed"),
        }
    }

    fn recording_started(&mut self) {
        info!("recording started");
    }

    fn recording_finished(&mut self, frames: Vec<RecordedFrame>, palette: &Palette) {
        match self.save_movie(&frames, palette) {
            Ok(dir) => info!(path = %dir.display(), frames = frames.len(), "recording saved"),
            Err(err) => warn!(error = %err, "recording could not be saved"),
        }
    }

    fn read_nfc_dump(&mut self) {
        match self.copy_nfc_dump() {
            Ok(Some(path)) => info!(path = %path.display(), "NFC dump saved"),
            Ok(None) => warn!(path = %self.nfc_dump.display(), "NFC not ready"),
            Err(err) => warn!(error = %err, "NFC dump could not be copied"),
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
