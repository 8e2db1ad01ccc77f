use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use anyhow::Context as _;

use crate::foundation::error::{SaxcatError, SaxcatResult};

/// One rendered block of interleaved `f32` samples on the engine's audio clock.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBlock {
    /// Absolute frame index of the first sample frame.
    pub start_frame: u64,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Interleaved samples (`frames * channels`).
    pub samples: Arc<[f32]>,
}

impl AudioBlock {
    pub(crate) fn new(
        start_frame: u64,
        sample_rate: u32,
        channels: u16,
        samples: Vec<f32>,
    ) -> Self {
        Self {
            start_frame,
            sample_rate,
            channels,
            samples: samples.into(),
        }
    }

    /// Frame count.
    pub fn frames(&self) -> u64 {
        (self.samples.len() / usize::from(self.channels.max(1))) as u64
    }

    /// One past the last frame.
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.frames()
    }

    /// Start on the audio clock in seconds.
    pub fn start_secs(&self) -> f64 {
        self.start_frame as f64 / f64::from(self.sample_rate)
    }

    /// Samples of the frames in `[from, to)`, clipped to this block.
    pub fn slice_frames(&self, from: u64, to: u64) -> &[f32] {
        let lo = from.clamp(self.start_frame, self.end_frame()) - self.start_frame;
        let hi = to.clamp(self.start_frame, self.end_frame()) - self.start_frame;
        if hi <= lo {
            return &[];
        }
        let ch = usize::from(self.channels);
        &self.samples[(lo as usize) * ch..(hi as usize) * ch]
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

/// Live subscription to the engine's mix output.
///
/// Blocks queue up until drained; dropping the stream unsubscribes it.
#[derive(Debug)]
pub struct AudioOutputStream {
    rx: mpsc::Receiver<AudioBlock>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutputStream {
    pub(crate) fn new(rx: mpsc::Receiver<AudioBlock>, sample_rate: u32, channels: u16) -> Self {
        Self {
            rx,
            sample_rate,
            channels,
        }
    }

    /// Sample rate of delivered blocks.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of delivered blocks.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Every block rendered since the last drain, in order.
    pub fn drain(&self) -> Vec<AudioBlock> {
        self.rx.try_iter().collect()
    }
}

/// Incremental interleaved `f32le` PCM file (raw, headerless), removed on drop.
#[derive(Debug)]
pub struct F32leSpool {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    frames: u64,
    channels: u16,
}

impl F32leSpool {
    /// Create (truncate) the spool file.
    pub fn create(path: impl Into<PathBuf>, channels: u16) -> SaxcatResult<Self> {
        let path = path.into();
        if channels == 0 {
            return Err(SaxcatError::validation("spool channels must be non-zero"));
        }
        let file = File::create(&path)
            .with_context(|| format!("create audio spool '{}'", path.display()))?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            frames: 0,
            channels,
        })
    }

    /// Append interleaved samples.
    pub fn append(&mut self, samples: &[f32]) -> SaxcatResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SaxcatError::capture("audio spool already finished"))?;
        for s in samples {
            writer
                .write_all(&s.to_le_bytes())
                .context("write audio spool")?;
        }
        self.frames += (samples.len() / usize::from(self.channels)) as u64;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Spool path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the file; it stays on disk until the spool is dropped.
    pub fn finish(&mut self) -> SaxcatResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().context("flush audio spool")?;
        }
        Ok(())
    }
}

impl Drop for F32leSpool {
    fn drop(&mut self) {
        drop(self.writer.take());
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/stream.rs"]
mod tests;
