use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::stream::AudioBlock;
use crate::foundation::error::{SaxcatError, SaxcatResult};

/// Local listening output, separate from the capture stream.
pub trait AudioMonitor: Send {
    /// Consume one rendered block.
    fn write_block(&mut self, block: &AudioBlock) -> SaxcatResult<()>;
    /// Flush and close the output.
    fn finish(self: Box<Self>) -> SaxcatResult<()>;
}

/// Writes monitored audio to a 32-bit float WAV file.
pub struct WavMonitor {
    path: PathBuf,
    writer: WavWriter<BufWriter<File>>,
    channels: u16,
    frames: u64,
}

impl WavMonitor {
    /// Create the WAV file (parent directories included).
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> SaxcatResult<Self> {
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("create wav monitor '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            channels,
            frames: 0,
        })
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl AudioMonitor for WavMonitor {
    fn write_block(&mut self, block: &AudioBlock) -> SaxcatResult<()> {
        if block.channels != self.channels {
            return Err(SaxcatError::audio(format!(
                "monitor expects {} channels, block has {}",
                self.channels, block.channels
            )));
        }
        for &s in block.samples.iter() {
            self.writer
                .write_sample(s)
                .context("write wav monitor sample")?;
        }
        self.frames += block.frames();
        Ok(())
    }

    fn finish(self: Box<Self>) -> SaxcatResult<()> {
        let path = self.path.clone();
        let frames = self.frames;
        self.writer
            .finalize()
            .with_context(|| format!("finalize wav monitor '{}'", path.display()))?;
        tracing::info!(path = %path.display(), frames, "wav monitor written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/monitor.rs"]
mod tests;
