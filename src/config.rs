//! Studio parameters.
//!
//! Defaults are the fixed clip parameters (8 s, 96 bpm, 800x600 at 60 fps). A JSON file can
//! override any subset of fields; [`StudioConfig::validate`] keeps values in the small range the
//! renderer and synthesizer are built for.

use std::path::Path;

use anyhow::Context as _;

use crate::audio::events::RELEASE_MARGIN_SECS;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SaxcatError, SaxcatResult};

/// Default clip length in seconds.
pub const DEFAULT_DURATION_SECS: f64 = 8.0;
/// Default tempo.
pub const DEFAULT_BPM: f64 = 96.0;
/// Default frame rate.
pub const DEFAULT_FPS: u32 = 60;
/// Default canvas width.
pub const DEFAULT_WIDTH: u32 = 800;
/// Default canvas height.
pub const DEFAULT_HEIGHT: u32 = 600;
/// Default synthesis sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// How long a recording keeps capturing after the nominal duration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureTail {
    /// Stop exactly at the nominal duration; the final note's release may be cut.
    #[default]
    Exact,
    /// Keep capturing for the release margin so the final note decays fully.
    IncludeRelease,
}

/// Everything a [`crate::Studio`] needs to run sessions.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Clip length in seconds.
    pub duration_secs: f64,
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Frames per second for the render loop and the captured video track.
    pub fps: u32,
    /// Synthesis sample rate in Hz.
    pub sample_rate: u32,
    /// Whether the synthesis engine is available at all.
    pub audio_enabled: bool,
    /// Recording tail policy.
    pub capture_tail: CaptureTail,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            bpm: DEFAULT_BPM,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            audio_enabled: true,
            capture_tail: CaptureTail::Exact,
        }
    }
}

impl StudioConfig {
    /// Parse a config from JSON text. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> SaxcatResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| SaxcatError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON config file.
    pub fn from_path(path: &Path) -> SaxcatResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read studio config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Reject values outside the supported range.
    pub fn validate(&self) -> SaxcatResult<()> {
        let duration = self.duration_secs;
        if !duration.is_finite() || duration <= 0.0 || duration > 60.0 {
            return Err(SaxcatError::validation("duration_secs must be in (0, 60]"));
        }
        if !self.bpm.is_finite() || !(20.0..=400.0).contains(&self.bpm) {
            return Err(SaxcatError::validation("bpm must be in [20, 400]"));
        }
        if !(1..=120).contains(&self.fps) {
            return Err(SaxcatError::validation("fps must be in [1, 120]"));
        }
        for (name, v) in [("width", self.width), ("height", self.height)] {
            if v == 0 || v > 4096 {
                return Err(SaxcatError::validation(format!(
                    "{name} must be in [1, 4096]"
                )));
            }
            if !v.is_multiple_of(2) {
                return Err(SaxcatError::validation(format!(
                    "{name} must be even (required for yuv420p video)"
                )));
            }
        }
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(SaxcatError::validation(
                "sample_rate must be in [8000, 192000]",
            ));
        }
        Ok(())
    }

    /// Validated canvas.
    pub fn canvas(&self) -> SaxcatResult<Canvas> {
        Canvas::new(self.width, self.height)
    }

    /// Validated frame rate.
    pub fn frame_rate(&self) -> SaxcatResult<Fps> {
        Fps::new(self.fps, 1)
    }

    /// Seconds a recording captures, per [`CaptureTail`].
    pub fn capture_secs(&self) -> f64 {
        match self.capture_tail {
            CaptureTail::Exact => self.duration_secs,
            CaptureTail::IncludeRelease => self.duration_secs + RELEASE_MARGIN_SECS,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
