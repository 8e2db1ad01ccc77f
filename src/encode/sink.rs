use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::render::frame::FrameRGBA;

/// Configuration provided to a [`MediaSink`] when a recording starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Audio track parameters; `None` records video only.
    pub audio: Option<AudioTrackConfig>,
    /// Target span of one encoded segment.
    pub timeslice_ms: u32,
}

impl SinkConfig {
    /// Config with the standard timeslice for `fps`.
    pub fn new(width: u32, height: u32, fps: Fps, audio: Option<AudioTrackConfig>) -> Self {
        Self {
            width,
            height,
            fps,
            audio,
            timeslice_ms: timeslice_ms(fps),
        }
    }

    /// Whole frames per timeslice (at least one).
    pub fn frames_per_slice(&self) -> u64 {
        let exact = f64::from(self.timeslice_ms) * self.fps.as_f64() / 1000.0;
        (exact.round() as u64).max(1)
    }
}

/// Segment length: one frame interval, but never shorter than 100 ms.
pub fn timeslice_ms(fps: Fps) -> u32 {
    let frame_ms = (1000.0 * fps.frame_duration_secs()).floor() as u32;
    frame_ms.max(100)
}

/// Raw PCM parameters of the captured audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrackConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// Video track of a finished artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTrackInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Encoded frame count.
    pub frames: u64,
}

impl VideoTrackInfo {
    /// Track length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frames)
    }
}

/// Audio track of a finished artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrackInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Sample frames captured.
    pub frames: u64,
}

impl AudioTrackInfo {
    /// Track length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate)
    }
}

/// The finished recording: one container holding the video track and, when captured, audio.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureArtifact {
    /// Container MIME type (with codecs when known).
    pub mime_type: String,
    /// File extension without the dot.
    pub file_extension: String,
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// Video track description.
    pub video: VideoTrackInfo,
    /// Audio track description, if any.
    pub audio: Option<AudioTrackInfo>,
    /// Declared duration (longest track).
    pub duration_secs: f64,
}

impl CaptureArtifact {
    pub(crate) fn new(
        mime_type: impl Into<String>,
        file_extension: impl Into<String>,
        bytes: Vec<u8>,
        video: VideoTrackInfo,
        audio: Option<AudioTrackInfo>,
    ) -> Self {
        let duration_secs = audio
            .map(|a| a.duration_secs())
            .unwrap_or(0.0)
            .max(video.duration_secs());
        Self {
            mime_type: mime_type.into(),
            file_extension: file_extension.into(),
            bytes,
            video,
            audio,
            duration_secs,
        }
    }

    /// Number of tracks in the container.
    pub fn track_count(&self) -> usize {
        1 + usize::from(self.audio.is_some())
    }

    /// Timestamped download name, e.g. `saxcat-1718000000000.webm`.
    pub fn suggested_file_name(&self, now: SystemTime) -> String {
        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("saxcat-{millis}.{}", self.file_extension)
    }

    /// Write the artifact into `dir` under its suggested name; returns the path.
    pub fn write_into(&self, dir: &Path) -> SaxcatResult<PathBuf> {
        let path = dir.join(self.suggested_file_name(SystemTime::now()));
        crate::encode::ffmpeg::ensure_parent_dir(&path)?;
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("write artifact '{}'", path.display()))?;
        Ok(path)
    }
}

/// Sink contract for consuming a live recording.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order and
/// `push_audio` receives contiguous interleaved PCM. Encoded output is handed back as segments
/// through `take_segments`; `finish` receives every segment taken so far, in order, and
/// assembles the artifact. `abort` discards everything.
pub trait MediaSink: Send {
    /// Called once before anything is pushed.
    fn begin(&mut self, cfg: SinkConfig) -> SaxcatResult<()>;
    /// Push one frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SaxcatResult<()>;
    /// Push interleaved PCM for the audio track.
    fn push_audio(&mut self, samples: &[f32]) -> SaxcatResult<()>;
    /// Encoded segments produced since the last call.
    fn take_segments(&mut self) -> Vec<Vec<u8>>;
    /// Flush the encoder and assemble the artifact.
    fn finish(self: Box<Self>, segments: Vec<Vec<u8>>) -> SaxcatResult<CaptureArtifact>;
    /// Drop all buffered output without producing an artifact.
    fn abort(self: Box<Self>);
}

const DIGEST_MIME: &str = "application/x-saxcat-digest";
const TAG_FRAME: u8 = b'V';
const TAG_AUDIO: u8 = b'A';

/// One record of a digest artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestRecord {
    /// A video frame and the xxh3 of its pixels.
    Frame {
        /// Frame index.
        index: FrameIndex,
        /// xxh3 of the premultiplied RGBA bytes.
        digest: u64,
    },
    /// Audio captured during one timeslice.
    Audio {
        /// PCM byte count.
        bytes: u64,
        /// xxh3 of the PCM bytes.
        digest: u64,
    },
}

/// Lightweight sink that "encodes" each frame as its xxh3 digest.
///
/// Segments follow the recorder timeslice, so the artifact layout mirrors a real encoder
/// while staying small enough for full-length recordings in tests.
#[derive(Default)]
pub struct DigestSink {
    cfg: Option<SinkConfig>,
    pending: Vec<u8>,
    ready: Vec<Vec<u8>>,
    frames_in_slice: u64,
    slice_audio: Option<xxhash_rust::xxh3::Xxh3>,
    slice_audio_bytes: u64,
    video_frames: u64,
    audio_frames: u64,
    last_idx: Option<FrameIndex>,
}

impl DigestSink {
    /// Create a sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an artifact produced by this sink.
    pub fn decode(bytes: &[u8]) -> SaxcatResult<Vec<DigestRecord>> {
        let mut out = Vec::new();
        let mut rest = bytes;
        while let Some((&tag, tail)) = rest.split_first() {
            if tail.len() < 16 {
                return Err(SaxcatError::encode("truncated digest record"));
            }
            let a = read_u64_le(&tail[..8])?;
            let b = read_u64_le(&tail[8..16])?;
            out.push(match tag {
                TAG_FRAME => DigestRecord::Frame {
                    index: FrameIndex(a),
                    digest: b,
                },
                TAG_AUDIO => DigestRecord::Audio {
                    bytes: a,
                    digest: b,
                },
                other => {
                    return Err(SaxcatError::encode(format!(
                        "unknown digest record tag {other:#x}"
                    )));
                }
            });
            rest = &tail[16..];
        }
        Ok(out)
    }

    fn push_record(&mut self, tag: u8, a: u64, b: u64) {
        self.pending.push(tag);
        self.pending.extend_from_slice(&a.to_le_bytes());
        self.pending.extend_from_slice(&b.to_le_bytes());
    }

    fn close_slice(&mut self) {
        if let Some(hasher) = self.slice_audio.take() {
            let bytes = self.slice_audio_bytes;
            self.push_record(TAG_AUDIO, bytes, hasher.digest());
            self.slice_audio_bytes = 0;
        }
        if !self.pending.is_empty() {
            self.ready.push(std::mem::take(&mut self.pending));
        }
        self.frames_in_slice = 0;
    }
}

impl MediaSink for DigestSink {
    fn begin(&mut self, cfg: SinkConfig) -> SaxcatResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(SaxcatError::validation(
                "digest sink width/height must be non-zero",
            ));
        }
        *self = Self {
            cfg: Some(cfg),
            ..Self::default()
        };
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SaxcatResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SaxcatError::capture("digest sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(SaxcatError::capture(
                "digest sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(SaxcatError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        let per_slice = cfg.frames_per_slice();
        self.last_idx = Some(idx);
        self.push_record(TAG_FRAME, idx.0, frame.digest());
        self.video_frames += 1;
        self.frames_in_slice += 1;
        if self.frames_in_slice >= per_slice {
            self.close_slice();
        }
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> SaxcatResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SaxcatError::capture("digest sink not started"))?;
        let audio = cfg
            .audio
            .ok_or_else(|| SaxcatError::capture("digest sink was started without audio"))?;
        let hasher = self
            .slice_audio
            .get_or_insert_with(xxhash_rust::xxh3::Xxh3::new);
        for s in samples {
            hasher.update(&s.to_le_bytes());
        }
        self.slice_audio_bytes += (samples.len() * 4) as u64;
        self.audio_frames += (samples.len() / usize::from(audio.channels)) as u64;
        Ok(())
    }

    fn take_segments(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.ready)
    }

    fn finish(mut self: Box<Self>, mut segments: Vec<Vec<u8>>) -> SaxcatResult<CaptureArtifact> {
        let cfg = self
            .cfg
            .clone()
            .ok_or_else(|| SaxcatError::capture("digest sink not started"))?;
        self.close_slice();
        segments.append(&mut self.ready);

        let bytes = segments.concat();
        let video = VideoTrackInfo {
            width: cfg.width,
            height: cfg.height,
            fps: cfg.fps,
            frames: self.video_frames,
        };
        let audio = cfg.audio.map(|a| AudioTrackInfo {
            sample_rate: a.sample_rate,
            channels: a.channels,
            frames: self.audio_frames,
        });
        Ok(CaptureArtifact::new(DIGEST_MIME, "digest", bytes, video, audio))
    }

    fn abort(self: Box<Self>) {
        tracing::debug!(
            frames = self.video_frames,
            "digest sink aborted; buffered segments discarded"
        );
    }
}

fn read_u64_le(bytes: &[u8]) -> SaxcatResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| SaxcatError::encode("bad digest record"))?;
    Ok(u64::from_le_bytes(raw))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
