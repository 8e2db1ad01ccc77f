use std::thread::JoinHandle;

use crate::audio::stream::AudioOutputStream;
use crate::encode::sink::{AudioTrackConfig, CaptureArtifact, MediaSink, SinkConfig};
use crate::foundation::clock::SessionOrigin;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::render::frame::FrameRGBA;

/// One recording: its parameters, the encoded segments so far and, once finalized, the
/// artifact. Never reused.
#[derive(Debug)]
pub struct CaptureSession {
    /// Video frame rate.
    pub fps: Fps,
    /// Video width.
    pub width: u32,
    /// Video height.
    pub height: u32,
    /// Seconds captured.
    pub duration_secs: f64,
    /// Encoded segments in arrival order; handed to the sink on finalization.
    pub chunks: Vec<Vec<u8>>,
    /// The finalized artifact.
    pub result: Option<CaptureArtifact>,
    segments_seen: usize,
}

impl CaptureSession {
    fn new(fps: Fps, canvas: Canvas, duration_secs: f64) -> Self {
        Self {
            fps,
            width: canvas.width,
            height: canvas.height,
            duration_secs,
            chunks: Vec::new(),
            result: None,
            segments_seen: 0,
        }
    }

    fn append(&mut self, segments: Vec<Vec<u8>>) {
        self.segments_seen += segments.len();
        self.chunks.extend(segments.into_iter().filter(|s| !s.is_empty()));
    }

    /// Segments received over the whole recording.
    pub fn segments_seen(&self) -> usize {
        self.segments_seen
    }

    /// Whether the artifact is available.
    pub fn is_finalized(&self) -> bool {
        self.result.is_some()
    }
}

/// Feeds one [`MediaSink`] with the frames and audio of a recording window.
///
/// The window is `[origin, origin + duration)` on both the frame grid and the audio clock.
pub struct Recorder {
    session: CaptureSession,
    sink: Box<dyn MediaSink>,
    audio: Option<AudioOutputStream>,
    capture_frames: u64,
    audio_window: (u64, u64),
    frames_pushed: u64,
    audio_frames_pushed: u64,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("session", &self.session)
            .field("audio", &self.audio.is_some())
            .field("capture_frames", &self.capture_frames)
            .field("frames_pushed", &self.frames_pushed)
            .field("audio_frames_pushed", &self.audio_frames_pushed)
            .finish()
    }
}

impl Recorder {
    /// Begin encoding. `audio` adds the engine's mix as the audio track.
    #[tracing::instrument(level = "debug", skip(sink, audio, origin))]
    pub fn start(
        origin: SessionOrigin,
        fps: Fps,
        canvas: Canvas,
        duration_secs: f64,
        mut sink: Box<dyn MediaSink>,
        audio: Option<AudioOutputStream>,
    ) -> SaxcatResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(SaxcatError::validation(
                "recording duration must be finite and > 0",
            ));
        }
        let track = audio.as_ref().map(|s| AudioTrackConfig {
            sample_rate: s.sample_rate(),
            channels: s.channels(),
        });
        sink.begin(SinkConfig::new(canvas.width, canvas.height, fps, track))?;

        let audio_window = match track {
            Some(t) => {
                let sr = f64::from(t.sample_rate);
                let start = (origin.secs() * sr).round() as u64;
                (start, start + (duration_secs * sr).round() as u64)
            }
            None => (0, 0),
        };
        let capture_frames = fps.secs_to_frames_ceil(duration_secs);
        tracing::info!(capture_frames, audio = track.is_some(), "recording started");

        Ok(Self {
            session: CaptureSession::new(fps, canvas, duration_secs),
            sink,
            audio,
            capture_frames,
            audio_window,
            frames_pushed: 0,
            audio_frames_pushed: 0,
        })
    }

    /// The session being filled.
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Video frames the window holds.
    pub fn capture_frames(&self) -> u64 {
        self.capture_frames
    }

    /// Video frames encoded so far.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    /// Audio frames encoded so far.
    pub fn audio_frames_pushed(&self) -> u64 {
        self.audio_frames_pushed
    }

    /// Whether an audio track is being recorded.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Encode `frame` if it lies inside the window. Returns whether it was taken.
    pub fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SaxcatResult<bool> {
        if idx.0 >= self.capture_frames {
            return Ok(false);
        }
        self.sink.push_frame(idx, frame)?;
        self.frames_pushed += 1;
        self.collect();
        Ok(true)
    }

    /// Move everything the engine rendered since the last call into the sink, clipped to the
    /// window.
    pub fn pump_audio(&mut self) -> SaxcatResult<()> {
        let Some(stream) = self.audio.as_ref() else {
            return Ok(());
        };
        let (from, to) = self.audio_window;
        for block in stream.drain() {
            let samples = block.slice_frames(from, to);
            if samples.is_empty() {
                continue;
            }
            self.sink.push_audio(samples)?;
            self.audio_frames_pushed += (samples.len() / usize::from(block.channels)) as u64;
        }
        self.collect();
        Ok(())
    }

    fn collect(&mut self) {
        let segments = self.sink.take_segments();
        if !segments.is_empty() {
            self.session.append(segments);
        }
    }

    /// First phase of the stop: flush pending audio and finalize on a worker thread.
    pub fn request_stop(mut self) -> PendingArtifact {
        let flushed = self.pump_audio();
        tracing::debug!(
            frames = self.frames_pushed,
            audio_frames = self.audio_frames_pushed,
            segments = self.session.segments_seen(),
            "recording stop requested"
        );
        let Self {
            mut session, sink, ..
        } = self;

        let handle = std::thread::spawn(move || {
            if let Err(e) = flushed {
                sink.abort();
                return Err(e);
            }
            let chunks = std::mem::take(&mut session.chunks);
            let artifact = sink.finish(chunks)?;
            session.result = Some(artifact);
            Ok(session)
        });
        PendingArtifact {
            handle: Some(handle),
        }
    }

    /// Discard everything encoded so far.
    pub fn abort(self) {
        tracing::info!(
            frames = self.frames_pushed,
            segments = self.session.segments_seen(),
            "recording aborted; segments discarded"
        );
        self.sink.abort();
    }
}

/// Second phase of the stop: resolves once with the finalized [`CaptureSession`].
#[derive(Debug)]
pub struct PendingArtifact {
    handle: Option<JoinHandle<SaxcatResult<CaptureSession>>>,
}

impl PendingArtifact {
    /// Whether finalization has finished (the result is ready without blocking).
    pub fn is_ready(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Non-blocking: the result if finalization finished, `None` otherwise or once taken.
    pub fn try_resolve(&mut self) -> Option<SaxcatResult<CaptureSession>> {
        if !self.handle.as_ref()?.is_finished() {
            return None;
        }
        self.handle.take().map(join_finalizer)
    }

    /// Block until finalization finishes.
    pub fn wait(mut self) -> SaxcatResult<CaptureSession> {
        match self.handle.take() {
            Some(handle) => join_finalizer(handle),
            None => Err(SaxcatError::capture("pending artifact already resolved")),
        }
    }
}

fn join_finalizer(
    handle: JoinHandle<SaxcatResult<CaptureSession>>,
) -> SaxcatResult<CaptureSession> {
    handle
        .join()
        .map_err(|_| SaxcatError::capture("artifact finalizer thread panicked"))?
}

#[cfg(test)]
#[path = "../../tests/unit/session/capture.rs"]
mod tests;
