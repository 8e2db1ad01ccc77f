use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::audio::engine::{AudioCapability, RENDER_QUANTUM_FRAMES, SynthEngine};
use crate::config::StudioConfig;
use crate::encode::sink::{CaptureArtifact, MediaSink};
use crate::foundation::clock::{Clock, SessionOrigin, SystemClock};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::render::surface::PreviewSurface;
use crate::session::capture::{CaptureSession, PendingArtifact, Recorder};
use crate::session::playback::PlaybackSession;
use crate::session::render_loop::{Pacing, RenderLoop, RenderLoopHandle};

/// Top-level mode of the studio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing running.
    #[default]
    Idle,
    /// Live preview; nothing is captured.
    Previewing,
    /// Recording into a sink.
    Recording,
}

/// What the UI shell needs to decide which actions to offer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StudioStatus {
    /// A preview is running.
    pub is_previewing: bool,
    /// A recording is running.
    pub is_recording: bool,
    /// A recording stopped and is still being finalized.
    pub is_finalizing: bool,
    /// A finished artifact is available.
    pub has_artifact: bool,
}

/// Cross-thread cancellation for a running [`Studio`]; honoured on the next pump.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the studio to stop whatever it is doing.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested and not yet honoured.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single owner of every live resource: the synthesis engine, the playback session, the render
/// loop, the recorder and the last artifact.
///
/// Nothing runs on its own. [`Studio::pump`] advances audio and video to the clock's current
/// time; [`Studio::record`] and [`Studio::run_preview_for`] pump and sleep on the clock until
/// they are done.
pub struct Studio {
    cfg: StudioConfig,
    canvas: Canvas,
    fps: Fps,
    clock: Arc<dyn Clock>,
    engine: SynthEngine,
    playback: Option<PlaybackSession>,
    render_loop: Option<RenderLoop>,
    recorder: Option<Recorder>,
    record_deadline: Option<Duration>,
    pending: Option<PendingArtifact>,
    capture: Option<CaptureSession>,
    surface: PreviewSurface,
    state: CaptureState,
    next_loop: u64,
    stop: StopHandle,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("cfg", &self.cfg)
            .field("state", &self.state)
            .field("engine", &self.engine)
            .field("playback", &self.playback.is_some())
            .field("render_loop", &self.render_loop.as_ref().map(|l| l.handle()))
            .field("recorder", &self.recorder.is_some())
            .field("pending", &self.pending.is_some())
            .field("has_artifact", &self.artifact().is_some())
            .finish()
    }
}

impl Studio {
    /// Studio on `clock`. Audio is unavailable when `cfg.audio_enabled` is false.
    pub fn new(cfg: StudioConfig, clock: Arc<dyn Clock>) -> SaxcatResult<Self> {
        cfg.validate()?;
        let capability = if cfg.audio_enabled {
            AudioCapability::Available
        } else {
            AudioCapability::Unavailable
        };
        let engine = SynthEngine::with_capability(cfg.sample_rate, capability)?;
        Ok(Self {
            canvas: cfg.canvas()?,
            fps: cfg.frame_rate()?,
            cfg,
            clock,
            engine,
            playback: None,
            render_loop: None,
            recorder: None,
            record_deadline: None,
            pending: None,
            capture: None,
            surface: PreviewSurface::new(),
            state: CaptureState::Idle,
            next_loop: 0,
            stop: StopHandle::default(),
        })
    }

    /// Studio on wall-clock time.
    pub fn with_system_clock(cfg: StudioConfig) -> SaxcatResult<Self> {
        Self::new(cfg, Arc::new(SystemClock::new()))
    }

    /// Active configuration.
    pub fn config(&self) -> &StudioConfig {
        &self.cfg
    }

    /// The studio clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The synthesis engine.
    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }

    /// Mutable engine access (monitor installation).
    pub fn engine_mut(&mut self) -> &mut SynthEngine {
        &mut self.engine
    }

    /// The live preview surface.
    pub fn surface(&self) -> &PreviewSurface {
        &self.surface
    }

    /// The current playback session, if any.
    pub fn playback(&self) -> Option<&PlaybackSession> {
        self.playback.as_ref()
    }

    /// Current mode.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Flags for the UI shell.
    pub fn status(&self) -> StudioStatus {
        StudioStatus {
            is_previewing: self.state == CaptureState::Previewing,
            is_recording: self.state == CaptureState::Recording,
            is_finalizing: self.pending.is_some(),
            has_artifact: self.artifact().is_some(),
        }
    }

    /// Handle for cancelling from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Handle of the live render loop.
    pub fn render_loop_handle(&self) -> Option<RenderLoopHandle> {
        self.render_loop
            .as_ref()
            .filter(|l| !l.is_cancelled())
            .map(RenderLoop::handle)
    }

    /// Number of live render loops (0 or 1).
    pub fn active_render_loops(&self) -> usize {
        usize::from(self.render_loop_handle().is_some())
    }

    /// Number of live audio graphs (0 or 1).
    pub fn active_audio_graphs(&self) -> usize {
        usize::from(self.engine.has_bus())
    }

    /// The last finished artifact.
    pub fn artifact(&self) -> Option<&CaptureArtifact> {
        self.capture.as_ref().and_then(|c| c.result.as_ref())
    }

    /// Take ownership of the last finished artifact.
    pub fn take_artifact(&mut self) -> Option<CaptureArtifact> {
        self.capture.take().and_then(|c| c.result)
    }

    /// Start (or restart) the live preview.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn start_preview(&mut self) -> SaxcatResult<()> {
        if self.state == CaptureState::Recording {
            return Err(SaxcatError::capture(
                "cannot preview while recording; stop the recording first",
            ));
        }
        let origin = self.begin_session()?;
        self.render_loop = Some(self.new_loop(origin, Pacing::Latest));
        self.state = CaptureState::Previewing;
        Ok(())
    }

    /// Stop the preview. No-op unless previewing.
    pub fn stop_preview(&mut self) {
        if self.state == CaptureState::Previewing {
            self.end_session();
            self.state = CaptureState::Idle;
        }
    }

    /// Preview for `secs` seconds of clock time, then stop.
    pub fn run_preview_for(&mut self, secs: f64) -> SaxcatResult<()> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(SaxcatError::validation(
                "preview seconds must be finite and >= 0",
            ));
        }
        self.start_preview()?;
        let end = self.clock.now() + Duration::from_secs_f64(secs);
        loop {
            if let Err(e) = self.pump() {
                self.stop();
                return Err(e);
            }
            if self.state != CaptureState::Previewing || self.clock.now() >= end {
                break;
            }
            let wake = self.next_wakeup().map_or(end, |w| w.min(end));
            self.clock.sleep_until(wake);
        }
        self.stop_preview();
        Ok(())
    }

    /// Start recording into `sink`. The previous artifact is released first.
    #[tracing::instrument(level = "debug", skip(self, sink))]
    pub fn start_recording(&mut self, sink: Box<dyn MediaSink>) -> SaxcatResult<()> {
        if let Some(recorder) = self.recorder.take() {
            tracing::warn!("recording already running; aborting it first");
            recorder.abort();
        }
        self.release_artifact();

        let origin = self.begin_session()?;
        let audio = self.engine.output_stream();
        let capture_secs = self.cfg.capture_secs();
        let started = Recorder::start(origin, self.fps, self.canvas, capture_secs, sink, audio);
        let recorder = match started {
            Ok(r) => r,
            Err(e) => {
                self.end_session();
                self.state = CaptureState::Idle;
                return Err(e);
            }
        };

        self.recorder = Some(recorder);
        self.render_loop = Some(self.new_loop(origin, Pacing::CatchUp));
        self.record_deadline = Some(origin.offset(capture_secs));
        self.state = CaptureState::Recording;
        Ok(())
    }

    /// Advance audio and video to the clock's current time.
    ///
    /// Renders audio one block ahead, draws every due frame, resolves a finished artifact and
    /// performs the natural stop once the recording deadline has passed.
    pub fn pump(&mut self) -> SaxcatResult<()> {
        if self.stop.is_requested() {
            self.stop();
            return Ok(());
        }
        let now = self.clock.now();
        self.poll_pending()?;

        if self.engine.has_bus() {
            let lookahead =
                RENDER_QUANTUM_FRAMES as f64 / f64::from(self.engine.sample_rate());
            self.engine.render_until(now.as_secs_f64() + lookahead);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.pump_audio()?;
        }

        if let Some(render_loop) = self.render_loop.as_mut() {
            let surface = &mut self.surface;
            let mut recorder = self.recorder.as_mut();
            render_loop.tick(now, |idx, t, frame| {
                surface.present(idx, t, frame);
                if let Some(r) = recorder.as_mut() {
                    r.push_frame(idx, frame)?;
                }
                Ok(())
            })?;
        }

        match self.state {
            CaptureState::Previewing => {
                // Audio ends once its last note has decayed; the picture keeps running.
                if let Some(playback) = self.playback.as_mut()
                    && playback.is_active()
                    && playback.is_finished(now, &self.engine)
                {
                    playback.stop(&mut self.engine);
                }
            }
            CaptureState::Recording => {
                if self.record_deadline.is_some_and(|d| now >= d) {
                    self.finish_recording();
                }
            }
            CaptureState::Idle => {}
        }
        Ok(())
    }

    /// Earliest clock time at which [`Studio::pump`] has new work.
    pub fn next_wakeup(&self) -> Option<Duration> {
        let frame = self
            .render_loop
            .as_ref()
            .filter(|l| !l.is_cancelled())
            .map(RenderLoop::next_frame_due);
        match (frame, self.record_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Record one clip into `sink`, waiting on the clock for the configured duration.
    ///
    /// Returns `Ok(None)` when the recording was stopped before it completed.
    pub fn record(&mut self, sink: Box<dyn MediaSink>) -> SaxcatResult<Option<&CaptureArtifact>> {
        self.start_recording(sink)?;
        while self.state == CaptureState::Recording {
            if let Err(e) = self.pump() {
                self.stop();
                return Err(e);
            }
            if self.state != CaptureState::Recording {
                break;
            }
            if let Some(wake) = self.next_wakeup() {
                self.clock.sleep_until(wake);
            }
        }
        self.await_artifact()
    }

    /// Block until a stopped recording is finalized; returns the current artifact.
    pub fn await_artifact(&mut self) -> SaxcatResult<Option<&CaptureArtifact>> {
        if let Some(pending) = self.pending.take() {
            self.capture = Some(pending.wait()?);
        }
        Ok(self.artifact())
    }

    /// Stop everything. A running recording is discarded; calling it again is a no-op.
    pub fn stop(&mut self) {
        self.stop.clear();
        if let Some(recorder) = self.recorder.take() {
            recorder.abort();
        }
        self.record_deadline = None;
        self.end_session();
        if self.state != CaptureState::Idle {
            tracing::info!(from = ?self.state, "studio stopped");
        }
        self.state = CaptureState::Idle;
    }

    fn begin_session(&mut self) -> SaxcatResult<SessionOrigin> {
        self.end_session();
        // The engine may have rendered a block past `now`; start where its clock stands so
        // the audio window lines up with whole blocks.
        let audio_now = Duration::from_secs_f64(self.engine.current_time_secs());
        let origin = SessionOrigin::at(self.clock.now().max(audio_now));
        let playback = PlaybackSession::start(
            &mut self.engine,
            origin,
            self.cfg.duration_secs,
            self.cfg.bpm,
        )?;
        self.playback = Some(playback);
        Ok(origin)
    }

    fn end_session(&mut self) {
        if let Some(mut render_loop) = self.render_loop.take() {
            render_loop.cancel();
        }
        if let Some(mut playback) = self.playback.take() {
            playback.stop(&mut self.engine);
        }
        // Bus left over from a session that failed half-way.
        self.engine.teardown();
    }

    fn new_loop(&mut self, origin: SessionOrigin, pacing: Pacing) -> RenderLoop {
        let handle = RenderLoopHandle(self.next_loop);
        self.next_loop += 1;
        RenderLoop::start(handle, origin, self.fps, self.canvas, pacing)
    }

    fn finish_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            self.pending = Some(recorder.request_stop());
        }
        self.record_deadline = None;
        self.end_session();
        self.state = CaptureState::Idle;
    }

    fn poll_pending(&mut self) -> SaxcatResult<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        match pending.try_resolve() {
            Some(result) => {
                self.pending = None;
                self.capture = Some(result?);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn release_artifact(&mut self) {
        if self.pending.take().is_some() {
            tracing::warn!("previous recording was still finalizing; its artifact is dropped");
        }
        if let Some(old) = self.capture.take()
            && let Some(artifact) = old.result
        {
            tracing::info!(
                bytes = artifact.bytes.len(),
                mime = %artifact.mime_type,
                "superseded artifact released"
            );
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/studio.rs"]
mod tests;
