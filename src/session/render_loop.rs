use std::time::Duration;

use crate::foundation::clock::SessionOrigin;
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::SaxcatResult;
use crate::render::frame::FrameRGBA;
use crate::render::scene::FrameRenderer;

// Absorbs nanosecond rounding between frame deadlines and `Duration`.
const DUE_EPSILON_SECS: f64 = 1e-7;

/// Registration of a repeating frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderLoopHandle(pub(crate) u64);

impl RenderLoopHandle {
    /// Raw id (monotonic per studio).
    pub fn id(self) -> u64 {
        self.0
    }
}

/// What a tick does when several frames became due since the last one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pacing {
    /// Draw every due frame in order (recording: no frame is skipped).
    CatchUp,
    /// Draw only the newest due frame (preview).
    #[default]
    Latest,
}

/// Drives the frame renderer on a fixed frame grid anchored at the session origin.
#[derive(Debug)]
pub struct RenderLoop {
    handle: RenderLoopHandle,
    origin: SessionOrigin,
    fps: Fps,
    canvas: Canvas,
    pacing: Pacing,
    renderer: FrameRenderer,
    next_frame: u64,
    drawn: u64,
    cancelled: bool,
}

impl RenderLoop {
    /// Register a loop whose frame 0 is due at `origin`.
    pub fn start(
        handle: RenderLoopHandle,
        origin: SessionOrigin,
        fps: Fps,
        canvas: Canvas,
        pacing: Pacing,
    ) -> Self {
        tracing::debug!(id = handle.0, ?pacing, "render loop started");
        Self {
            handle,
            origin,
            fps,
            canvas,
            pacing,
            renderer: FrameRenderer::new(),
            next_frame: 0,
            drawn: 0,
            cancelled: false,
        }
    }

    /// Loop identity.
    pub fn handle(&self) -> RenderLoopHandle {
        self.handle
    }

    /// Whether [`RenderLoop::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Frames drawn so far.
    pub fn frames_drawn(&self) -> u64 {
        self.drawn
    }

    /// Index the next tick will draw first.
    pub fn next_frame(&self) -> FrameIndex {
        FrameIndex(self.next_frame)
    }

    /// Clock time at which the next frame becomes due.
    pub fn next_frame_due(&self) -> Duration {
        self.origin
            .offset(self.fps.frame_time_secs(FrameIndex(self.next_frame)))
    }

    /// Draw the frames that are due at clock time `now`, handing each to `present`.
    ///
    /// Returns the number of frames drawn; a cancelled loop draws nothing.
    pub fn tick<F>(&mut self, now: Duration, mut present: F) -> SaxcatResult<usize>
    where
        F: FnMut(FrameIndex, f64, &FrameRGBA) -> SaxcatResult<()>,
    {
        if self.cancelled {
            return Ok(0);
        }
        let elapsed = self.origin.elapsed_secs(now);
        let newest = self.fps.secs_to_frames_floor(elapsed + DUE_EPSILON_SECS);
        if newest < self.next_frame {
            return Ok(0);
        }

        let first = match self.pacing {
            Pacing::CatchUp => self.next_frame,
            Pacing::Latest => newest,
        };
        let mut drawn = 0;
        for idx in first..=newest {
            let idx = FrameIndex(idx);
            let t = self.fps.frame_time_secs(idx);
            let frame = self.renderer.render(t, self.canvas)?;
            present(idx, t, &frame)?;
            self.next_frame = idx.0 + 1;
            drawn += 1;
        }
        self.drawn += drawn as u64;
        Ok(drawn)
    }

    /// Stop drawing. Returns `false` if the loop was already cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        tracing::debug!(id = self.handle.0, drawn = self.drawn, "render loop cancelled");
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_loop.rs"]
mod tests;
