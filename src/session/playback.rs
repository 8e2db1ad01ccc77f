use std::collections::BTreeSet;
use std::time::Duration;

use crate::audio::engine::{SynthEngine, VoiceHandle};
use crate::audio::events::{
    MusicalEvent, RELEASE_MARGIN_SECS, ScheduleOpts, build_event_sequence, schedule_session,
};
use crate::foundation::clock::SessionOrigin;
use crate::foundation::error::SaxcatResult;

/// One audio run: the scheduled events and every voice they created.
///
/// At most one exists per [`crate::Studio`]; the engine's mix bus belongs to it until
/// [`PlaybackSession::stop`].
#[derive(Debug)]
pub struct PlaybackSession {
    origin: SessionOrigin,
    duration_secs: f64,
    events: Vec<MusicalEvent>,
    voices: BTreeSet<VoiceHandle>,
    active: bool,
}

impl PlaybackSession {
    /// Build the event list and schedule it on `engine`, starting at `origin`.
    ///
    /// With audio unavailable the session still runs (visual-only) and holds no voices.
    #[tracing::instrument(level = "debug", skip(engine, origin))]
    pub fn start(
        engine: &mut SynthEngine,
        origin: SessionOrigin,
        duration_secs: f64,
        bpm: f64,
    ) -> SaxcatResult<Self> {
        let events = build_event_sequence(duration_secs, bpm)?;
        engine.resume_at(origin.secs());

        let voices = if engine.is_available() {
            engine.open_bus()?;
            schedule_session(
                engine,
                &events,
                origin,
                ScheduleOpts::for_duration(duration_secs),
            )?
            .into_iter()
            .collect()
        } else {
            tracing::warn!("audio unavailable; session runs visual-only");
            BTreeSet::new()
        };

        tracing::info!(
            origin_secs = origin.secs(),
            events = events.len(),
            voices = voices.len(),
            "playback session started"
        );
        Ok(Self {
            origin,
            duration_secs,
            events,
            voices,
            active: true,
        })
    }

    /// Session clock origin.
    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Nominal clip length.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// The events generated for this session.
    pub fn events(&self) -> &[MusicalEvent] {
        &self.events
    }

    /// Handles created for this session (backing tone included).
    pub fn voices(&self) -> &BTreeSet<VoiceHandle> {
        &self.voices
    }

    /// Whether the session still owns its audio graph.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Voices of this session the engine still holds.
    pub fn live_voices(&self, engine: &SynthEngine) -> usize {
        self.voices
            .iter()
            .filter(|h| engine.is_registered(**h))
            .count()
    }

    /// Whether the duration plus the release margin has elapsed at clock time `now`.
    pub fn has_expired(&self, now: Duration) -> bool {
        self.origin.elapsed_secs(now) >= self.duration_secs + RELEASE_MARGIN_SECS
    }

    /// Whether the session has nothing left to play: the release margin is over and every
    /// scheduled voice (trailing notes included) has ended on `engine`.
    pub fn is_finished(&self, now: Duration, engine: &SynthEngine) -> bool {
        self.has_expired(now) && self.live_voices(engine) == 0
    }

    /// Stop every voice and release the mix bus. Returns how many voices were still live;
    /// stopping an inactive session does nothing.
    pub fn stop(&mut self, engine: &mut SynthEngine) -> usize {
        if !self.active {
            return 0;
        }
        self.active = false;
        let stopped = self
            .voices
            .iter()
            .filter(|h| engine.stop_voice(**h))
            .count();
        let leftover = engine.teardown();
        tracing::info!(stopped, leftover, "playback session stopped");
        stopped
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/playback.rs"]
mod tests;
