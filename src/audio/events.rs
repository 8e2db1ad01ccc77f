//! The melodic pattern and its realization on the synthesis engine.

use crate::audio::engine::{SynthEngine, VoiceHandle, VoiceSpec};
use crate::foundation::clock::SessionOrigin;
use crate::foundation::error::{SaxcatError, SaxcatResult};

/// Scale degrees (semitones above the root) indexed by `scale_step mod 8`.
pub const SCALE_SEMITONES: [i32; 8] = [0, 3, 5, 7, 10, 12, 15, 17];
/// Root frequency (middle C).
pub const BASE_FREQUENCY_HZ: f64 = 261.63;
/// Every note is raised by one octave.
pub const OCTAVE_SHIFT_SEMITONES: i32 = 12;
/// One bar: `(scale_step, length_in_beats)` per event.
pub const BAR_PATTERN: [(i32, f64); 4] = [(0, 1.5), (7, 0.5), (10, 1.0), (5, 1.0)];
/// Beats per bar.
pub const BEATS_PER_BAR: f64 = 4.0;
/// Scheduling lead so the first notes are never in the past.
pub const LOOKAHEAD_SECS: f64 = 0.05;
/// How long the audio session outlives the nominal duration.
pub const RELEASE_MARGIN_SECS: f64 = 0.3;
/// Upper bound on generated bars; longer sessions are rejected.
pub const MAX_BARS: usize = 4096;

/// One scheduled note, relative to the session origin.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MusicalEvent {
    /// Onset in seconds after the session origin (before lookahead).
    pub onset_secs: f64,
    /// Index into [`SCALE_SEMITONES`] (taken modulo its length).
    pub scale_step: i32,
    /// Sounding length in seconds.
    pub length_secs: f64,
}

impl MusicalEvent {
    /// Oscillator frequency of this event.
    pub fn frequency_hz(&self) -> f64 {
        note_frequency(self.scale_step)
    }
}

/// Seconds per beat.
pub fn beat_secs(bpm: f64) -> f64 {
    60.0 / bpm
}

/// Frequency for a scale step, one octave above [`BASE_FREQUENCY_HZ`].
pub fn note_frequency(scale_step: i32) -> f64 {
    let degree = SCALE_SEMITONES[scale_step.rem_euclid(SCALE_SEMITONES.len() as i32) as usize];
    BASE_FREQUENCY_HZ * 2f64.powf(f64::from(degree + OCTAVE_SHIFT_SEMITONES) / 12.0)
}

/// Build the full event list for a session of `duration_secs` at `bpm`.
///
/// Emits `ceil(duration / bar)` bars of [`BAR_PATTERN`]; onsets advance one beat per event, so
/// trailing events may start after `duration_secs`.
pub fn build_event_sequence(duration_secs: f64, bpm: f64) -> SaxcatResult<Vec<MusicalEvent>> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(SaxcatError::validation(format!(
            "duration must be finite and > 0, got {duration_secs}"
        )));
    }
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(SaxcatError::validation(format!(
            "bpm must be finite and > 0, got {bpm}"
        )));
    }

    let beat = beat_secs(bpm);
    let bars = (duration_secs / (beat * BEATS_PER_BAR)).ceil();
    if !bars.is_finite() || bars > MAX_BARS as f64 {
        return Err(SaxcatError::validation(format!(
            "duration {duration_secs}s at {bpm} bpm needs {bars} bars, more than {MAX_BARS}"
        )));
    }
    let bars = bars as usize;
    let mut events = Vec::with_capacity(bars * BAR_PATTERN.len());
    for bar in 0..bars {
        for (slot, &(scale_step, beats)) in BAR_PATTERN.iter().enumerate() {
            let index = bar * BAR_PATTERN.len() + slot;
            events.push(MusicalEvent {
                onset_secs: index as f64 * beat,
                scale_step,
                length_secs: beats * beat,
            });
        }
    }
    Ok(events)
}

/// Timing knobs for [`schedule_session`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleOpts {
    /// Nominal clip length; the backing tone runs until `duration + release_margin`.
    pub duration_secs: f64,
    /// Lead added to every voice onset.
    pub lookahead_secs: f64,
    /// Tail kept after the nominal duration.
    pub release_margin_secs: f64,
}

impl ScheduleOpts {
    /// Standard timing for a clip of `duration_secs`.
    pub fn for_duration(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            lookahead_secs: LOOKAHEAD_SECS,
            release_margin_secs: RELEASE_MARGIN_SECS,
        }
    }
}

/// Start the backing tone and one voice per event, all up front.
///
/// Returns every handle created, backing tone first.
#[tracing::instrument(level = "debug", skip(engine, events), fields(events = events.len()))]
pub fn schedule_session(
    engine: &mut SynthEngine,
    events: &[MusicalEvent],
    origin: SessionOrigin,
    opts: ScheduleOpts,
) -> SaxcatResult<Vec<VoiceHandle>> {
    let start = origin.secs();
    let mut handles = Vec::with_capacity(events.len() + 1);
    handles.push(engine.start_backing_tone(
        start,
        start + opts.duration_secs + opts.release_margin_secs,
    )?);

    for ev in events {
        handles.push(engine.start_voice(VoiceSpec {
            start_secs: start + ev.onset_secs + opts.lookahead_secs,
            length_secs: ev.length_secs,
            frequency_hz: ev.frequency_hz(),
        })?);
    }
    tracing::debug!(voices = handles.len(), "scheduled session");
    Ok(handles)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/events.rs"]
mod tests;
