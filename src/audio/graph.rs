//! Synthesis nodes: oscillators, parameter automation, a resonant low-pass, a delay line and the
//! two sound sources built from them (the melodic [`Voice`] and the [`BackingTone`]).
//!
//! Nodes work in `f64` on a mono signal; the engine converts to interleaved `f32` at the bus.

use crate::foundation::error::{SaxcatError, SaxcatResult};
use crate::foundation::math::wrap01;

/// Periodic oscillator shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// Pure sine.
    Sine,
    /// Triangle starting at zero and rising.
    Triangle,
    /// Sawtooth rising from zero, wrapping at the half period.
    Sawtooth,
}

impl Waveform {
    /// Sample at `phase` in cycles (`[0, 1)`).
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Self::Sine => (std::f64::consts::TAU * phase).sin(),
            Self::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Self::Sawtooth => 2.0 * wrap01(phase + 0.5) - 1.0,
        }
    }
}

/// Phase accumulator driving a [`Waveform`].
#[derive(Clone, Debug)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
}

impl Oscillator {
    /// Oscillator at phase zero.
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    /// Emit one sample at `frequency_hz` and advance.
    pub fn next_sample(&mut self, frequency_hz: f64, sample_rate: f64) -> f64 {
        let s = self.waveform.sample(self.phase);
        self.phase = wrap01(self.phase + frequency_hz / sample_rate);
        s
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Automation {
    Set,
    ExponentialRamp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ParamEvent {
    at_secs: f64,
    value: f64,
    kind: Automation,
}

/// Scheduled automation of one parameter, evaluated at absolute audio-clock seconds.
///
/// Follows the usual audio-graph rules: a set holds until the next event, and an exponential
/// ramp interpolates from the previous event's value and time to its own.
#[derive(Clone, Debug)]
pub struct ParamTimeline {
    initial: f64,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    /// Timeline holding `initial` until the first event.
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `at_secs`.
    pub fn set_value_at_time(&mut self, value: f64, at_secs: f64) {
        self.insert(ParamEvent {
            at_secs,
            value,
            kind: Automation::Set,
        });
    }

    /// Ramp exponentially to `value`, arriving at `at_secs`.
    ///
    /// Exponential ramps cannot reach or cross zero, so `value` must be non-zero.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f64,
        at_secs: f64,
    ) -> SaxcatResult<()> {
        if value == 0.0 || !value.is_finite() {
            return Err(SaxcatError::audio(
                "exponential ramp target must be finite and non-zero",
            ));
        }
        self.insert(ParamEvent {
            at_secs,
            value,
            kind: Automation::ExponentialRamp,
        });
        Ok(())
    }

    fn insert(&mut self, ev: ParamEvent) {
        let idx = self.events.partition_point(|e| e.at_secs <= ev.at_secs);
        self.events.insert(idx, ev);
    }

    /// Parameter value at `t_secs`.
    pub fn value_at(&self, t_secs: f64) -> f64 {
        let (mut t0, mut v0) = (0.0, self.initial);
        for ev in &self.events {
            if ev.at_secs <= t_secs {
                (t0, v0) = (ev.at_secs, ev.value);
                continue;
            }
            return match ev.kind {
                Automation::Set => v0,
                Automation::ExponentialRamp => {
                    exponential_between(t0, v0, ev.at_secs, ev.value, t_secs)
                }
            };
        }
        v0
    }
}

fn exponential_between(t0: f64, v0: f64, t1: f64, v1: f64, t: f64) -> f64 {
    if v0 == 0.0 || v0 * v1 < 0.0 {
        return v0;
    }
    if t1 <= t0 {
        return v1;
    }
    v0 * (v1 / v0).powf((t - t0) / (t1 - t0))
}

/// Resonant low-pass biquad (RBJ cookbook), with `Q` given in dB as audio graphs do.
#[derive(Clone, Debug, Default)]
pub struct LowPass {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl LowPass {
    /// Filter at rest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample with the given cutoff and resonance.
    pub fn process(&mut self, x: f64, cutoff_hz: f64, q_db: f64, sample_rate: f64) -> f64 {
        let nyquist = sample_rate * 0.5;
        let cutoff = cutoff_hz.clamp(1.0, nyquist * 0.999);
        let w0 = std::f64::consts::TAU * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * 10f64.powf(q_db / 20.0));

        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cos_w0) * 0.5 / a0;
        let b1 = (1.0 - cos_w0) / a0;
        let b2 = b0;
        let a1 = -2.0 * cos_w0 / a0;
        let a2 = (1.0 - alpha) / a0;

        let y = b0 * x + b1 * self.x1 + b2 * self.x2 - a1 * self.y1 - a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Fixed delay of a whole number of frames.
#[derive(Clone, Debug)]
pub struct DelayLine {
    buf: Vec<f64>,
    pos: usize,
}

impl DelayLine {
    /// Delay of `delay_secs` at `sample_rate` (at least one frame).
    pub fn new(delay_secs: f64, sample_rate: u32) -> Self {
        let frames = ((delay_secs * f64::from(sample_rate)).round() as usize).max(1);
        Self {
            buf: vec![0.0; frames],
            pos: 0,
        }
    }

    /// Delay length in frames.
    pub fn len_frames(&self) -> usize {
        self.buf.len()
    }

    /// Push `x` and return the sample written `len_frames` calls ago.
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.buf[self.pos];
        self.buf[self.pos] = x;
        self.pos = (self.pos + 1) % self.buf.len();
        y
    }
}

/// Cutoff of the voice filter.
pub const VOICE_CUTOFF_HZ: f64 = 1200.0;
/// Resonance of the voice filter (dB).
pub const VOICE_Q_DB: f64 = 0.9;
/// Vibrato rate.
pub const VIBRATO_HZ: f64 = 5.2;
/// Vibrato depth added to the cutoff (Hz).
pub const VIBRATO_DEPTH_HZ: f64 = 6.0;
/// Envelope floor (exponential ramps cannot touch zero).
pub const ENVELOPE_FLOOR: f64 = 0.0001;
/// Envelope peak.
pub const ENVELOPE_PEAK: f64 = 0.35;
/// Attack time.
pub const ATTACK_SECS: f64 = 0.03;
/// Oscillators keep running this long after the envelope reaches its floor.
pub const STOP_PAD_SECS: f64 = 0.05;
/// Backing tone frequency (the audio-graph oscillator default).
pub const BACKING_TONE_HZ: f64 = 440.0;
/// Backing tone level.
pub const BACKING_TONE_GAIN: f64 = 0.05;

/// Half-open frame span `[start, stop)` during which a source sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoundingSpan {
    /// First audible frame.
    pub start: u64,
    /// First silent frame after the source stops.
    pub stop: u64,
}

impl SoundingSpan {
    fn from_secs(start_secs: f64, stop_secs: f64, sample_rate: u32) -> Self {
        let sr = f64::from(sample_rate);
        let start = (start_secs.max(0.0) * sr).round() as u64;
        let stop = ((stop_secs.max(0.0) * sr).round() as u64).max(start);
        Self { start, stop }
    }

    /// Whether `frame` lies inside the span.
    pub fn contains(&self, frame: u64) -> bool {
        self.start <= frame && frame < self.stop
    }

    /// Cut the span short at `frame` (never lengthens it).
    pub fn truncate(&mut self, frame: u64) {
        self.stop = self.stop.min(frame.max(self.start));
    }
}

/// One melodic note: sawtooth into a vibrato-modulated low-pass, shaped by a gain envelope.
#[derive(Clone, Debug)]
pub struct Voice {
    span: SoundingSpan,
    frequency_hz: f64,
    osc: Oscillator,
    vibrato: Oscillator,
    filter: LowPass,
    gain: ParamTimeline,
}

impl Voice {
    /// Note starting at `start_secs` that decays to silence at `start_secs + length_secs`.
    pub fn new(
        start_secs: f64,
        length_secs: f64,
        frequency_hz: f64,
        sample_rate: u32,
    ) -> SaxcatResult<Self> {
        if !start_secs.is_finite() || !length_secs.is_finite() || length_secs <= 0.0 {
            return Err(SaxcatError::audio(format!(
                "voice needs a finite start and positive length, \
                 got start={start_secs} length={length_secs}"
            )));
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(SaxcatError::audio(format!(
                "voice frequency must be > 0, got {frequency_hz}"
            )));
        }
        let end = start_secs + length_secs;
        let mut gain = ParamTimeline::new(ENVELOPE_FLOOR);
        gain.set_value_at_time(ENVELOPE_FLOOR, start_secs);
        gain.exponential_ramp_to_value_at_time(ENVELOPE_PEAK, start_secs + ATTACK_SECS)?;
        gain.exponential_ramp_to_value_at_time(ENVELOPE_FLOOR, end)?;

        Ok(Self {
            span: SoundingSpan::from_secs(start_secs, end + STOP_PAD_SECS, sample_rate),
            frequency_hz,
            osc: Oscillator::new(Waveform::Sawtooth),
            vibrato: Oscillator::new(Waveform::Sine),
            filter: LowPass::new(),
            gain,
        })
    }

    /// Frames during which the oscillators run.
    pub fn span(&self) -> SoundingSpan {
        self.span
    }

    /// Gain envelope value at `t_secs`.
    pub fn envelope_at(&self, t_secs: f64) -> f64 {
        self.gain.value_at(t_secs)
    }

    /// Stop the oscillators at `frame` if they would otherwise run longer.
    pub fn stop_at(&mut self, frame: u64) {
        self.span.truncate(frame);
    }

    /// Render the sample at absolute `frame`.
    pub fn render(&mut self, frame: u64, sample_rate: u32) -> f64 {
        if !self.span.contains(frame) {
            return 0.0;
        }
        let sr = f64::from(sample_rate);
        let vib = self.vibrato.next_sample(VIBRATO_HZ, sr) * VIBRATO_DEPTH_HZ;
        let raw = self.osc.next_sample(self.frequency_hz, sr);
        let filtered = self
            .filter
            .process(raw, VOICE_CUTOFF_HZ + vib, VOICE_Q_DB, sr);
        filtered * self.gain.value_at(frame as f64 / sr)
    }
}

/// The quiet triangle drone under the melody.
#[derive(Clone, Debug)]
pub struct BackingTone {
    span: SoundingSpan,
    osc: Oscillator,
}

impl BackingTone {
    /// Tone sounding from `start_secs` until `stop_secs`.
    pub fn new(start_secs: f64, stop_secs: f64, sample_rate: u32) -> SaxcatResult<Self> {
        if !start_secs.is_finite() || !stop_secs.is_finite() || stop_secs < start_secs {
            return Err(SaxcatError::audio(format!(
                "backing tone needs start <= stop, got {start_secs}..{stop_secs}"
            )));
        }
        Ok(Self {
            span: SoundingSpan::from_secs(start_secs, stop_secs, sample_rate),
            osc: Oscillator::new(Waveform::Triangle),
        })
    }

    /// Frames during which the tone sounds.
    pub fn span(&self) -> SoundingSpan {
        self.span
    }

    /// Stop the tone at `frame` if it would otherwise run longer.
    pub fn stop_at(&mut self, frame: u64) {
        self.span.truncate(frame);
    }

    /// Render the sample at absolute `frame`.
    pub fn render(&mut self, frame: u64, sample_rate: u32) -> f64 {
        if !self.span.contains(frame) {
            return 0.0;
        }
        self.osc.next_sample(BACKING_TONE_HZ, f64::from(sample_rate)) * BACKING_TONE_GAIN
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
