use std::collections::BTreeMap;
use std::sync::mpsc;

use crate::audio::graph::{BackingTone, DelayLine, SoundingSpan, Voice};
use crate::audio::monitor::AudioMonitor;
use crate::audio::stream::{AudioBlock, AudioOutputStream};
use crate::foundation::error::{SaxcatError, SaxcatResult};

/// Frames rendered per block (the audio-graph render quantum).
pub const RENDER_QUANTUM_FRAMES: usize = 128;
/// Output channel count (interleaved stereo).
pub const MIX_CHANNELS: u16 = 2;
/// Level of the mix bus.
pub const MASTER_GAIN: f64 = 0.6;
/// Delay of the ambience send.
pub const AMBIENCE_DELAY_SECS: f64 = 0.18;
/// Level of the ambience return.
pub const AMBIENCE_RETURN_GAIN: f64 = 0.18;

/// Identity of one sound source registered with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceHandle(u64);

impl VoiceHandle {
    /// Raw id (monotonic per engine).
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A note to realize, in absolute audio-clock seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceSpec {
    /// Onset on the audio clock.
    pub start_secs: f64,
    /// Time from onset until the envelope reaches its floor.
    pub length_secs: f64,
    /// Oscillator frequency.
    pub frequency_hz: f64,
}

/// Whether the runtime can produce audio at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioCapability {
    /// Audio renders and can be captured.
    #[default]
    Available,
    /// No audio output; sessions run visual-only.
    Unavailable,
}

#[derive(Clone, Debug)]
enum Source {
    Voice(Voice),
    Backing(BackingTone),
}

impl Source {
    fn render(&mut self, frame: u64, sample_rate: u32) -> f64 {
        match self {
            Self::Voice(v) => v.render(frame, sample_rate),
            Self::Backing(b) => b.render(frame, sample_rate),
        }
    }

    fn span(&self) -> SoundingSpan {
        match self {
            Self::Voice(v) => v.span(),
            Self::Backing(b) => b.span(),
        }
    }

    fn stop_at(&mut self, frame: u64) {
        match self {
            Self::Voice(v) => v.stop_at(frame),
            Self::Backing(b) => b.stop_at(frame),
        }
    }

    fn feeds_ambience(&self) -> bool {
        matches!(self, Self::Voice(_))
    }
}

/// The per-session graph: registered sources plus the ambience delay, summed into the master.
#[derive(Debug)]
struct MixBus {
    sources: BTreeMap<VoiceHandle, Source>,
    ambience: DelayLine,
}

/// Signal synthesis engine.
///
/// Renders fixed-size blocks on its own audio clock (`rendered_frames / sample_rate`), which
/// persists across sessions. Each session opens a fresh mix bus; [`SynthEngine::teardown`]
/// releases it together with every source still registered.
pub struct SynthEngine {
    sample_rate: u32,
    capability: AudioCapability,
    rendered_frames: u64,
    bus: Option<MixBus>,
    next_handle: u64,
    taps: Vec<mpsc::Sender<AudioBlock>>,
    monitor: Option<Box<dyn AudioMonitor>>,
}

impl std::fmt::Debug for SynthEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthEngine")
            .field("sample_rate", &self.sample_rate)
            .field("capability", &self.capability)
            .field("rendered_frames", &self.rendered_frames)
            .field("bus_open", &self.bus.is_some())
            .field("taps", &self.taps.len())
            .field("monitor", &self.monitor.is_some())
            .finish()
    }
}

impl SynthEngine {
    /// Engine with audio available.
    pub fn new(sample_rate: u32) -> SaxcatResult<Self> {
        Self::with_capability(sample_rate, AudioCapability::Available)
    }

    /// Engine with an explicit capability.
    pub fn with_capability(sample_rate: u32, capability: AudioCapability) -> SaxcatResult<Self> {
        if sample_rate == 0 {
            return Err(SaxcatError::validation("sample_rate must be non-zero"));
        }
        Ok(Self {
            sample_rate,
            capability,
            rendered_frames: 0,
            bus: None,
            next_handle: 0,
            taps: Vec::new(),
            monitor: None,
        })
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output capability.
    pub fn capability(&self) -> AudioCapability {
        self.capability
    }

    /// Whether audio can be produced.
    pub fn is_available(&self) -> bool {
        self.capability == AudioCapability::Available
    }

    /// Frames rendered so far.
    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames
    }

    /// Audio clock in seconds.
    pub fn current_time_secs(&self) -> f64 {
        self.rendered_frames as f64 / f64::from(self.sample_rate)
    }

    /// Skip the idle gap up to `secs` without rendering (the clock never runs backwards).
    pub fn resume_at(&mut self, secs: f64) {
        let target = (secs.max(0.0) * f64::from(self.sample_rate)).round() as u64;
        if target > self.rendered_frames {
            tracing::trace!(from = self.rendered_frames, to = target, "audio clock resumed");
            self.rendered_frames = target;
        }
    }

    /// Open a fresh mix bus, releasing any previous one.
    pub fn open_bus(&mut self) -> SaxcatResult<()> {
        if !self.is_available() {
            return Err(SaxcatError::audio("audio output is unavailable"));
        }
        let released = self.teardown();
        if released > 0 {
            tracing::warn!(released, "previous mix bus was still open");
        }
        self.bus = Some(MixBus {
            sources: BTreeMap::new(),
            ambience: DelayLine::new(AMBIENCE_DELAY_SECS, self.sample_rate),
        });
        tracing::debug!(at_secs = self.current_time_secs(), "mix bus opened");
        Ok(())
    }

    /// Whether a mix bus is open.
    pub fn has_bus(&self) -> bool {
        self.bus.is_some()
    }

    /// Register the backing tone.
    pub fn start_backing_tone(
        &mut self,
        start_secs: f64,
        stop_secs: f64,
    ) -> SaxcatResult<VoiceHandle> {
        let tone = BackingTone::new(start_secs, stop_secs, self.sample_rate)?;
        self.register(Source::Backing(tone))
    }

    /// Register one melodic voice.
    pub fn start_voice(&mut self, spec: VoiceSpec) -> SaxcatResult<VoiceHandle> {
        let voice = Voice::new(
            spec.start_secs,
            spec.length_secs,
            spec.frequency_hz,
            self.sample_rate,
        )?;
        self.register(Source::Voice(voice))
    }

    fn register(&mut self, source: Source) -> SaxcatResult<VoiceHandle> {
        let bus = self
            .bus
            .as_mut()
            .ok_or_else(|| SaxcatError::audio("no mix bus open; start a session first"))?;
        let handle = VoiceHandle(self.next_handle);
        self.next_handle += 1;
        bus.sources.insert(handle, source);
        Ok(handle)
    }

    /// Stop and disconnect `handle`. Returns `false` if it was already released.
    pub fn stop_voice(&mut self, handle: VoiceHandle) -> bool {
        let now = self.rendered_frames;
        let Some(bus) = self.bus.as_mut() else {
            return false;
        };
        match bus.sources.remove(&handle) {
            Some(mut source) => {
                source.stop_at(now);
                true
            }
            None => false,
        }
    }

    /// Whether `handle` is still registered (scheduled or sounding).
    pub fn is_registered(&self, handle: VoiceHandle) -> bool {
        self.bus
            .as_ref()
            .is_some_and(|bus| bus.sources.contains_key(&handle))
    }

    /// Number of registered sources.
    pub fn active_sources(&self) -> usize {
        self.bus.as_ref().map_or(0, |bus| bus.sources.len())
    }

    /// Release the mix bus and every source on it. Returns how many sources were released;
    /// calling it again is a no-op.
    pub fn teardown(&mut self) -> usize {
        match self.bus.take() {
            Some(bus) => {
                let released = bus.sources.len();
                tracing::debug!(released, "mix bus torn down");
                released
            }
            None => 0,
        }
    }

    /// Subscribe to the mix output. `None` when audio is unavailable.
    pub fn output_stream(&mut self) -> Option<AudioOutputStream> {
        if !self.is_available() {
            return None;
        }
        let (tx, rx) = mpsc::channel();
        self.taps.push(tx);
        Some(AudioOutputStream::new(rx, self.sample_rate, MIX_CHANNELS))
    }

    /// Install (or remove) the local monitor; returns the previous one.
    pub fn set_monitor(
        &mut self,
        monitor: Option<Box<dyn AudioMonitor>>,
    ) -> Option<Box<dyn AudioMonitor>> {
        std::mem::replace(&mut self.monitor, monitor)
    }

    /// Render whole blocks until the audio clock reaches `secs`. Returns the block count.
    pub fn render_until(&mut self, secs: f64) -> usize {
        let target = (secs.max(0.0) * f64::from(self.sample_rate)).ceil() as u64;
        let mut blocks = 0;
        while self.rendered_frames < target {
            self.render_block();
            blocks += 1;
        }
        blocks
    }

    /// Render one block, deliver it to taps and the monitor, and return it.
    ///
    /// Without an open bus the block is silent; an unavailable engine only advances its clock.
    pub fn render_block(&mut self) -> AudioBlock {
        let start = self.rendered_frames;
        let channels = usize::from(MIX_CHANNELS);
        let mut samples = vec![0f32; RENDER_QUANTUM_FRAMES * channels];

        if let Some(bus) = self.bus.as_mut() {
            let sr = self.sample_rate;
            for (i, frame_out) in samples.chunks_exact_mut(channels).enumerate() {
                let frame = start + i as u64;
                let mut dry = 0.0;
                let mut send = 0.0;
                for source in bus.sources.values_mut() {
                    let s = source.render(frame, sr);
                    dry += s;
                    if source.feeds_ambience() {
                        send += s;
                    }
                }
                let wet = bus.ambience.process(send) * AMBIENCE_RETURN_GAIN;
                let out = ((dry + wet) * MASTER_GAIN).clamp(-1.0, 1.0) as f32;
                frame_out.fill(out);
            }

            let block_end = start + RENDER_QUANTUM_FRAMES as u64;
            bus.sources
                .retain(|_, source| source.span().stop > block_end);
        }

        self.rendered_frames += RENDER_QUANTUM_FRAMES as u64;
        let block = AudioBlock::new(start, self.sample_rate, MIX_CHANNELS, samples);
        if !self.is_available() {
            return block;
        }

        self.taps.retain(|tx| tx.send(block.clone()).is_ok());
        let failed = match self.monitor.as_mut() {
            Some(monitor) => monitor.write_block(&block).err(),
            None => None,
        };
        if let Some(err) = failed {
            tracing::warn!(error = %err, "audio monitor failed; monitoring disabled");
            self.monitor = None;
        }
        block
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/engine.rs"]
mod tests;
