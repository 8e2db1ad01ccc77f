use super::*;

fn note(start_secs: f64) -> VoiceSpec {
    VoiceSpec {
        start_secs,
        length_secs: 0.25,
        frequency_hz: 523.26,
    }
}

#[test]
fn zero_sample_rate_is_rejected() {
    assert!(SynthEngine::new(0).is_err());
}

#[test]
fn clock_advances_in_whole_quanta() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    assert_eq!(engine.render_until(0.01), 4);
    assert_eq!(engine.rendered_frames(), 4 * RENDER_QUANTUM_FRAMES as u64);
    assert_eq!(engine.render_until(0.005), 0);
}

#[test]
fn resume_never_moves_backwards() {
    let mut engine = SynthEngine::new(1_000).unwrap();
    engine.resume_at(2.0);
    assert_eq!(engine.rendered_frames(), 2_000);
    engine.resume_at(1.0);
    assert_eq!(engine.rendered_frames(), 2_000);
    assert_eq!(engine.current_time_secs(), 2.0);
}

#[test]
fn voices_require_a_bus() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    assert!(matches!(
        engine.start_voice(note(0.0)),
        Err(SaxcatError::Audio(_))
    ));
    engine.open_bus().unwrap();
    assert!(engine.start_voice(note(0.0)).is_ok());
}

#[test]
fn stop_voice_is_idempotent() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    engine.open_bus().unwrap();
    let h = engine.start_voice(note(0.0)).unwrap();
    assert!(engine.is_registered(h));
    assert!(engine.stop_voice(h));
    assert!(!engine.stop_voice(h));
    assert!(!engine.is_registered(h));
}

#[test]
fn teardown_releases_everything_once() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    assert_eq!(engine.teardown(), 0);
    engine.open_bus().unwrap();
    engine.start_backing_tone(0.0, 1.0).unwrap();
    engine.start_voice(note(0.1)).unwrap();
    assert_eq!(engine.teardown(), 2);
    assert_eq!(engine.teardown(), 0);
    assert!(!engine.has_bus());
    assert_eq!(engine.active_sources(), 0);
}

#[test]
fn reopening_the_bus_drops_the_old_graph() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    engine.open_bus().unwrap();
    engine.start_voice(note(0.0)).unwrap();
    engine.open_bus().unwrap();
    assert_eq!(engine.active_sources(), 0);
}

#[test]
fn voices_are_released_after_their_span() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    engine.open_bus().unwrap();
    let h = engine.start_voice(note(0.0)).unwrap();
    engine.render_until(0.2);
    assert!(engine.is_registered(h));
    engine.render_until(0.31);
    assert!(!engine.is_registered(h));
}

#[test]
fn mix_is_stereo_and_bounded() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    engine.open_bus().unwrap();
    engine.start_backing_tone(0.0, 1.0).unwrap();
    for i in 0..8 {
        engine.start_voice(note(0.01 * f64::from(i))).unwrap();
    }
    let mut loudest = 0.0f32;
    for _ in 0..100 {
        let block = engine.render_block();
        assert_eq!(block.channels, MIX_CHANNELS);
        assert_eq!(block.frames(), RENDER_QUANTUM_FRAMES as u64);
        for frame in block.samples.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        loudest = loudest.max(block.peak());
    }
    assert!(loudest > 0.05);
    assert!(loudest <= 1.0);
}

#[test]
fn ambience_echoes_after_the_dry_signal() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    engine.open_bus().unwrap();
    engine
        .start_voice(VoiceSpec {
            start_secs: 0.0,
            length_secs: 0.05,
            frequency_hz: 523.26,
        })
        .unwrap();
    // dry note ends at 0.1 s (including stop pad); echo arrives at 0.18 s
    engine.render_until(0.15);
    let mut echo = 0.0f32;
    while engine.current_time_secs() < 0.25 {
        echo = echo.max(engine.render_block().peak());
    }
    assert!(echo > 0.0);
}

#[test]
fn output_streams_receive_every_block() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    let stream = engine.output_stream().unwrap();
    assert_eq!(stream.sample_rate(), 48_000);
    assert_eq!(stream.channels(), 2);
    engine.render_until(0.01);
    let blocks = stream.drain();
    assert_eq!(blocks.len(), 4);
    assert_eq!(blocks[1].start_frame, RENDER_QUANTUM_FRAMES as u64);
    assert!(stream.drain().is_empty());
}

#[test]
fn dropped_streams_are_unsubscribed() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    drop(engine.output_stream());
    engine.render_block();
    assert!(engine.taps.is_empty());
}

#[test]
fn unavailable_engine_degrades() {
    let mut engine = SynthEngine::with_capability(48_000, AudioCapability::Unavailable).unwrap();
    assert!(!engine.is_available());
    assert!(engine.output_stream().is_none());
    assert!(engine.open_bus().is_err());
    engine.render_until(0.1);
    assert!(engine.current_time_secs() >= 0.1);
}

#[derive(Default)]
struct CountingMonitor {
    blocks: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    fail_after: Option<usize>,
}

impl AudioMonitor for CountingMonitor {
    fn write_block(&mut self, _block: &AudioBlock) -> SaxcatResult<()> {
        let n = self
            .blocks
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| n + 1 >= limit) {
            return Err(SaxcatError::audio("monitor device lost"));
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> SaxcatResult<()> {
        Ok(())
    }
}

#[test]
fn monitor_sees_blocks_and_is_dropped_on_failure() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    let seen = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    engine.set_monitor(Some(Box::new(CountingMonitor {
        blocks: seen.clone(),
        fail_after: Some(2),
    })));
    engine.render_until(0.02);
    assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(engine.set_monitor(None).is_none());
}
