use super::*;

#[test]
fn waveforms_hit_their_landmarks() {
    assert_eq!(Waveform::Triangle.sample(0.0), 0.0);
    assert_eq!(Waveform::Triangle.sample(0.25), 1.0);
    assert_eq!(Waveform::Triangle.sample(0.75), -1.0);
    assert_eq!(Waveform::Sawtooth.sample(0.0), 0.0);
    assert!((Waveform::Sawtooth.sample(0.49) - 0.98).abs() < 1e-12);
    assert!((Waveform::Sawtooth.sample(0.5) + 1.0).abs() < 1e-12);
    assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-12);
}

#[test]
fn oscillator_completes_one_cycle_per_period() {
    let mut osc = Oscillator::new(Waveform::Sine);
    let sr = 48.0;
    let first = osc.next_sample(1.0, sr);
    for _ in 1..48 {
        osc.next_sample(1.0, sr);
    }
    let again = osc.next_sample(1.0, sr);
    assert!((first - again).abs() < 1e-9);
}

#[test]
fn set_value_holds_until_next_event() {
    let mut p = ParamTimeline::new(1.0);
    p.set_value_at_time(0.5, 2.0);
    assert_eq!(p.value_at(1.0), 1.0);
    assert_eq!(p.value_at(2.0), 0.5);
    assert_eq!(p.value_at(10.0), 0.5);
}

#[test]
fn exponential_ramp_interpolates_geometrically() {
    let mut p = ParamTimeline::new(0.0);
    p.set_value_at_time(0.01, 1.0);
    p.exponential_ramp_to_value_at_time(1.0, 3.0).unwrap();
    assert!((p.value_at(1.0) - 0.01).abs() < 1e-12);
    // halfway in time is the geometric mean
    assert!((p.value_at(2.0) - 0.1).abs() < 1e-12);
    assert_eq!(p.value_at(3.0), 1.0);
    assert_eq!(p.value_at(4.0), 1.0);
}

#[test]
fn ramp_to_zero_is_rejected() {
    let mut p = ParamTimeline::new(1.0);
    assert!(p.exponential_ramp_to_value_at_time(0.0, 1.0).is_err());
}

#[test]
fn lowpass_passes_dc_and_attenuates_nyquist() {
    let sr = 48_000.0;
    let mut dc = LowPass::new();
    let mut y = 0.0;
    for _ in 0..4800 {
        y = dc.process(1.0, 1200.0, 0.9, sr);
    }
    assert!((y - 1.0).abs() < 1e-6);

    let mut hi = LowPass::new();
    let mut peak: f64 = 0.0;
    for n in 0..4800 {
        let x = if n % 2 == 0 { 1.0 } else { -1.0 };
        let out = hi.process(x, 1200.0, 0.9, sr);
        if n > 2400 {
            peak = peak.max(out.abs());
        }
    }
    assert!(peak < 0.01, "nyquist leaked: {peak}");
}

#[test]
fn delay_line_delays_by_whole_frames() {
    let mut d = DelayLine::new(0.003, 1000);
    assert_eq!(d.len_frames(), 3);
    let out: Vec<f64> = [1.0, 2.0, 3.0, 4.0, 5.0]
        .iter()
        .map(|&x| d.process(x))
        .collect();
    assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn voice_envelope_matches_attack_and_release() {
    let v = Voice::new(1.0, 0.5, 440.0, 48_000).unwrap();
    assert!((v.envelope_at(1.0) - ENVELOPE_FLOOR).abs() < 1e-12);
    assert!((v.envelope_at(1.0 + ATTACK_SECS) - ENVELOPE_PEAK).abs() < 1e-12);
    assert!((v.envelope_at(1.5) - ENVELOPE_FLOOR).abs() < 1e-12);
    assert!(v.envelope_at(1.2) < ENVELOPE_PEAK && v.envelope_at(1.2) > ENVELOPE_FLOOR);
    assert_eq!(
        v.span(),
        SoundingSpan {
            start: 48_000,
            stop: 74_400
        }
    );
}

#[test]
fn voice_is_silent_outside_its_span() {
    let mut v = Voice::new(0.001, 0.1, 440.0, 48_000).unwrap();
    assert_eq!(v.render(0, 48_000), 0.0);
    let loud = (48..4800).map(|f| v.render(f, 48_000).abs()).fold(0.0, f64::max);
    assert!(loud > 0.01);
    assert_eq!(v.render(v.span().stop, 48_000), 0.0);
}

#[test]
fn stop_at_only_shortens() {
    let mut v = Voice::new(1.0, 1.0, 440.0, 1000).unwrap();
    v.stop_at(5_000);
    assert_eq!(v.span().stop, 2_050);
    v.stop_at(1_500);
    assert_eq!(v.span().stop, 1_500);
    v.stop_at(10);
    assert_eq!(v.span().stop, v.span().start);
}

#[test]
fn invalid_voices_are_rejected() {
    assert!(Voice::new(0.0, 0.0, 440.0, 48_000).is_err());
    assert!(Voice::new(0.0, 1.0, -1.0, 48_000).is_err());
    assert!(BackingTone::new(2.0, 1.0, 48_000).is_err());
}

#[test]
fn backing_tone_level_is_fixed() {
    let mut tone = BackingTone::new(0.0, 1.0, 48_000).unwrap();
    let peak = (0..4800).map(|f| tone.render(f, 48_000).abs()).fold(0.0, f64::max);
    assert!((peak - BACKING_TONE_GAIN).abs() < 1e-3);
    assert_eq!(tone.render(48_000, 48_000), 0.0);
}
