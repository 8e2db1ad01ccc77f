use super::*;

#[test]
fn default_clip_has_four_bars_of_pattern() {
    let events = build_event_sequence(8.0, 96.0).unwrap();
    // bar = 2.5 s, ceil(8 / 2.5) = 4 bars
    assert_eq!(events.len(), 16);
    assert_eq!(events[0].onset_secs, 0.0);
    assert_eq!(events[0].scale_step, 0);
    assert_eq!(events[0].length_secs, 0.9375);
    let steps: Vec<i32> = events[..4].iter().map(|e| e.scale_step).collect();
    assert_eq!(steps, vec![0, 7, 10, 5]);
}

#[test]
fn onsets_advance_exactly_one_beat() {
    let events = build_event_sequence(8.0, 96.0).unwrap();
    for pair in events.windows(2) {
        assert_eq!(pair[1].onset_secs - pair[0].onset_secs, 0.625);
    }
    assert_eq!(events.last().unwrap().onset_secs, 15.0 * 0.625);
}

#[test]
fn sequence_is_deterministic() {
    assert_eq!(
        build_event_sequence(8.0, 96.0).unwrap(),
        build_event_sequence(8.0, 96.0).unwrap()
    );
}

#[test]
fn partial_bar_rounds_up() {
    // bar = 2 s at 120 bpm; 2.1 s needs two bars
    let events = build_event_sequence(2.1, 120.0).unwrap();
    assert_eq!(events.len(), 8);
    assert!(events.len() >= ((2.1f64 / 2.0).ceil() as usize) * 4);
}

#[test]
fn invalid_inputs_are_rejected() {
    for (d, bpm) in [
        (0.0, 96.0),
        (-1.0, 96.0),
        (f64::NAN, 96.0),
        (8.0, 0.0),
        (8.0, f64::INFINITY),
    ] {
        assert!(matches!(
            build_event_sequence(d, bpm),
            Err(SaxcatError::Validation(_))
        ));
    }
}

#[test]
fn oversized_sessions_are_rejected() {
    for (d, bpm) in [(8.0, 1e300), (1e300, 96.0), (f64::MAX, f64::MAX)] {
        assert!(matches!(
            build_event_sequence(d, bpm),
            Err(SaxcatError::Validation(_))
        ));
    }
    // 4096 bars at 60 bpm is exactly the limit.
    let at_limit = build_event_sequence(4.0 * MAX_BARS as f64, 60.0).unwrap();
    assert_eq!(at_limit.len(), MAX_BARS * BAR_PATTERN.len());
    assert!(build_event_sequence(4.0 * MAX_BARS as f64 + 1.0, 60.0).is_err());
}

#[test]
fn frequencies_sit_one_octave_above_the_root() {
    assert!((note_frequency(0) - 523.26).abs() < 1e-9);
    // step 8 wraps to degree 0
    assert_eq!(note_frequency(8), note_frequency(0));
    assert_eq!(note_frequency(-1), note_frequency(7));
    let fifth = note_frequency(3);
    assert!((fifth / note_frequency(0) - 2f64.powf(7.0 / 12.0)).abs() < 1e-12);
}

#[test]
fn schedule_offsets_voices_by_origin_and_lookahead() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    engine.resume_at(2.0);
    engine.open_bus().unwrap();
    let events = build_event_sequence(8.0, 96.0).unwrap();
    let origin = SessionOrigin::at(std::time::Duration::from_secs(2));
    let handles =
        schedule_session(&mut engine, &events, origin, ScheduleOpts::for_duration(8.0)).unwrap();
    assert_eq!(handles.len(), events.len() + 1);
    assert_eq!(engine.active_sources(), handles.len());

    // nothing sounds before origin + lookahead except the backing tone
    let block = engine.render_block();
    assert!(block.peak() > 0.0);
    assert!(block.peak() < 0.05);
}

#[test]
fn schedule_requires_an_open_bus() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    let err = schedule_session(
        &mut engine,
        &[],
        SessionOrigin::at(std::time::Duration::ZERO),
        ScheduleOpts::for_duration(1.0),
    )
    .unwrap_err();
    assert!(matches!(err, SaxcatError::Audio(_)));
}
