use super::*;
use crate::audio::engine::AudioCapability;

fn origin(secs: f64) -> SessionOrigin {
    SessionOrigin::at(Duration::from_secs_f64(secs))
}

#[test]
fn start_schedules_backing_tone_and_every_event() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    let session = PlaybackSession::start(&mut engine, origin(0.0), 8.0, 96.0).unwrap();
    assert_eq!(session.events().len(), 16);
    assert_eq!(session.voices().len(), 17);
    assert_eq!(session.live_voices(&engine), 17);
    assert!(engine.has_bus());
    assert!(session.is_active());
}

#[test]
fn start_resumes_the_audio_clock_at_the_origin() {
    let mut engine = SynthEngine::new(1_000).unwrap();
    let _session = PlaybackSession::start(&mut engine, origin(3.0), 8.0, 96.0).unwrap();
    assert_eq!(engine.rendered_frames(), 3_000);
}

#[test]
fn stop_releases_everything_and_is_idempotent() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    let mut session = PlaybackSession::start(&mut engine, origin(0.0), 8.0, 96.0).unwrap();
    engine.render_until(1.0);

    let stopped = session.stop(&mut engine);
    assert!(stopped > 0);
    assert!(!engine.has_bus());
    assert_eq!(engine.active_sources(), 0);
    assert_eq!(session.live_voices(&engine), 0);
    assert!(!session.is_active());

    assert_eq!(session.stop(&mut engine), 0);
}

#[test]
fn voices_are_released_at_their_natural_end() {
    let mut engine = SynthEngine::new(8_000).unwrap();
    let session = PlaybackSession::start(&mut engine, origin(0.0), 8.0, 96.0).unwrap();
    engine.render_until(12.0);
    assert_eq!(session.live_voices(&engine), 0);
}

#[test]
fn unavailable_audio_runs_visual_only() {
    let mut engine = SynthEngine::with_capability(48_000, AudioCapability::Unavailable).unwrap();
    let mut session = PlaybackSession::start(&mut engine, origin(0.0), 8.0, 96.0).unwrap();
    assert_eq!(session.events().len(), 16);
    assert!(session.voices().is_empty());
    assert!(!engine.has_bus());
    assert_eq!(session.stop(&mut engine), 0);
}

#[test]
fn expiry_includes_the_release_margin() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    let session = PlaybackSession::start(&mut engine, origin(1.0), 8.0, 96.0).unwrap();
    assert!(!session.has_expired(Duration::from_secs(9)));
    assert!(!session.has_expired(Duration::from_secs_f64(9.15)));
    assert!(session.has_expired(Duration::from_secs_f64(9.35)));
}

#[test]
fn trailing_notes_keep_the_session_running_past_the_margin() {
    let mut engine = SynthEngine::new(8_000).unwrap();
    let session = PlaybackSession::start(&mut engine, origin(0.0), 8.0, 96.0).unwrap();

    // Last onset is 9.375 s; it sounds until 9.375 + 0.05 + 0.625 + 0.05.
    engine.render_until(8.35);
    let at_margin = Duration::from_secs_f64(8.35);
    assert!(session.has_expired(at_margin));
    assert!(session.live_voices(&engine) > 0);
    assert!(!session.is_finished(at_margin, &engine));

    engine.render_until(10.5);
    assert_eq!(session.live_voices(&engine), 0);
    assert!(session.is_finished(Duration::from_secs_f64(10.5), &engine));
}

#[test]
fn invalid_tempo_is_rejected_before_touching_the_engine() {
    let mut engine = SynthEngine::new(48_000).unwrap();
    assert!(PlaybackSession::start(&mut engine, origin(0.0), 8.0, 0.0).is_err());
    assert!(!engine.has_bus());
}
