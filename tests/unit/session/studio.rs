use super::*;
use crate::config::CaptureTail;
use crate::encode::sink::{DigestRecord, DigestSink};
use crate::foundation::core::FrameIndex;
use crate::foundation::clock::ManualClock;

fn small_config() -> StudioConfig {
    StudioConfig {
        duration_secs: 1.0,
        width: 64,
        height: 48,
        fps: 10,
        sample_rate: 8_000,
        ..StudioConfig::default()
    }
}

fn studio(cfg: StudioConfig) -> (Studio, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let studio = Studio::new(cfg, clock.clone()).unwrap();
    (studio, clock)
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = StudioConfig {
        width: 63,
        ..small_config()
    };
    assert!(Studio::new(cfg, Arc::new(ManualClock::new())).is_err());
}

#[test]
fn preview_draws_frames_and_stops_cleanly() {
    let (mut s, clock) = studio(small_config());
    s.start_preview().unwrap();
    assert_eq!(s.state(), CaptureState::Previewing);
    assert_eq!(s.active_render_loops(), 1);
    assert_eq!(s.active_audio_graphs(), 1);

    s.pump().unwrap();
    clock.advance_secs(0.25);
    s.pump().unwrap();
    let latest = s.surface().latest().unwrap();
    assert_eq!(latest.index, FrameIndex(2));
    assert_eq!(s.surface().frames_presented(), 2);

    s.stop_preview();
    assert_eq!(s.state(), CaptureState::Idle);
    assert_eq!(s.active_render_loops(), 0);
    assert_eq!(s.active_audio_graphs(), 0);
    assert!(s.artifact().is_none());
    s.stop_preview();
}

#[test]
fn preview_audio_expires_but_the_picture_keeps_running() {
    let (mut s, clock) = studio(small_config());
    s.start_preview().unwrap();
    clock.advance_secs(3.0);
    s.pump().unwrap();
    assert_eq!(s.active_audio_graphs(), 0);
    assert_eq!(s.active_render_loops(), 1);
    assert!(s.status().is_previewing);
}

#[test]
fn preview_audio_outlives_the_nominal_duration() {
    // 1 s at 96 bpm: one bar, last onset 1.875 s, silent after 1.875 + 0.05 + 0.625 + 0.05.
    let (mut s, clock) = studio(small_config());
    s.start_preview().unwrap();
    let mut step = |secs: f64| {
        clock.advance_secs(secs);
        s.pump().unwrap();
        s.active_audio_graphs()
    };
    assert_eq!(step(1.0), 1);
    assert_eq!(step(0.15), 1);
    assert_eq!(step(0.15), 1);
    assert_eq!(step(0.7), 1);
    assert_eq!(step(1.0), 0);
}

#[test]
fn restarting_preview_leaves_one_loop_and_one_graph() {
    let (mut s, clock) = studio(small_config());
    s.start_preview().unwrap();
    let first = s.render_loop_handle().unwrap();
    clock.advance_secs(0.3);
    s.pump().unwrap();

    s.start_preview().unwrap();
    let second = s.render_loop_handle().unwrap();
    assert_ne!(first, second);
    assert_eq!(s.active_render_loops(), 1);
    assert_eq!(s.active_audio_graphs(), 1);
    let voices = s.playback().unwrap().voices().len();
    assert_eq!(s.engine().active_sources(), voices);
}

#[test]
fn record_produces_an_artifact_with_both_tracks() {
    let (mut s, _clock) = studio(small_config());
    let artifact = s.record(Box::new(DigestSink::new())).unwrap().unwrap();
    assert_eq!(artifact.video.frames, 10);
    assert_eq!(artifact.audio.map(|a| a.frames), Some(8_000));
    assert!((artifact.duration_secs - 1.0).abs() < 1e-9);
    assert_eq!(s.state(), CaptureState::Idle);
    assert!(s.status().has_artifact);
    assert_eq!(s.active_audio_graphs(), 0);
    assert_eq!(s.active_render_loops(), 0);
}

#[test]
fn include_release_extends_the_capture() {
    let cfg = StudioConfig {
        capture_tail: CaptureTail::IncludeRelease,
        ..small_config()
    };
    let (mut s, _clock) = studio(cfg);
    let artifact = s.record(Box::new(DigestSink::new())).unwrap().unwrap();
    assert_eq!(artifact.video.frames, 13);
    assert!((artifact.duration_secs - 1.3).abs() < 1e-9);
}

#[test]
fn recording_without_audio_has_a_single_track() {
    let cfg = StudioConfig {
        audio_enabled: false,
        ..small_config()
    };
    let (mut s, _clock) = studio(cfg);
    let artifact = s.record(Box::new(DigestSink::new())).unwrap().unwrap();
    assert_eq!(artifact.track_count(), 1);
    assert_eq!(artifact.video.frames, 10);
}

#[test]
fn stopping_a_recording_discards_it() {
    let (mut s, clock) = studio(small_config());
    s.start_recording(Box::new(DigestSink::new())).unwrap();
    clock.advance_secs(0.5);
    s.pump().unwrap();
    s.stop();
    assert_eq!(s.state(), CaptureState::Idle);
    assert_eq!(s.await_artifact().unwrap(), None);
    s.stop();
}

#[test]
fn stop_handle_cancels_on_the_next_pump() {
    let (mut s, clock) = studio(small_config());
    s.start_recording(Box::new(DigestSink::new())).unwrap();
    s.stop_handle().request_stop();
    clock.advance_secs(2.0);
    s.pump().unwrap();
    assert_eq!(s.state(), CaptureState::Idle);
    assert!(!s.stop_handle().is_requested());
    assert!(s.await_artifact().unwrap().is_none());
}

#[test]
fn a_new_recording_supersedes_the_previous_artifact() {
    let (mut s, _clock) = studio(small_config());
    s.record(Box::new(DigestSink::new())).unwrap();
    let first = s.artifact().unwrap().bytes.clone();

    s.start_recording(Box::new(DigestSink::new())).unwrap();
    assert!(s.artifact().is_none());
    s.stop();
    assert!(s.await_artifact().unwrap().is_none());

    let second = s.record(Box::new(DigestSink::new())).unwrap().unwrap();
    assert_eq!(second.audio.map(|a| a.frames), Some(8_000));
    assert_eq!(frame_digests(&second.bytes), frame_digests(&first));
}

fn frame_digests(bytes: &[u8]) -> Vec<(FrameIndex, u64)> {
    DigestSink::decode(bytes)
        .unwrap()
        .into_iter()
        .filter_map(|r| match r {
            DigestRecord::Frame { index, digest } => Some((index, digest)),
            DigestRecord::Audio { .. } => None,
        })
        .collect()
}

#[test]
fn preview_is_refused_while_recording() {
    let (mut s, _clock) = studio(small_config());
    s.start_recording(Box::new(DigestSink::new())).unwrap();
    assert!(s.start_preview().is_err());
    assert!(s.status().is_recording);
}

#[test]
fn run_preview_for_returns_to_idle() {
    let (mut s, clock) = studio(small_config());
    s.run_preview_for(0.5).unwrap();
    assert_eq!(s.state(), CaptureState::Idle);
    assert!(s.surface().frames_presented() >= 5);
    assert!(clock.now() >= Duration::from_millis(500));
}
