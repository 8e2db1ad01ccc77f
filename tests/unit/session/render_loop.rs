use super::*;

fn small_loop(pacing: Pacing) -> RenderLoop {
    RenderLoop::start(
        RenderLoopHandle(7),
        SessionOrigin::at(Duration::from_secs(2)),
        Fps::new(10, 1).unwrap(),
        Canvas::new(32, 24).unwrap(),
        pacing,
    )
}

fn at(secs: f64) -> Duration {
    Duration::from_secs_f64(secs)
}

#[test]
fn nothing_is_due_before_the_origin() {
    let mut l = small_loop(Pacing::CatchUp);
    assert_eq!(l.tick(at(1.5), |_, _, _| Ok(())).unwrap(), 0);
    assert_eq!(l.next_frame_due(), at(2.0));
}

#[test]
fn catch_up_draws_every_due_frame_in_order() {
    let mut l = small_loop(Pacing::CatchUp);
    let mut seen = Vec::new();
    let drawn = l
        .tick(at(2.35), |idx, t, frame| {
            assert_eq!((frame.width, frame.height), (32, 24));
            seen.push((idx.0, t));
            Ok(())
        })
        .unwrap();
    assert_eq!(drawn, 4);
    assert_eq!(seen.iter().map(|s| s.0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    assert!((seen[3].1 - 0.3).abs() < 1e-12);
    assert_eq!(l.next_frame(), FrameIndex(4));
    assert_eq!(l.frames_drawn(), 4);
}

#[test]
fn latest_skips_to_the_newest_frame() {
    let mut l = small_loop(Pacing::Latest);
    let mut seen = Vec::new();
    l.tick(at(2.35), |idx, _, _| {
        seen.push(idx.0);
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, vec![3]);
    assert_eq!(l.frames_drawn(), 1);
}

#[test]
fn frame_is_due_exactly_at_its_deadline() {
    let mut l = small_loop(Pacing::CatchUp);
    l.tick(at(2.0), |_, _, _| Ok(())).unwrap();
    let due = l.next_frame_due();
    assert_eq!(l.tick(due, |_, _, _| Ok(())).unwrap(), 1);
    assert_eq!(l.tick(due, |_, _, _| Ok(())).unwrap(), 0);
}

#[test]
fn frames_match_the_pure_renderer() {
    let mut l = small_loop(Pacing::CatchUp);
    let mut frames = Vec::new();
    l.tick(at(2.2), |_, t, frame| {
        frames.push((t, frame.clone()));
        Ok(())
    })
    .unwrap();
    for (t, frame) in frames {
        assert_eq!(
            frame,
            crate::render::scene::render_frame(t, Canvas::new(32, 24).unwrap()).unwrap()
        );
    }
}

#[test]
fn cancel_is_idempotent_and_stops_drawing() {
    let mut l = small_loop(Pacing::CatchUp);
    assert!(l.cancel());
    assert!(!l.cancel());
    assert!(l.is_cancelled());
    assert_eq!(l.tick(at(5.0), |_, _, _| Ok(())).unwrap(), 0);
}

#[test]
fn present_errors_propagate() {
    let mut l = small_loop(Pacing::CatchUp);
    let err = l
        .tick(at(2.0), |_, _, _| Err(crate::foundation::error::SaxcatError::capture("sink full")))
        .unwrap_err();
    assert!(err.to_string().contains("sink full"));
}
