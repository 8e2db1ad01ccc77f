use super::*;

#[test]
fn figure_is_anchored_and_scaled_by_canvas() {
    let canvas = Canvas::new(800, 600).unwrap();
    let m = figure_transform(0.0, canvas);
    let origin = m * kurbo::Point::ORIGIN;
    assert!((origin.x - 360.0).abs() < 1e-9);
    assert!((origin.y - 372.0).abs() < 1e-9);
    let unit = m * kurbo::Point::new(1.0, 0.0);
    assert!((unit.x - origin.x - 600.0 / REFERENCE_SIZE).abs() < 1e-9);
}

#[test]
fn bob_moves_the_whole_figure_vertically() {
    let canvas = Canvas::new(480, 480).unwrap();
    let t = std::f64::consts::FRAC_PI_2 / 2.5;
    let at_rest = figure_transform(0.0, canvas) * kurbo::Point::ORIGIN;
    let peak = figure_transform(t, canvas) * kurbo::Point::ORIGIN;
    assert!((peak.y - at_rest.y - 4.0).abs() < 1e-9);
    assert!((peak.x - at_rest.x).abs() < 1e-9);
}

#[test]
fn limbs_and_glint_share_the_figure_transform() {
    let canvas = Canvas::new(800, 600).unwrap();
    let fig = figure_transform(1.0, canvas);
    let mut ops = Vec::new();
    push_limbs(&mut ops, 1.0, fig);
    push_glint(&mut ops, 1.0, fig);
    assert_eq!(ops.len(), 4);
    for op in &ops[..3] {
        let DrawOp::Stroke { transform, width, .. } = op else {
            panic!("limbs are strokes");
        };
        assert_eq!(*transform, fig);
        assert_eq!(*width, OUTLINE_WIDTH);
    }
    let DrawOp::Fill { transform, .. } = &ops[3] else {
        panic!("glint is a fill");
    };
    let anchor = *transform * kurbo::Point::ORIGIN;
    let expected = fig * kurbo::Point::new(60.0, -20.0);
    assert!((anchor - expected).hypot() < 1e-9);
}

#[test]
fn glint_opacity_pulses() {
    let mut ops = Vec::new();
    let t = std::f64::consts::FRAC_PI_2 / 8.0;
    push_glint(&mut ops, t, Affine::IDENTITY);
    let DrawOp::Fill { color, .. } = &ops[0] else {
        panic!("glint is a fill");
    };
    assert!(color.a.abs_diff(77) <= 1, "alpha {}", color.a);
}

#[test]
fn right_paw_swings_left_arm_does_not() {
    let endpoints = |t: f64| {
        let mut ops = Vec::new();
        push_limbs(&mut ops, t, Affine::IDENTITY);
        ops.iter()
            .map(|op| match op {
                DrawOp::Stroke { path, .. } => path.elements().last().cloned(),
                DrawOp::Fill { .. } => None,
            })
            .collect::<Vec<_>>()
    };
    let a = endpoints(0.0);
    let b = endpoints(0.3);
    assert_eq!(a[0], b[0]);
    assert_ne!(a[1], b[1]);
    assert_eq!(a[2], b[2]);
}
