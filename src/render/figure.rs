//! The cat, its saxophone, limbs and the stage-light glint.
//!
//! Geometry is authored in figure space: origin at the body centre, units of a 480 px reference
//! canvas. [`figure_transform`] places the figure on the canvas, including the idle bob, so every
//! part follows the bob and the scale together.

use kurbo::{Affine, BezPath, Circle, Ellipse, Rect, Shape as _};

use crate::foundation::core::{Canvas, Rgba8};
use crate::render::scene::DrawOp;

const TOLERANCE: f64 = 0.1;

const FUR: Rgba8 = Rgba8::hex(0xe5e7eb);
const INK: Rgba8 = Rgba8::hex(0x111827);
const AMBER: Rgba8 = Rgba8::hex(0xf59e0b);
const BRASS_EDGE: Rgba8 = Rgba8::hex(0xb45309);
const BRASS_KEY: Rgba8 = Rgba8::hex(0xfde68a);
const WHISKER: Rgba8 = Rgba8::hex(0x94a3b8);

const OUTLINE_WIDTH: f64 = 4.0;
const WHISKER_WIDTH: f64 = 2.0;

/// Canvas size the figure geometry is authored for.
pub(crate) const REFERENCE_SIZE: f64 = 480.0;

/// Figure-to-canvas transform at time `t`.
pub(crate) fn figure_transform(t: f64, canvas: Canvas) -> Affine {
    let (w, h) = (canvas.w(), canvas.h());
    let scale = w.min(h) / REFERENCE_SIZE;
    let bob = (t * 2.5).sin() * 4.0 * scale;
    Affine::translate((w * 0.45, h * 0.62 + bob)) * Affine::scale(scale)
}

/// Body, head, ears, face and whiskers.
pub(crate) fn push_cat(ops: &mut Vec<DrawOp>, t: f64, figure: Affine) {
    let body = Ellipse::new((0.0, 0.0), (80.0, 60.0), 0.0).to_path(TOLERANCE);
    fill_and_outline(ops, body, figure, FUR, INK, OUTLINE_WIDTH);

    let head = figure * Affine::translate((-10.0, -80.0)) * Affine::rotate((t * 2.0).sin() * 0.05);
    let skull = Circle::new((0.0, 0.0), 46.0).to_path(TOLERANCE);
    fill_and_outline(ops, skull, head, FUR, INK, OUTLINE_WIDTH);
    for side in [-1.0, 1.0] {
        let ear = triangle((35.0 * side, -30.0), (60.0 * side, -70.0), (10.0 * side, -40.0));
        fill_and_outline(ops, ear, head, FUR, INK, OUTLINE_WIDTH);
    }

    for (cx, cy, color) in [(-12.0, -6.0, INK), (12.0, -6.0, INK), (0.0, 8.0, AMBER)] {
        ops.push(DrawOp::Fill {
            path: Circle::new((cx, cy), 6.0).to_path(TOLERANCE),
            transform: head,
            color,
        });
    }

    for side in [-1.0, 1.0] {
        for (y0, y1) in [(12.0, 4.0), (16.0, 16.0), (20.0, 28.0)] {
            let mut whisker = BezPath::new();
            whisker.move_to((10.0 * side, y0));
            whisker.line_to((40.0 * side, y1));
            ops.push(DrawOp::Stroke {
                path: whisker,
                transform: head,
                color: WHISKER,
                width: WHISKER_WIDTH,
            });
        }
    }
}

/// Saxophone body and its four jittering keys.
pub(crate) fn push_saxophone(ops: &mut Vec<DrawOp>, t: f64, figure: Affine) {
    let sax = figure
        * Affine::translate((30.0, -10.0))
        * Affine::rotate(-0.2 + (t * 3.0).sin() * 0.04);

    let mut horn = BezPath::new();
    horn.move_to((-10.0, -20.0));
    horn.quad_to((50.0, -50.0), (70.0, 0.0));
    horn.line_to((80.0, 20.0));
    horn.quad_to((60.0, 35.0), (40.0, 25.0));
    horn.line_to((30.0, 10.0));
    horn.close_path();
    fill_and_outline(ops, horn, sax, AMBER, BRASS_EDGE, OUTLINE_WIDTH);

    for i in 0..4 {
        let fi = f64::from(i);
        let center = (20.0 + fi * 14.0, 2.0 + (t * 10.0 + fi).sin() * 1.5);
        ops.push(DrawOp::Fill {
            path: Circle::new(center, 4.0).to_path(TOLERANCE),
            transform: sax,
            color: BRASS_KEY,
        });
    }
}

/// Arms and tail as open quadratic strokes.
pub(crate) fn push_limbs(ops: &mut Vec<DrawOp>, t: f64, figure: Affine) {
    let paw = (t * 6.0).sin() * 10.0;
    let curves = [
        ((-20.0, -20.0), (10.0, 10.0), (26.0, -6.0)),
        ((-15.0, -10.0), (10.0, 20.0 + paw), (34.0, -2.0 + paw)),
        ((-60.0, 20.0), (-100.0, -10.0), (-60.0, -20.0)),
    ];
    for (from, ctrl, to) in curves {
        let mut limb = BezPath::new();
        limb.move_to(from);
        limb.quad_to(ctrl, to);
        ops.push(DrawOp::Stroke {
            path: limb,
            transform: figure,
            color: INK,
            width: OUTLINE_WIDTH,
        });
    }
}

/// Pulsing white highlight across the saxophone.
pub(crate) fn push_glint(ops: &mut Vec<DrawOp>, t: f64, figure: Affine) {
    let opacity = 0.18 + 0.12 * (t * 8.0).sin();
    ops.push(DrawOp::Fill {
        path: Rect::new(-30.0, -2.0, 30.0, 2.0).to_path(TOLERANCE),
        transform: figure * Affine::translate((60.0, -20.0)) * Affine::rotate(0.4),
        color: Rgba8::WHITE.with_opacity(opacity),
    });
}

fn triangle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(a);
    path.line_to(b);
    path.line_to(c);
    path.close_path();
    path
}

fn fill_and_outline(
    ops: &mut Vec<DrawOp>,
    path: BezPath,
    transform: Affine,
    fill: Rgba8,
    outline: Rgba8,
    width: f64,
) {
    ops.push(DrawOp::Fill {
        path: path.clone(),
        transform,
        color: fill,
    });
    ops.push(DrawOp::Stroke {
        path,
        transform,
        color: outline,
        width,
    });
}

#[cfg(test)]
#[path = "../../tests/unit/render/figure.rs"]
mod tests;
