//! Music-note glyphs drawn as filled vector outlines.
//!
//! Outlines are authored in em units with the origin on the left end of the baseline and y
//! pointing down, like a text run placed with an alphabetic baseline.

use kurbo::{Affine, BezPath, Ellipse, Point, Rect, Shape as _, Vec2};

const TOLERANCE_EM: f64 = 0.005;
const HEAD_RADII: Vec2 = Vec2::new(0.26, 0.18);
const HEAD_TILT: f64 = -0.35;
const STEM_WIDTH: f64 = 0.07;
const BEAM_THICKNESS: f64 = 0.14;

/// Note shapes used by the ambient particles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoteGlyph {
    /// A single flagged eighth note.
    Eighth,
    /// Two eighth notes joined by one beam.
    BeamedEighths,
    /// Two sixteenth notes joined by two beams.
    BeamedSixteenths,
}

impl NoteGlyph {
    /// Glyph cycle used by particle `index`.
    pub fn for_particle(index: usize) -> Self {
        match index % 3 {
            0 => Self::Eighth,
            1 => Self::BeamedEighths,
            _ => Self::BeamedSixteenths,
        }
    }

    /// Outline at `size_px` (the em size), baseline-left at the origin.
    pub fn outline(self, size_px: f64) -> BezPath {
        let mut path = BezPath::new();
        match self {
            Self::Eighth => {
                push_note(&mut path, Point::new(0.28, -0.18), -0.95);
                push_flag(&mut path, Point::new(0.48 + STEM_WIDTH, -0.95));
            }
            Self::BeamedEighths => {
                push_beamed_pair(&mut path, 1);
            }
            Self::BeamedSixteenths => {
                push_beamed_pair(&mut path, 2);
            }
        }
        Affine::scale(size_px) * path
    }
}

/// Notehead plus a stem rising from its right edge up to `stem_top`.
fn push_note(path: &mut BezPath, head: Point, stem_top: f64) {
    path.extend(Ellipse::new(head, HEAD_RADII, HEAD_TILT).path_elements(TOLERANCE_EM));
    let x0 = head.x + 0.2;
    let stem = Rect::new(x0, stem_top, x0 + STEM_WIDTH, head.y - 0.02);
    path.extend(stem.path_elements(TOLERANCE_EM));
}

fn push_flag(path: &mut BezPath, top: Point) {
    path.move_to(top);
    path.curve_to(
        (top.x + 0.07, top.y + 0.2),
        (top.x + 0.33, top.y + 0.25),
        (top.x + 0.25, top.y + 0.55),
    );
    path.curve_to(
        (top.x + 0.23, top.y + 0.4),
        (top.x + 0.13, top.y + 0.27),
        (top.x, top.y + 0.25),
    );
    path.close_path();
}

fn push_beamed_pair(path: &mut BezPath, beams: usize) {
    let left = Point::new(0.28, -0.18);
    let right = Point::new(0.98, -0.30);
    let (y0, y1) = (-0.95, -0.95 - (right.y - left.y).abs());
    push_note(path, left, y0);
    push_note(path, right, y1);

    let x0 = left.x + 0.2;
    let x1 = right.x + 0.2 + STEM_WIDTH;
    for k in 0..beams {
        let dy = k as f64 * (BEAM_THICKNESS + 0.08);
        path.move_to((x0, y0 + dy));
        path.line_to((x1, y1 + dy));
        path.line_to((x1, y1 + dy + BEAM_THICKNESS));
        path.line_to((x0, y0 + dy + BEAM_THICKNESS));
        path.close_path();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/glyph.rs"]
mod tests;
