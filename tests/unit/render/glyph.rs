use super::*;
use kurbo::Shape as _;

#[test]
fn particles_cycle_through_three_glyphs() {
    assert_eq!(NoteGlyph::for_particle(0), NoteGlyph::Eighth);
    assert_eq!(NoteGlyph::for_particle(1), NoteGlyph::BeamedEighths);
    assert_eq!(NoteGlyph::for_particle(2), NoteGlyph::BeamedSixteenths);
    assert_eq!(NoteGlyph::for_particle(23), NoteGlyph::BeamedSixteenths);
}

#[test]
fn outlines_sit_above_the_baseline_at_em_size() {
    for glyph in [
        NoteGlyph::Eighth,
        NoteGlyph::BeamedEighths,
        NoteGlyph::BeamedSixteenths,
    ] {
        let bb = glyph.outline(18.0).bounding_box();
        assert!(bb.y1 <= 0.5, "{glyph:?} dips below baseline: {bb:?}");
        assert!(bb.y0 >= -18.0 * 1.2, "{glyph:?} too tall: {bb:?}");
        assert!(bb.x0 >= -0.5 && bb.x1 <= 18.0 * 1.4, "{glyph:?} too wide: {bb:?}");
        assert!(bb.area() > 18.0, "{glyph:?} degenerate: {bb:?}");
    }
}

#[test]
fn sixteenths_carry_an_extra_beam() {
    let eighths = NoteGlyph::BeamedEighths.outline(1.0);
    let sixteenths = NoteGlyph::BeamedSixteenths.outline(1.0);
    assert!(sixteenths.elements().len() > eighths.elements().len());
}
