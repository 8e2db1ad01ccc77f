//! Deterministic frame rendering.
//!
//! A frame is a pure function of `(t, canvas)`; see [`scene::render_frame`].

pub(crate) mod cpu;
pub(crate) mod figure;
/// Rendered frame buffers.
pub mod frame;
/// Vector music-note glyphs.
pub mod glyph;
/// Frame composition and the [`scene::FrameRenderer`].
pub mod scene;
/// Preview surface and PNG export.
pub mod surface;
