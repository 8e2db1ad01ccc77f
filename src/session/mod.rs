//! Sessions: playback lifecycle, the render loop, capture and the [`studio::Studio`] owner.

/// Recording state: capture sessions, the recorder and two-phase finalization.
pub mod capture;
/// Audio session lifecycle.
pub mod playback;
/// Fixed-grid render loop.
pub mod render_loop;
/// The studio: single owner of every live handle.
pub mod studio;
