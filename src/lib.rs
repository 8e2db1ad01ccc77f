//! saxcat procedurally animates a saxophone-playing cat, synthesizes its melody and captures
//! both into one video artifact.
//!
//! The public API is studio-oriented:
//!
//! - Build a [`StudioConfig`] (defaults: 8 s, 96 bpm, 800x600, 60 fps)
//! - Create a [`Studio`] on a [`Clock`]
//! - Preview live, or [`Studio::record`] into a [`MediaSink`] to get a [`CaptureArtifact`]
//!
//! Frames are a pure function of time: [`render_frame`] can be called for any `t` in any order.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Melody scheduling and block-based synthesis.
pub mod audio;
/// Studio configuration.
pub mod config;
/// Media sinks and container selection.
pub mod encode;
/// Deterministic frame rendering.
pub mod render;
/// Playback, render loop, capture and the studio.
pub mod session;

pub use crate::foundation::clock::{Clock, ManualClock, SessionOrigin, SystemClock};
pub use crate::foundation::core::{
    Affine, BezPath, Canvas, Fps, FrameIndex, Point, Rect, Rgba8, Vec2,
};
pub use crate::foundation::error::{SaxcatError, SaxcatResult};
pub use crate::foundation::math::digest_bytes;

pub use crate::audio::engine::{AudioCapability, SynthEngine, VoiceHandle};
pub use crate::audio::events::{MusicalEvent, build_event_sequence};
pub use crate::config::{CaptureTail, StudioConfig};
pub use crate::encode::container::{CodecProbe, FfmpegProbe, select_container};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{CaptureArtifact, DigestSink, MediaSink, SinkConfig};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::scene::{FrameRenderer, render_frame};
pub use crate::session::studio::{CaptureState, StopHandle, Studio, StudioStatus};
