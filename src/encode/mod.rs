//! Encoding: the media sink contract, container selection and the ffmpeg backend.

/// Container/codec preference list and capability probing.
pub mod container;
/// System `ffmpeg` sink.
pub mod ffmpeg;
/// Sink contract, capture artifact and the digest sink.
pub mod sink;
