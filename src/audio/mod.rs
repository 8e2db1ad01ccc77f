//! Audio: the melodic event scheduler and the block-based synthesis engine.

/// Signal synthesis engine (mix bus, voice registry, output taps).
pub mod engine;
/// Musical events and their scheduling.
pub mod events;
/// Synthesis nodes.
pub mod graph;
/// Local monitoring outputs.
pub mod monitor;
/// Audio blocks, live output streams and PCM spooling.
pub mod stream;
