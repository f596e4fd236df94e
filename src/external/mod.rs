//! External signal-processing backends
//!
//! The traits these implement live next to the transforms that use them,
//! so tests can substitute in-process fakes.

pub mod ffmpeg;

pub use ffmpeg::{sidechain_filter, FfmpegBackend};
