//! Audio Module
//!
//! Provides the channel-major sample buffer, WAV reading/writing and
//! sample rate conversion.

pub mod buffer;
pub mod resample;
pub mod wav;

pub use buffer::AudioBuffer;
pub use resample::{resample, ResampleMethod};
pub use wav::{load_audio, read_wav, write_wav, AudioFormat};
