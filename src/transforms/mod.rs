//! Signal transforms applied by augmentation steps

pub mod bandwidth;
pub mod clipping;
pub mod codec;
pub mod filters;
pub mod loudness;
pub mod noise;
pub mod packet_loss;
pub mod reverb;
pub mod vad;
pub mod wind;

pub use bandwidth::bandwidth_limitation;
pub use clipping::clip_by_quantile;
pub use codec::{codec_compression, LossyCodec};
pub use filters::{nonflat_frequency_response, FreqResponse, PeakBand};
pub use loudness::{apply_loudness_transition, LoudnessGroup};
pub use noise::mix_noise;
pub use packet_loss::apply_packet_loss;
pub use reverb::{convolve_truncate, EarlyRirEstimator, PeakWindowEstimator};
pub use vad::detect_non_silence;
pub use wind::{wind_noise, SidechainCompressor, SidechainOutput, SidechainParams, WindNoiseParams};
