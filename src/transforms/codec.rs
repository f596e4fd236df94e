//! Lossy codec round trips

use crate::audio::{resample, AudioBuffer, ResampleMethod};
use crate::error::{SimulationError, Result};
use super::noise::match_channels;

/// Encode-then-decode through a lossy codec.
///
/// `tag` identifies the sample for scratch files and log lines.
pub trait LossyCodec: Send + Sync {
    fn round_trip(&self, audio: &AudioBuffer, vbr_quality: f64, tag: &str) -> Result<AudioBuffer>;
}

pub const MIN_VBR_QUALITY: f64 = 0.0;
pub const MAX_VBR_QUALITY: f64 = 10.0;

/// Pass `audio` through `codec`, restoring the input rate, layout and length.
pub fn codec_compression(
    audio: &AudioBuffer,
    vbr_quality: f64,
    codec: &dyn LossyCodec,
    tag: &str,
) -> Result<AudioBuffer> {
    if !(MIN_VBR_QUALITY..=MAX_VBR_QUALITY).contains(&vbr_quality) {
        return Err(SimulationError::audio(format!(
            "VBR quality {} outside [{}, {}]",
            vbr_quality, MIN_VBR_QUALITY, MAX_VBR_QUALITY
        )));
    }

    let mut decoded = codec.round_trip(audio, vbr_quality, tag)?;
    if decoded.sample_rate() != audio.sample_rate() {
        decoded = resample(&decoded, audio.sample_rate(), ResampleMethod::KaiserBest)?;
    }
    if decoded.channels() != audio.channels() {
        if decoded.channels() == 1 || audio.channels() == 1 {
            decoded = match_channels(decoded.first_channel(), audio.channels())?;
        } else {
            return Err(SimulationError::external(format!(
                "Codec returned {} channels for {}-channel input",
                decoded.channels(), audio.channels()
            )));
        }
    }
    decoded.fit_length(audio.num_frames());
    decoded.ensure_shape(audio.channels(), audio.num_frames(), "codec")?;

    if !decoded.is_finite() {
        return Err(SimulationError::external("Codec output contains non-finite samples"));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Halves the signal and appends encoder padding.
    struct PaddingCodec;

    impl LossyCodec for PaddingCodec {
        fn round_trip(&self, audio: &AudioBuffer, _vbr_quality: f64, _tag: &str) -> Result<AudioBuffer> {
            let mut out = audio.clone();
            out.scale(0.5);
            out.fit_length(audio.num_frames() + 1152);
            Ok(out)
        }
    }

    struct RateChangingCodec;

    impl LossyCodec for RateChangingCodec {
        fn round_trip(&self, audio: &AudioBuffer, _vbr_quality: f64, _tag: &str) -> Result<AudioBuffer> {
            resample(audio, audio.sample_rate() / 2, ResampleMethod::Linear)
        }
    }

    struct BrokenCodec;

    impl LossyCodec for BrokenCodec {
        fn round_trip(&self, audio: &AudioBuffer, _vbr_quality: f64, _tag: &str) -> Result<AudioBuffer> {
            let mut out = audio.clone();
            out.channel_mut(0)[0] = f32::NAN;
            Ok(out)
        }
    }

    fn speech() -> AudioBuffer {
        AudioBuffer::from_mono(16000, (0..1600).map(|i| (i as f32 * 0.05).sin() * 0.3).collect()).unwrap()
    }

    #[test]
    fn test_output_fitted_to_input() {
        let audio = speech();
        let out = codec_compression(&audio, 4.0, &PaddingCodec, "utt_1").unwrap();
        assert_eq!(out.num_frames(), audio.num_frames());
        assert!((out.channel(0)[10] - audio.channel(0)[10] * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rate_restored() {
        let audio = speech();
        let out = codec_compression(&audio, 2.0, &RateChangingCodec, "utt_1").unwrap();
        assert_eq!(out.sample_rate(), 16000);
        assert_eq!(out.num_frames(), audio.num_frames());
    }

    #[test]
    fn test_quality_range_enforced() {
        let audio = speech();
        assert!(codec_compression(&audio, -0.5, &PaddingCodec, "utt_1").is_err());
        assert!(codec_compression(&audio, 10.5, &PaddingCodec, "utt_1").is_err());
        assert!(codec_compression(&audio, 10.0, &PaddingCodec, "utt_1").is_ok());
    }

    #[test]
    fn test_non_finite_output_rejected() {
        let err = codec_compression(&speech(), 5.0, &BrokenCodec, "utt_1").unwrap_err();
        assert_eq!(err.kind(), "external_process");
    }
}
