//! Wind-noise mixing through a sidechain compressor.
//!
//! Wind noise is not simply added: the speech is ducked by the noise
//! envelope and the two are then mixed, which is what happens when a
//! microphone's automatic gain control reacts to wind bursts.

use rand::Rng;

use crate::audio::AudioBuffer;
use crate::error::{SimulationError, Result};
use super::noise::scaled_noise;

/// Peak both signals are brought to before they are handed to the compressor.
pub const WIND_HEADROOM: f32 = 0.9;

/// Parameters of a `wind_noise(...)` step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindNoiseParams {
    pub threshold: f64,
    pub ratio: f64,
    pub attack: f64,
    pub release: f64,
    pub sc_gain: f64,
    pub clipping: bool,
    pub clipping_threshold: f64,
}

impl WindNoiseParams {
    pub fn sidechain(&self) -> SidechainParams {
        SidechainParams {
            threshold: self.threshold,
            ratio: self.ratio,
            attack: self.attack,
            release: self.release,
            sc_gain: self.sc_gain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidechainParams {
    pub threshold: f64,
    pub ratio: f64,
    pub attack: f64,
    pub release: f64,
    pub sc_gain: f64,
}

/// What the compressor hands back: the mix, and the modulator as it was persisted.
#[derive(Debug, Clone)]
pub struct SidechainOutput {
    pub mix: AudioBuffer,
    pub modulator: AudioBuffer,
}

/// Compress `carrier` by the envelope of `modulator`, then mix the two.
pub trait SidechainCompressor: Send + Sync {
    fn compress_and_mix(
        &self,
        carrier: &AudioBuffer,
        modulator: &AudioBuffer,
        params: &SidechainParams,
        tag: &str,
    ) -> Result<SidechainOutput>;
}

/// Mix `noise` into `speech` at `snr_db` through `compressor`.
///
/// Returns `(mix, noise)` at the input scale and length.
pub fn wind_noise<R: Rng + ?Sized>(
    speech: &AudioBuffer,
    noise: &AudioBuffer,
    snr_db: f64,
    params: &WindNoiseParams,
    tag: &str,
    rng: &mut R,
    compressor: &dyn SidechainCompressor,
) -> Result<(AudioBuffer, AudioBuffer)> {
    let mut scaled = scaled_noise(speech, noise, snr_db, rng)?;
    let mut carrier = speech.clone();

    let peak = carrier.peak().max(scaled.peak());
    let gain = if peak > 0.0 { WIND_HEADROOM / peak } else { 1.0 };
    carrier.scale(gain);
    scaled.scale(gain);

    let SidechainOutput { mut mix, modulator: mut noise_out } =
        compressor.compress_and_mix(&carrier, &scaled, &params.sidechain(), tag)?;

    let frames = speech.num_frames();
    let channels = speech.channels();
    for (name, buffer) in [("wind mix", &mut mix), ("wind noise", &mut noise_out)] {
        if buffer.is_empty() {
            return Err(SimulationError::external(format!("Sidechain compressor returned an empty {}", name)));
        }
        if !buffer.is_finite() {
            return Err(SimulationError::external(format!("Sidechain {} contains non-finite samples", name)));
        }
        buffer.fit_length(frames);
        buffer.ensure_shape(channels, frames, name)?;
        buffer.scale(1.0 / gain);
    }

    if params.clipping {
        clip_to_extremes(&mut mix, params.clipping_threshold as f32);
    }
    Ok((mix, noise_out))
}

/// Clip to `threshold` times the signal's own extremes; the upper bound
/// is taken after the lower one has been applied.
fn clip_to_extremes(buffer: &mut AudioBuffer, threshold: f32) {
    let data = buffer.data_mut();
    let low = threshold * data.iter().copied().fold(f32::INFINITY, f32::min);
    data.mapv_inplace(|x| x.max(low));
    let high = threshold * data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    data.mapv_inplace(|x| x.min(high));
}
