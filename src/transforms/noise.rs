//! Additive noise mixing at a target SNR

use ndarray::Array2;
use rand::Rng;

use crate::audio::AudioBuffer;
use crate::error::{SimulationError, Result};
use super::vad::active_power;

/// Floor applied to the measured noise power before taking its root.
pub const NOISE_POWER_FLOOR: f64 = 1e-10;

/// Bring `noise` to `target_frames`.
///
/// Shorter noise is wrap-padded so that its first sample lands at a random
/// offset in `[0, target - len)`; longer noise is cropped to a random window
/// starting in `[0, len - target)`. Equal lengths consume no randomness.
pub fn align_noise<R: Rng + ?Sized>(noise: &AudioBuffer, target_frames: usize, rng: &mut R) -> Result<AudioBuffer> {
    let len = noise.num_frames();
    if len == 0 {
        return Err(SimulationError::audio("Noise source is empty"));
    }
    if len == target_frames {
        return Ok(noise.clone());
    }

    let mut aligned = Array2::zeros((noise.channels(), target_frames));
    if len < target_frames {
        let offset = rng.gen_range(0..target_frames - len);
        for ch in 0..noise.channels() {
            let src = noise.channel(ch);
            for (i, dst) in aligned.row_mut(ch).iter_mut().enumerate() {
                let idx = (i as isize - offset as isize).rem_euclid(len as isize) as usize;
                *dst = src[idx];
            }
        }
    } else {
        let offset = rng.gen_range(0..len - target_frames);
        for ch in 0..noise.channels() {
            let src = noise.channel(ch);
            for (i, dst) in aligned.row_mut(ch).iter_mut().enumerate() {
                *dst = src[offset + i];
            }
        }
    }
    AudioBuffer::new(noise.sample_rate(), aligned)
}

/// Broadcast mono noise over `channels`; other layouts must already match.
pub fn match_channels(noise: AudioBuffer, channels: usize) -> Result<AudioBuffer> {
    if noise.channels() == channels {
        return Ok(noise);
    }
    if noise.channels() != 1 {
        return Err(SimulationError::audio(format!(
            "Cannot mix {}-channel noise into {}-channel speech",
            noise.channels(), channels
        )));
    }
    let mono = noise.channel(0);
    let mut data = Array2::zeros((channels, noise.num_frames()));
    for mut row in data.rows_mut() {
        row.assign(&mono);
    }
    AudioBuffer::new(noise.sample_rate(), data)
}

/// Gain that puts `noise` at `snr_db` below `speech`, both measured over their active regions.
pub fn snr_scale(speech: &AudioBuffer, noise: &AudioBuffer, snr_db: f64) -> f64 {
    let speech_power = active_power(speech);
    let noise_power = active_power(noise).max(NOISE_POWER_FLOOR);
    10f64.powf(-snr_db / 20.0) * (speech_power / noise_power).sqrt()
}

/// Align and scale `noise` to `speech`, returning `(speech + noise, scaled noise)`.
pub fn mix_noise<R: Rng + ?Sized>(
    speech: &AudioBuffer,
    noise: &AudioBuffer,
    snr_db: f64,
    rng: &mut R,
) -> Result<(AudioBuffer, AudioBuffer)> {
    let scaled = scaled_noise(speech, noise, snr_db, rng)?;
    let mixed = speech.data() + scaled.data();
    Ok((AudioBuffer::new(speech.sample_rate(), mixed)?, scaled))
}

/// Shared first half of additive and wind-noise mixing.
pub(crate) fn scaled_noise<R: Rng + ?Sized>(
    speech: &AudioBuffer,
    noise: &AudioBuffer,
    snr_db: f64,
    rng: &mut R,
) -> Result<AudioBuffer> {
    if speech.sample_rate() != noise.sample_rate() {
        return Err(SimulationError::audio(format!(
            "Speech at {} Hz cannot be mixed with noise at {} Hz",
            speech.sample_rate(), noise.sample_rate()
        )));
    }
    let aligned = align_noise(noise, speech.num_frames(), rng)?;
    let mut aligned = match_channels(aligned, speech.channels())?;
    let scale = snr_scale(speech, &aligned, snr_db);
    aligned.scale(scale as f32);
    Ok(aligned)
}
