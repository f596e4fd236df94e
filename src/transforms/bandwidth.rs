//! Bandwidth limitation by down- and up-sampling

use crate::audio::{resample, AudioBuffer, ResampleMethod};
use crate::error::{SimulationError, Result};

/// Emulate a narrower effective bandwidth by passing through `target_rate`.
///
/// The result keeps the original rate and length.
pub fn bandwidth_limitation(buffer: &AudioBuffer, target_rate: u32, method: ResampleMethod) -> Result<AudioBuffer> {
    let rate = buffer.sample_rate();
    if target_rate == rate {
        return Ok(buffer.clone());
    }
    if target_rate > rate {
        return Err(SimulationError::audio(format!(
            "Bandwidth limitation target {} Hz exceeds the signal rate {} Hz",
            target_rate, rate
        )));
    }

    let narrowed = resample(buffer, target_rate, method)?;
    let mut restored = resample(&narrowed, rate, method)?;
    restored.fit_length(buffer.num_frames());
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, rate: u32, frames: usize) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| (2.0 * PI * freq * i as f64 / rate as f64).sin() as f32 * 0.5)
            .collect();
        AudioBuffer::from_mono(rate, samples).unwrap()
    }

    fn energy(buffer: &AudioBuffer, from: usize, to: usize) -> f64 {
        buffer.channel(0).iter().skip(from).take(to - from).map(|&x| (x as f64).powi(2)).sum()
    }

    #[test]
    fn test_same_rate_is_identity() {
        let audio = tone(1000.0, 16000, 1600);
        let out = bandwidth_limitation(&audio, 16000, ResampleMethod::KaiserBest).unwrap();
        assert_eq!(out, audio);
    }

    #[test]
    fn test_higher_target_rejected() {
        let audio = tone(1000.0, 8000, 800);
        assert!(bandwidth_limitation(&audio, 16000, ResampleMethod::KaiserBest).is_err());
    }

    #[test]
    fn test_removes_energy_above_new_nyquist() {
        let audio = tone(6000.0, 16000, 16000);
        let out = bandwidth_limitation(&audio, 8000, ResampleMethod::KaiserBest).unwrap();
        assert_eq!(out.num_frames(), audio.num_frames());
        assert_eq!(out.sample_rate(), 16000);

        let before = energy(&audio, 2000, 14000);
        let after = energy(&out, 2000, 14000);
        assert!(after < before * 0.01, "before {} after {}", before, after);
    }

    #[test]
    fn test_keeps_energy_below_new_nyquist() {
        let audio = tone(500.0, 16000, 16000);
        let out = bandwidth_limitation(&audio, 8000, ResampleMethod::KaiserFast).unwrap();
        let before = energy(&audio, 2000, 14000);
        let after = energy(&out, 2000, 14000);
        assert!((after / before - 1.0).abs() < 0.05);
    }
}
