//! Reverberation by room impulse response convolution

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::audio::AudioBuffer;
use crate::error::{SimulationError, Result};

/// Derives the early-reflection part of a room impulse response.
///
/// The clean reference is convolved with this so it keeps the same
/// propagation delay as the fully reverberant signal.
pub trait EarlyRirEstimator: Send + Sync {
    fn early_rir(&self, rir: &AudioBuffer) -> Result<AudioBuffer>;
}

/// Keeps the response up to the direct-path peak plus a fixed window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakWindowEstimator {
    pub early_ms: f64,
}

impl Default for PeakWindowEstimator {
    fn default() -> Self {
        Self { early_ms: 50.0 }
    }
}

impl EarlyRirEstimator for PeakWindowEstimator {
    fn early_rir(&self, rir: &AudioBuffer) -> Result<AudioBuffer> {
        if rir.is_empty() {
            return Err(SimulationError::audio("Room impulse response is empty"));
        }

        // Earliest direct-path peak across channels.
        let direct = (0..rir.channels())
            .map(|ch| {
                rir.channel(ch)
                    .iter()
                    .enumerate()
                    .fold((0usize, f32::MIN), |best, (i, &x)| if x.abs() > best.1 { (i, x.abs()) } else { best })
                    .0
            })
            .min()
            .unwrap_or(0);

        let window = (self.early_ms * rir.sample_rate() as f64 / 1000.0).round() as usize;
        let stop = direct.saturating_add(window).min(rir.num_frames());

        let mut early = rir.clone();
        for ch in 0..early.channels() {
            for sample in early.channel_mut(ch).iter_mut().skip(stop) {
                *sample = 0.0;
            }
        }
        Ok(early)
    }
}

/// Full linear convolution of `signal` with `rir`, truncated to the signal length.
///
/// Mono inputs broadcast against multi-channel ones.
pub fn convolve_truncate(signal: &AudioBuffer, rir: &AudioBuffer) -> Result<AudioBuffer> {
    if signal.sample_rate() != rir.sample_rate() {
        return Err(SimulationError::audio(format!(
            "Signal at {} Hz cannot be convolved with a RIR at {} Hz",
            signal.sample_rate(), rir.sample_rate()
        )));
    }
    let channels = match (signal.channels(), rir.channels()) {
        (a, b) if a == b => a,
        (1, b) => b,
        (a, 1) => a,
        (a, b) => {
            return Err(SimulationError::audio(format!(
                "Cannot convolve {}-channel signal with {}-channel RIR", a, b
            )));
        }
    };

    let frames = signal.num_frames();
    let mut planner = FftPlanner::<f64>::new();
    let mut out = Array2::zeros((channels, frames));
    for ch in 0..channels {
        let x: Vec<f64> = signal.channel(ch.min(signal.channels() - 1)).iter().map(|&v| v as f64).collect();
        let h: Vec<f64> = rir.channel(ch.min(rir.channels() - 1)).iter().map(|&v| v as f64).collect();
        let y = fft_convolve(&mut planner, &x, &h, frames);
        for (dst, src) in out.row_mut(ch).iter_mut().zip(y) {
            *dst = src as f32;
        }
    }
    AudioBuffer::new(signal.sample_rate(), out)
}

/// First `keep` samples of the full convolution `x * h`.
fn fft_convolve(planner: &mut FftPlanner<f64>, x: &[f64], h: &[f64], keep: usize) -> Vec<f64> {
    if x.is_empty() || h.is_empty() {
        return vec![0.0; keep];
    }
    let full = x.len() + h.len() - 1;
    let n = full.next_power_of_two();

    let mut xs: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    xs.resize(n, Complex::new(0.0, 0.0));
    let mut hs: Vec<Complex<f64>> = h.iter().map(|&v| Complex::new(v, 0.0)).collect();
    hs.resize(n, Complex::new(0.0, 0.0));

    let forward = planner.plan_fft_forward(n);
    forward.process(&mut xs);
    forward.process(&mut hs);

    for (a, b) in xs.iter_mut().zip(hs.iter()) {
        *a *= *b;
    }

    let inverse = planner.plan_fft_inverse(n);
    inverse.process(&mut xs);

    let norm = 1.0 / n as f64;
    let mut y: Vec<f64> = xs.iter().take(keep.min(full)).map(|c| c.re * norm).collect();
    y.resize(keep, 0.0);
    y
}
