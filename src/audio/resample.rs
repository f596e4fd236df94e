//! Sample rate conversion
//!
//! Band-limited windowed-sinc interpolation with a Kaiser window (two quality
//! presets) and plain linear interpolation.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1};
use crate::audio::AudioBuffer;
use crate::error::{SimulationError, Result};

/// Table entries per zero crossing of the interpolation kernel.
const OVERSAMPLE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMethod {
    KaiserBest,
    KaiserFast,
    Linear,
}

impl ResampleMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ResampleMethod::KaiserBest => "kaiser_best",
            ResampleMethod::KaiserFast => "kaiser_fast",
            ResampleMethod::Linear => "linear",
        }
    }

    fn kernel(&self) -> Option<KaiserKernel> {
        match self {
            ResampleMethod::KaiserBest => Some(KaiserKernel {
                zeros: 64,
                rolloff: 0.947_593_716_739_959_6,
                beta: 14.769_656_459_379_492,
            }),
            ResampleMethod::KaiserFast => Some(KaiserKernel {
                zeros: 16,
                rolloff: 0.85,
                beta: 8.555_504_641_634_386,
            }),
            ResampleMethod::Linear => None,
        }
    }
}

impl FromStr for ResampleMethod {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kaiser_best" | "soxr_vhq" | "soxr_hq" | "sinc_best" => Ok(ResampleMethod::KaiserBest),
            "kaiser_fast" | "soxr_mq" | "soxr_lq" | "sinc_medium" | "sinc_fastest" | "polyphase" => {
                Ok(ResampleMethod::KaiserFast)
            }
            "linear" => Ok(ResampleMethod::Linear),
            other => Err(SimulationError::audio(format!("Unknown resampling method: {}", other))),
        }
    }
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
struct KaiserKernel {
    zeros: usize,
    rolloff: f64,
    beta: f64,
}

impl KaiserKernel {
    /// Right half of the windowed sinc, sampled `OVERSAMPLE` times per zero crossing.
    fn table(&self) -> Vec<f64> {
        let n = self.zeros * OVERSAMPLE;
        let norm = bessel_i0(self.beta);
        (0..=n)
            .map(|i| {
                let x = i as f64 / OVERSAMPLE as f64;
                let u = i as f64 / n as f64;
                let window = bessel_i0(self.beta * (1.0 - u * u).max(0.0).sqrt()) / norm;
                self.rolloff * sinc(self.rolloff * x) * window
            })
            .collect()
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Zeroth-order modified Bessel function of the first kind.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    loop {
        term *= (half / k) * (half / k);
        sum += term;
        if term < sum * 1e-16 {
            break;
        }
        k += 1.0;
    }
    sum
}

fn table_lookup(table: &[f64], distance: f64) -> f64 {
    let pos = distance * OVERSAMPLE as f64;
    let idx = pos.floor() as usize;
    if idx + 1 >= table.len() {
        return 0.0;
    }
    let frac = pos - idx as f64;
    table[idx] + (table[idx + 1] - table[idx]) * frac
}

/// Resample every channel of `buffer` to `target_sample_rate`.
///
/// Output length is `ceil(frames * target / source)`.
pub fn resample(buffer: &AudioBuffer, target_sample_rate: u32, method: ResampleMethod) -> Result<AudioBuffer> {
    if target_sample_rate == 0 {
        return Err(SimulationError::audio("Target sample rate cannot be 0"));
    }
    if buffer.sample_rate() == target_sample_rate {
        return Ok(buffer.clone());
    }

    let ratio = target_sample_rate as f64 / buffer.sample_rate() as f64;
    let new_length = (buffer.num_frames() as f64 * ratio).ceil() as usize;
    let table = method.kernel().map(|k| (k, k.table()));

    let mut out = Array2::zeros((buffer.channels(), new_length));
    for ch in 0..buffer.channels() {
        let resampled = match &table {
            Some((kernel, table)) => resample_sinc(buffer.channel(ch), new_length, ratio, kernel, table),
            None => resample_linear(buffer.channel(ch), new_length, ratio),
        };
        for (dst, src) in out.row_mut(ch).iter_mut().zip(resampled) {
            *dst = src;
        }
    }

    AudioBuffer::new(target_sample_rate, out)
}

fn resample_sinc(
    data: ArrayView1<f32>,
    new_length: usize,
    ratio: f64,
    kernel: &KaiserKernel,
    table: &[f64],
) -> Vec<f32> {
    let old_length = data.len();
    if old_length == 0 {
        return vec![0.0; new_length];
    }

    // Below unity ratio the kernel is stretched so its cutoff tracks the new Nyquist.
    let scale = ratio.min(1.0);
    let half_width = kernel.zeros as f64 / scale;

    (0..new_length)
        .map(|i| {
            let t = i as f64 / ratio;
            let lo = (t - half_width).ceil().max(0.0) as usize;
            let hi = ((t + half_width).floor() as usize).min(old_length - 1);
            let mut acc = 0.0f64;
            for k in lo..=hi {
                let w = table_lookup(table, (t - k as f64).abs() * scale);
                acc += data[k] as f64 * w;
            }
            (acc * scale) as f32
        })
        .collect()
}

fn resample_linear(data: ArrayView1<f32>, new_length: usize, ratio: f64) -> Vec<f32> {
    let old_length = data.len();
    if old_length == 0 {
        return vec![0.0; new_length];
    }

    let mut new_data = vec![0.0f32; new_length];
    for (i, slot) in new_data.iter_mut().enumerate() {
        let old_pos = i as f64 / ratio;
        let old_index = old_pos.floor() as usize;
        let fraction = old_pos - old_index as f64;

        *slot = if old_index >= old_length - 1 {
            data[old_length - 1]
        } else {
            data[old_index] + (data[old_index + 1] - data[old_index]) * fraction as f32
        };
    }
    new_data
}
