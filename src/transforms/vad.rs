//! Non-silence detection used for power measurements

use ndarray::ArrayView1;
use crate::audio::AudioBuffer;

pub const DEFAULT_THRESHOLD: f64 = 0.01;
pub const DEFAULT_FRAME_LENGTH: usize = 1024;
pub const DEFAULT_FRAME_SHIFT: usize = 512;

/// Per-sample activity mask with the default framing.
pub fn detect_non_silence(signal: ArrayView1<f32>) -> Vec<bool> {
    detect_non_silence_with(signal, DEFAULT_THRESHOLD, DEFAULT_FRAME_LENGTH, DEFAULT_FRAME_SHIFT)
}

/// Marks frames whose power exceeds `threshold` times the mean frame power.
///
/// The signal is zero-padded so the last frame is complete; each frame marks
/// `frame_shift` samples and the tail repeats the last frame's decision.
/// Signals shorter than one frame, or with zero mean power, are fully active.
pub fn detect_non_silence_with(
    signal: ArrayView1<f32>,
    threshold: f64,
    frame_length: usize,
    frame_shift: usize,
) -> Vec<bool> {
    let n = signal.len();
    if n < frame_length || frame_shift == 0 {
        return vec![true; n];
    }

    let remainder = (n - frame_length) % frame_shift;
    let num_frames = (n - frame_length) / frame_shift + if remainder == 0 { 1 } else { 2 };

    let powers: Vec<f64> = (0..num_frames)
        .map(|f| {
            let start = f * frame_shift;
            let end = (start + frame_length).min(n);
            let energy: f64 = (start..end).map(|i| (signal[i] as f64).powi(2)).sum();
            energy / frame_length as f64
        })
        .collect();

    let mean_power = powers.iter().sum::<f64>() / num_frames as f64;
    if mean_power == 0.0 {
        return vec![true; n];
    }

    let mut mask = Vec::with_capacity(n);
    for power in &powers {
        let active = power / mean_power > threshold;
        let take = frame_shift.min(n - mask.len());
        mask.extend(std::iter::repeat_n(active, take));
        if mask.len() == n {
            break;
        }
    }
    let last = mask.last().copied().unwrap_or(true);
    mask.resize(n, last);
    mask
}

/// Mean power over the non-silent samples of every channel.
pub fn active_power(buffer: &AudioBuffer) -> f64 {
    let mut energy = 0.0f64;
    let mut count = 0usize;
    for ch in 0..buffer.channels() {
        let channel = buffer.channel(ch);
        for (&sample, active) in channel.iter().zip(detect_non_silence(channel)) {
            if active {
                energy += (sample as f64).powi(2);
                count += 1;
            }
        }
    }
    if count == 0 { 0.0 } else { energy / count as f64 }
}
