//! Quantile-based clipping

use crate::audio::AudioBuffer;
use crate::error::{SimulationError, Result};

/// Linear-interpolated quantile of `values` (`q` in [0, 1]).
pub fn quantile(values: &[f32], q: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

fn quantile_sorted(sorted: &[f32], q: f64) -> f32 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = (pos - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Clip each channel to its own `[quantile(min_q), quantile(max_q)]` range.
pub fn clip_by_quantile(buffer: &mut AudioBuffer, min_quantile: f64, max_quantile: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&min_quantile) || !(0.0..=1.0).contains(&max_quantile) || min_quantile > max_quantile {
        return Err(SimulationError::audio(format!(
            "Clipping quantiles must satisfy 0 <= min <= max <= 1, got min={} max={}",
            min_quantile, max_quantile
        )));
    }
    if buffer.is_empty() {
        return Ok(());
    }

    for ch in 0..buffer.channels() {
        let mut sorted = buffer.channel(ch).to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let low = quantile_sorted(&sorted, min_quantile);
        let high = quantile_sorted(&sorted, max_quantile);
        buffer.channel_mut(ch).mapv_inplace(|x| x.clamp(low, high));
    }
    Ok(())
}
