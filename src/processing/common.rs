//! Helpers shared by the sample simulator and the dispatcher

use crate::audio::AudioBuffer;

/// Scale every buffer by one factor so the loudest peak lands on `headroom`.
///
/// Returns the factor applied; all-silent inputs are left untouched and
/// report `1.0`.
pub fn normalize_jointly(buffers: &mut [&mut AudioBuffer], headroom: f32) -> f32 {
    let peak = buffers.iter().map(|b| b.peak()).fold(0.0f32, f32::max);
    if peak <= 0.0 || !peak.is_finite() {
        return 1.0;
    }
    let gain = headroom / peak;
    for buffer in buffers.iter_mut() {
        buffer.scale(gain);
    }
    gain
}

/// Progress is logged every `len / 10` samples, at least every sample.
pub fn progress_step(total: usize) -> usize {
    (total / 10).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_scale() {
        let mut a = AudioBuffer::from_mono(16000, vec![0.5, -2.0, 1.0]).unwrap();
        let mut b = AudioBuffer::from_mono(16000, vec![0.1, 0.2]).unwrap();
        let gain = normalize_jointly(&mut [&mut a, &mut b], 0.9);

        assert!((gain - 0.45).abs() < 1e-6);
        assert!((a.peak() - 0.9).abs() < 1e-6);
        assert!((b.channel(0)[1] - 0.09).abs() < 1e-6);
    }

    #[test]
    fn test_silence_untouched() {
        let mut a = AudioBuffer::silent(16000, 1, 4).unwrap();
        assert_eq!(normalize_jointly(&mut [&mut a], 0.9), 1.0);
        assert_eq!(a.peak(), 0.0);
    }

    #[test]
    fn test_progress_step() {
        assert_eq!(progress_step(5), 1);
        assert_eq!(progress_step(1000), 100);
    }
}
