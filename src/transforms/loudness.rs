//! Loudness transitions driven by keyframed gain ramps

use crate::audio::AudioBuffer;

/// One ramp group: 0 dB at `start`, `gain_db` at `peak`, back to 0 dB at `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessGroup {
    pub start: usize,
    pub peak: usize,
    pub end: usize,
    pub gain_db: f64,
}

/// Linear gain per sample; unity outside every group.
///
/// Each ramp is `linspace` in dB including both endpoints. Later groups
/// overwrite earlier ones where they overlap; indices past `frames` are dropped.
pub fn gain_envelope(frames: usize, groups: &[LoudnessGroup]) -> Vec<f64> {
    let mut envelope = vec![1.0f64; frames];
    for group in groups {
        write_ramp(&mut envelope, group.start, group.peak, 0.0, group.gain_db);
        write_ramp(&mut envelope, group.peak, group.end, group.gain_db, 0.0);
    }
    envelope
}

fn write_ramp(envelope: &mut [f64], from: usize, to: usize, from_db: f64, to_db: f64) {
    let n = to.saturating_sub(from);
    for k in 0..n {
        let Some(slot) = envelope.get_mut(from + k) else { break };
        let db = if n == 1 {
            from_db
        } else {
            from_db + (to_db - from_db) * k as f64 / (n - 1) as f64
        };
        *slot = 10f64.powf(db / 20.0);
    }
}

/// Multiply every channel by the envelope built from `groups`.
pub fn apply_loudness_transition(buffer: &mut AudioBuffer, groups: &[LoudnessGroup]) {
    let envelope = gain_envelope(buffer.num_frames(), groups);
    for ch in 0..buffer.channels() {
        for (sample, &gain) in buffer.channel_mut(ch).iter_mut().zip(envelope.iter()) {
            *sample = (*sample as f64 * gain) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_gain_is_identity() {
        let mut buffer = AudioBuffer::from_mono(16000, (0..1000).map(|i| (i as f32 * 0.01).sin()).collect()).unwrap();
        let original = buffer.clone();
        let groups = [
            LoudnessGroup { start: 10, peak: 200, end: 400, gain_db: 0.0 },
            LoudnessGroup { start: 500, peak: 600, end: 900, gain_db: 0.0 },
        ];
        apply_loudness_transition(&mut buffer, &groups);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_ramp_shape() {
        let envelope = gain_envelope(12, &[LoudnessGroup { start: 2, peak: 5, end: 9, gain_db: 20.0 }]);
        assert_eq!(envelope[0], 1.0);
        assert_eq!(envelope[1], 1.0);
        // Rise: 0, 10, 20 dB over [2, 5)
        assert!((envelope[2] - 1.0).abs() < 1e-12);
        assert!((envelope[3] - 10f64.powf(0.5)).abs() < 1e-12);
        assert!((envelope[4] - 10.0).abs() < 1e-12);
        // Fall: 20 -> 0 dB over [5, 9)
        assert!((envelope[5] - 10.0).abs() < 1e-12);
        assert!((envelope[8] - 1.0).abs() < 1e-12);
        assert_eq!(envelope[9], 1.0);
    }

    #[test]
    fn test_later_group_overwrites() {
        let groups = [
            LoudnessGroup { start: 0, peak: 4, end: 8, gain_db: -20.0 },
            LoudnessGroup { start: 2, peak: 3, end: 4, gain_db: 20.0 },
        ];
        let envelope = gain_envelope(8, &groups);
        // Single-sample ramps take their starting value.
        assert!((envelope[2] - 1.0).abs() < 1e-12);
        assert!((envelope[3] - 10.0).abs() < 1e-12);
        assert!(envelope[1] < 1.0);
        assert!(envelope[5] < 1.0);
    }

    #[test]
    fn test_out_of_range_indices_ignored() {
        let envelope = gain_envelope(4, &[LoudnessGroup { start: 2, peak: 10, end: 20, gain_db: 6.0 }]);
        assert_eq!(envelope.len(), 4);
        assert_eq!(envelope[0], 1.0);
        assert!(envelope[3] > 1.0);
    }
}
