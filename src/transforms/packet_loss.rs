//! Packet loss simulation

use crate::audio::AudioBuffer;

/// Sample range covered by packet `index`, before clamping to the buffer.
///
/// Saturates instead of overflowing, so absurd indices land past any buffer.
pub fn packet_window(index: usize, packet_duration_ms: u32, sample_rate: u32) -> (usize, usize) {
    let per_packet = packet_duration_ms as u64 * sample_rate as u64;
    let index = index as u64;
    let start = index.saturating_mul(per_packet) / 1000;
    let end = index.saturating_add(1).saturating_mul(per_packet) / 1000;
    let to_usize = |x: u64| usize::try_from(x).unwrap_or(usize::MAX);
    (to_usize(start), to_usize(end))
}

/// Zero the window of every lost packet on all channels.
pub fn apply_packet_loss(buffer: &mut AudioBuffer, indices: &[usize], packet_duration_ms: u32) {
    let frames = buffer.num_frames();
    let sample_rate = buffer.sample_rate();
    for &index in indices {
        let (start, end) = packet_window(index, packet_duration_ms, sample_rate);
        if start >= frames {
            continue;
        }
        let end = end.min(frames);
        for ch in 0..buffer.channels() {
            let mut channel = buffer.channel_mut(ch);
            for sample in channel.iter_mut().skip(start).take(end - start) {
                *sample = 0.0;
            }
        }
    }
}
