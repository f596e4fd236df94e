//! Per-sample random number generators

use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Seed derived from a sample identifier.
///
/// Identifiers such as `fileid_1234` use the number after the last `_`.
/// Anything else is hashed, so the seed still depends only on the identifier.
pub fn sample_seed(uid: &str) -> u64 {
    let suffix = uid.rsplit('_').next().unwrap_or(uid);
    if let Ok(n) = suffix.parse::<u64>() {
        return n;
    }
    let hash = blake3::hash(uid.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

pub fn create_rng(uid: &str) -> Pcg32 {
    Pcg32::seed_from_u64(sample_seed(uid))
}
