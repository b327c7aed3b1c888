//! Hash-based bucketing primitives.
//!
//! Every bucketing decision composes on [`hash_value`] and [`scale`]. Both must stay bit-for-bit
//! identical to the other SDKs of the same family, otherwise a user would land in different
//! variations depending on the SDK language.
use std::io::Cursor;

use crate::settings::Campaign;

/// Seed passed to murmur3.
pub const SEED_VALUE: u32 = 1;

/// Upper bound of the bucket value used for the traffic check.
pub const MAX_TRAFFIC_PERCENT: u32 = 100;

/// Upper bound of the bucket value used for variation (and group) allocation.
pub const MAX_TRAFFIC_VALUE: u32 = 10_000;

pub trait BucketHasher {
    fn hash(&self, input: &str) -> u32;
}

/// The default (and only) hasher: unsigned 32-bit murmur3 seeded with [`SEED_VALUE`].
pub struct Murmur3Hasher;

impl BucketHasher for Murmur3Hasher {
    fn hash(&self, input: &str) -> u32 {
        hash_value(input)
    }
}

/// Unsigned murmur3 (x86, 32-bit) of `identifier` with seed `1`.
pub fn hash_value(identifier: &str) -> u32 {
    murmur3::murmur3_32(&mut Cursor::new(identifier.as_bytes()), SEED_VALUE)
        .expect("reading from an in-memory buffer should not fail")
}

/// Scale a hash into `1..=max_value` (before `multiplier` is applied).
///
/// Computes `floor((max_value * (hash / 2^32) + 1) * multiplier)` in double precision, in exactly
/// this order of operations.
pub fn scale(hash: u32, max_value: u32, multiplier: f64) -> u32 {
    let ratio = f64::from(hash) / 2f64.powi(32);
    let multiplied_value = (f64::from(max_value) * ratio + 1.0) * multiplier;
    multiplied_value.floor() as u32
}

/// Hash `seed` with `hasher` and scale it.
pub fn bucket_value(hasher: &impl BucketHasher, seed: &str, max_value: u32, multiplier: f64) -> u32 {
    scale(hasher.hash(seed), max_value, multiplier)
}

/// Pick the identifier that gets hashed for a decision.
///
/// Group salting takes precedence; campaign salting applies when new bucketing is enabled on the
/// settings file or the campaign opted in; otherwise the raw user id is hashed.
pub fn bucketing_seed(
    is_new_bucketing_enabled: bool,
    user_id: &str,
    campaign: Option<&Campaign>,
    group_id: Option<u64>,
) -> String {
    if let Some(group_id) = group_id {
        return format!("{group_id}_{user_id}");
    }
    match campaign {
        Some(campaign) if is_new_bucketing_enabled || campaign.is_bucketing_seed_enabled => {
            format!("{}_{}", campaign.id, user_id)
        }
        _ => user_id.to_owned(),
    }
}

#[cfg(test)]
pub(crate) struct DeterministicHasher(pub std::collections::HashMap<String, u32>);

#[cfg(test)]
impl BucketHasher for DeterministicHasher {
    fn hash(&self, input: &str) -> u32 {
        self.0.get(input).copied().unwrap_or(0)
    }
}
