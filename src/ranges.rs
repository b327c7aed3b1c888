//! Weighted range allocation over `1..=10000`.
use serde::{Deserialize, Serialize};

use crate::bucketer::MAX_TRAFFIC_VALUE;

/// Inclusive range of bucket values allocated to one weighted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRange {
    pub start: i64,
    pub end: i64,
}

impl AllocationRange {
    /// Range given to zero-weight items. Never contains a bucket value.
    pub const EMPTY: AllocationRange = AllocationRange { start: -1, end: -1 };

    pub fn contains(&self, bucket_value: u32) -> bool {
        let value = i64::from(bucket_value);
        self.start != -1 && self.start <= value && value <= self.end
    }
}

impl Default for AllocationRange {
    fn default() -> Self {
        AllocationRange::EMPTY
    }
}

/// Anything that takes a share of the bucket space.
pub trait Weighted {
    fn weight(&self) -> f64;
    fn allocation_range(&self) -> AllocationRange;
}

/// Number of bucket values granted to `weight`.
fn step(weight: f64) -> i64 {
    if weight <= 0.0 || weight.is_nan() {
        return 0;
    }
    ((weight * 100.0).ceil() as i64).min(i64::from(MAX_TRAFFIC_VALUE))
}

/// Compute one contiguous range per weight, in input order.
///
/// Each non-zero weight gets `min(ceil(weight * 100), 10000)` values starting right after the
/// previous non-empty range. Zero weights get [`AllocationRange::EMPTY`].
pub fn compute_ranges(weights: impl IntoIterator<Item = f64>) -> Vec<AllocationRange> {
    let mut current_end = 0;
    weights
        .into_iter()
        .map(|weight| {
            let step = step(weight);
            if step == 0 {
                return AllocationRange::EMPTY;
            }
            let range = AllocationRange {
                start: current_end + 1,
                end: current_end + step,
            };
            current_end = range.end;
            range
        })
        .collect()
}

/// Return the first item whose range contains `bucket_value`.
pub fn lookup<'a, T: Weighted>(
    items: impl IntoIterator<Item = &'a T>,
    bucket_value: u32,
) -> Option<&'a T>
where
    T: 'a,
{
    items
        .into_iter()
        .find(|item| item.allocation_range().contains(bucket_value))
}

/// Rescale `weights` so that they sum to 100.
///
/// If they sum to zero every item gets an equal share.
pub fn scale_to_100(weights: &mut [f64]) {
    if weights.is_empty() {
        return;
    }
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        let share = 100.0 / weights.len() as f64;
        weights.iter_mut().for_each(|weight| *weight = share);
    } else {
        let factor = 100.0 / total;
        weights.iter_mut().for_each(|weight| *weight *= factor);
    }
}

/// Owned weighted item, used when ranges are recomputed over a subset (whitelisted variations,
/// eligible group campaigns).
#[derive(Debug, Clone)]
pub(crate) struct Allocated<T> {
    pub item: T,
    pub weight: f64,
    pub range: AllocationRange,
}

impl<T> Weighted for Allocated<T> {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn allocation_range(&self) -> AllocationRange {
        self.range
    }
}

/// Rescale weights of `items` to 100 and assign their ranges.
pub(crate) fn allocate<T>(items: impl IntoIterator<Item = (T, f64)>) -> Vec<Allocated<T>> {
    let (items, mut weights): (Vec<T>, Vec<f64>) = items.into_iter().unzip();
    scale_to_100(&mut weights);
    let ranges = compute_ranges(weights.iter().copied());
    items
        .into_iter()
        .zip(weights)
        .zip(ranges)
        .map(|((item, weight), range)| Allocated {
            item,
            weight,
            range,
        })
        .collect()
}
