//! Floor binary search over sorted index entries.
//!
//! Both database formats keep an array of range start keys sorted in
//! ascending order. A query belongs to the range whose start is the
//! largest key not exceeding it, so the search narrows `[low, high)`
//! until one candidate is left and returns that position.

use crate::error::Result;

/// How the search treats a key equal to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Return immediately on an exact key match (v4 index)
    ShortCircuit,
    /// Keep narrowing on equality (v6 index)
    Narrowing,
}

/// Find the position of the greatest key `<= target` among `count` keys.
///
/// `key_at(i)` reads the key of entry `i`; it is only called with
/// `i < count`. A target below the first key returns 0. `count` must be
/// at least 1.
pub fn floor_search<F>(target: u64, count: usize, mode: SearchMode, key_at: F) -> Result<usize>
where
    F: Fn(usize) -> Result<u64>,
{
    let mut low = 0usize;
    let mut high = count;

    while high - low > 1 {
        let mid = low + (high - low) / 2;
        let key = key_at(mid)?;
        if mode == SearchMode::ShortCircuit && key == target {
            return Ok(mid);
        }
        if target < key {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(low)
}
