//! Target-zone pairing of peaks into hash records.

use serde::{Deserialize, Serialize};

use crate::config::HashingConfig;

use super::Peak;

/// Approximate-match key of a hash record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HashKey {
    pub freq_anchor: u32,
    pub freq_other: u32,
    pub delta_time: u32,
}

/// One anchor/other peak pair.
///
/// Ordering is by key first, then anchor time, which is the storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HashRecord {
    pub freq_anchor: u32,
    pub freq_other: u32,
    /// Frames from anchor to other peak; always positive.
    pub delta_time: u32,
    pub time_anchor: u32,
}

impl HashRecord {
    pub fn key(&self) -> HashKey {
        HashKey {
            freq_anchor: self.freq_anchor,
            freq_other: self.freq_other,
            delta_time: self.delta_time,
        }
    }
}

/// Region after an anchor peak whose peaks are paired with it.
///
/// Open on every side: time in `(t + delay, t + delay + width)`, frequency
/// strictly within half the height of the anchor's bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetZone {
    delay: u64,
    width: u64,
    height: u64,
}

impl TargetZone {
    pub fn new(params: &HashingConfig) -> Self {
        Self {
            delay: params.delay_time as u64,
            width: params.zone_width as u64,
            height: params.zone_height as u64,
        }
    }

    /// Exclusive time bounds of the zone for an anchor at `time`.
    fn time_bounds(&self, time: u32) -> (u64, u64) {
        let open = time as u64 + self.delay;
        (open, open + self.width)
    }

    pub fn contains(&self, anchor: &Peak, other: &Peak) -> bool {
        let (low, high) = self.time_bounds(anchor.time);
        let time = other.time as u64;
        time > low && time < high && self.contains_freq(anchor.freq, other.freq)
    }

    fn contains_freq(&self, anchor: u32, other: u32) -> bool {
        2 * (anchor.abs_diff(other) as u64) < self.height
    }
}

/// Pair every peak with the peaks inside its target zone.
///
/// Returns records sorted by key, then anchor time. Empty input yields an empty list.
pub fn hash_peaks(peaks: &[Peak], params: &HashingConfig) -> Vec<HashRecord> {
    let zone = TargetZone::new(params);
    let mut by_time: Vec<&Peak> = peaks.iter().collect();
    by_time.sort_by_key(|peak| peak.time);

    let mut records = Vec::new();
    for anchor in peaks {
        let (low, high) = zone.time_bounds(anchor.time);
        let start = by_time.partition_point(|peak| peak.time as u64 <= low);
        let end = by_time.partition_point(|peak| (peak.time as u64) < high);
        if start >= end {
            continue;
        }
        records.extend(
            by_time[start..end]
                .iter()
                .filter(|other| zone.contains_freq(anchor.freq, other.freq))
                .map(|other| HashRecord {
                    freq_anchor: anchor.freq,
                    freq_other: other.freq,
                    delta_time: other.time - anchor.time,
                    time_anchor: anchor.time,
                }),
        );
    }
    records.sort_unstable();
    records
}
