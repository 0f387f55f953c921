use crate::analysis::HashKey;
use crate::config::MatchingConfig;

use super::DatabaseRecord;

/// Inclusive per-field tolerance of a range query.
///
/// Both frequency fields use `freq`, the time delta uses `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tolerance {
    pub freq: u32,
    pub time: u32,
}

impl Tolerance {
    pub const fn new(freq: u32, time: u32) -> Self {
        Self { freq, time }
    }

    pub const fn exact() -> Self {
        Self::new(0, 0)
    }

    pub fn from_config(params: &MatchingConfig) -> Self {
        Self::new(params.freq_tolerance, params.time_tolerance)
    }
}

/// Work done by a single lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub visited: usize,
    /// More matching records existed than the cap allowed.
    pub truncated: bool,
}

fn bounds(value: u32, tolerance: u32) -> (u32, u32) {
    (value.saturating_sub(tolerance), value.saturating_add(tolerance))
}

/// Length of the leading run of `records` sharing the first record's `field`.
fn run_len(records: &[DatabaseRecord], field: impl Fn(&DatabaseRecord) -> u32) -> usize {
    match records.first() {
        Some(first) => {
            let value = field(first);
            records.partition_point(|record| field(record) == value)
        }
        None => 0,
    }
}

/// Walk `records` (sorted by key) and call `visit` on each record inside the
/// tolerance box around `key`.
///
/// The anchor-frequency range is located by binary search, then each distinct
/// anchor frequency is narrowed on the other frequency, and each distinct pair
/// on the time delta. `cap` bounds the number of visited records (0 = unbounded).
/// Without truncation records are visited in storage order; when the cap cuts
/// the lookup short, keys closest to `key` (summed field distance) go first.
pub(crate) fn for_each_match(
    records: &[DatabaseRecord],
    key: HashKey,
    tolerance: Tolerance,
    cap: usize,
    mut visit: impl FnMut(&DatabaseRecord),
) -> LookupStats {
    let limit = if cap == 0 { usize::MAX } else { cap };
    let (fa_low, fa_high) = bounds(key.freq_anchor, tolerance.freq);
    let (fo_low, fo_high) = bounds(key.freq_other, tolerance.freq);
    let (dt_low, dt_high) = bounds(key.delta_time, tolerance.time);

    let start = records.partition_point(|r| r.hash.freq_anchor < fa_low);
    let end = records.partition_point(|r| r.hash.freq_anchor <= fa_high);
    let mut rest = &records[start..end.max(start)];
    let mut runs: Vec<(u64, &[DatabaseRecord])> = Vec::new();
    let mut total = 0usize;

    while !rest.is_empty() {
        let anchor_len = run_len(rest, |r| r.hash.freq_anchor);
        let (anchor_group, next) = rest.split_at(anchor_len);
        rest = next;

        let lo = anchor_group.partition_point(|r| r.hash.freq_other < fo_low);
        let hi = anchor_group.partition_point(|r| r.hash.freq_other <= fo_high);
        let mut pairs = &anchor_group[lo..hi.max(lo)];
        while !pairs.is_empty() {
            let pair_len = run_len(pairs, |r| r.hash.freq_other);
            let (pair_group, next) = pairs.split_at(pair_len);
            pairs = next;

            let lo = pair_group.partition_point(|r| r.hash.delta_time < dt_low);
            let hi = pair_group.partition_point(|r| r.hash.delta_time <= dt_high);
            let mut deltas = &pair_group[lo..hi.max(lo)];
            while let Some(first) = deltas.first() {
                let run = run_len(deltas, |r| r.hash.delta_time);
                let distance = u64::from(first.hash.freq_anchor.abs_diff(key.freq_anchor))
                    + u64::from(first.hash.freq_other.abs_diff(key.freq_other))
                    + u64::from(first.hash.delta_time.abs_diff(key.delta_time));
                let (same_key, next) = deltas.split_at(run);
                deltas = next;
                total += same_key.len();
                runs.push((distance, same_key));
            }
        }
    }

    let truncated = total > limit;
    if truncated {
        // Stable, so equal distances keep storage order.
        runs.sort_by_key(|(distance, _)| *distance);
    }
    let mut stats = LookupStats {
        visited: 0,
        truncated,
    };
    for (_, same_key) in runs {
        let take = same_key.len().min(limit - stats.visited);
        same_key[..take].iter().for_each(&mut visit);
        stats.visited += take;
        if stats.visited == limit {
            break;
        }
    }
    stats
}
