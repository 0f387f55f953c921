use std::collections::HashMap;

use super::{TimePair, VoteTally};
use crate::index::SourceId;

/// Per recording, the size of the largest group of pairs whose offsets share
/// one bin of width `bin` frames.
///
/// True matches line up at a single offset; coincidental key hits scatter.
pub fn aligned_votes(pairs: &[TimePair], bin: u32) -> VoteTally {
    let width = i64::from(bin.max(1));
    let mut histogram: HashMap<(SourceId, i64), usize> = HashMap::new();
    for pair in pairs {
        *histogram
            .entry((pair.source_id, pair.offset().div_euclid(width)))
            .or_insert(0) += 1;
    }
    let mut best: HashMap<SourceId, usize> = HashMap::new();
    for ((source_id, _), count) in histogram {
        let entry = best.entry(source_id).or_insert(0);
        *entry = (*entry).max(count);
    }
    let mut tally = VoteTally::new();
    for (source_id, count) in best {
        tally.add_many(source_id, count);
    }
    tally
}
