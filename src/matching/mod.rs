//! Matching query hashes against the fingerprint database.
//!
//! Every query record is looked up within the configured tolerances; each hit
//! becomes a [`TimePair`] and one vote for its recording. The winner is the
//! recording with the most votes, ties going to the smallest id.

mod alignment;
mod workers;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::HashRecord;
use crate::config::{MatchPolicy, MatchingConfig};
use crate::index::{FingerprintDatabase, SourceId};

pub use alignment::aligned_votes;

/// A query record matched to a database record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimePair {
    /// Anchor frame of the database record.
    pub db_time: u32,
    /// Anchor frame of the query record.
    pub query_time: u32,
    pub source_id: SourceId,
}

impl TimePair {
    /// Database anchor time minus query anchor time.
    pub fn offset(&self) -> i64 {
        i64::from(self.db_time) - i64::from(self.query_time)
    }
}

/// Match counts per recording, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VoteTally {
    counts: BTreeMap<SourceId, usize>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source_id: SourceId) {
        self.add_many(source_id, 1);
    }

    pub fn add_many(&mut self, source_id: SourceId, votes: usize) {
        if votes > 0 {
            *self.counts.entry(source_id).or_insert(0) += votes;
        }
    }

    pub fn merge(&mut self, other: VoteTally) {
        for (source_id, votes) in other.counts {
            self.add_many(source_id, votes);
        }
    }

    pub fn get(&self, source_id: SourceId) -> usize {
        self.counts.get(&source_id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, usize)> + '_ {
        self.counts.iter().map(|(id, votes)| (*id, *votes))
    }

    /// Recording with the most votes; the smallest id wins a tie.
    ///
    /// `None` for an empty tally.
    pub fn winner(&self) -> Option<(SourceId, usize)> {
        self.iter().fold(None, |best, (id, votes)| match best {
            Some((_, best_votes)) if best_votes >= votes => best,
            _ => Some((id, votes)),
        })
    }

    /// Fraction of all votes cast for `source_id`, 0 when nothing was cast.
    pub fn share(&self, source_id: SourceId) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(source_id) as f64 / total as f64
        }
    }
}

impl FromIterator<SourceId> for VoteTally {
    fn from_iter<I: IntoIterator<Item = SourceId>>(iter: I) -> Self {
        let mut tally = VoteTally::new();
        iter.into_iter().for_each(|id| tally.add(id));
        tally
    }
}

/// Result of identifying one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// Identified recording, `None` when nothing matched.
    pub best: Option<SourceId>,
    /// Raw per-recording match counts.
    pub votes: VoteTally,
    /// Largest offset-consistent group per recording, when that policy is active.
    pub aligned: Option<VoteTally>,
    pub time_pairs: Vec<TimePair>,
    /// Query records whose lookup hit the per-hash candidate cap.
    pub truncated_lookups: usize,
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        self.best.is_some()
    }

    /// Tally the winner was chosen from.
    pub fn deciding_tally(&self) -> &VoteTally {
        self.aligned.as_ref().unwrap_or(&self.votes)
    }
}

/// Collect all time pairs for `query` without tallying a winner.
pub fn find_time_pairs(
    db: &FingerprintDatabase,
    query: &[HashRecord],
    params: &MatchingConfig,
) -> Vec<TimePair> {
    workers::lookup_all(db, query, params).pairs
}

/// Match `query` against `db` and pick the best recording.
///
/// An empty query, or one without any hit, yields an outcome with no winner.
pub fn identify(
    db: &FingerprintDatabase,
    query: &[HashRecord],
    params: &MatchingConfig,
) -> MatchOutcome {
    let found = workers::lookup_all(db, query, params);
    let aligned = match params.policy {
        MatchPolicy::RawVotes => None,
        MatchPolicy::OffsetAligned => Some(aligned_votes(&found.pairs, params.offset_bin)),
    };
    let best = aligned
        .as_ref()
        .unwrap_or(&found.votes)
        .winner()
        .map(|(id, _)| id);
    if found.truncated > 0 {
        debug!(
            "{} of {} query hashes hit the candidate cap of {}",
            found.truncated,
            query.len(),
            params.max_candidates_per_hash
        );
    }
    info!(
        "Matched {} query hashes into {} time pairs across {} recordings; best = {}",
        query.len(),
        found.pairs.len(),
        found.votes.len(),
        best.map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    MatchOutcome {
        best,
        votes: found.votes,
        aligned,
        time_pairs: found.pairs,
        truncated_lookups: found.truncated,
    }
}
