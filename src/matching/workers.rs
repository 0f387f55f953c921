use crate::analysis::HashRecord;
use crate::config::MatchingConfig;
use crate::index::{FingerprintDatabase, Tolerance};

use super::{TimePair, VoteTally};

/// Below this many query hashes per worker, extra threads are not worth spawning.
const MIN_HASHES_PER_WORKER: usize = 256;

#[derive(Debug, Default)]
pub(super) struct Lookups {
    pub(super) pairs: Vec<TimePair>,
    pub(super) votes: VoteTally,
    pub(super) truncated: usize,
}

impl Lookups {
    fn absorb(&mut self, other: Lookups) {
        self.pairs.extend(other.pairs);
        self.votes.merge(other.votes);
        self.truncated += other.truncated;
    }
}

/// Look up every query hash, splitting the query into contiguous chunks across
/// scoped workers. Each worker tallies locally; chunks are merged in query
/// order so the result matches a sequential run.
pub(super) fn lookup_all(
    db: &FingerprintDatabase,
    query: &[HashRecord],
    params: &MatchingConfig,
) -> Lookups {
    let tolerance = Tolerance::from_config(params);
    let cap = params.max_candidates_per_hash;
    let workers = worker_count(params.worker_count, query.len());
    if workers <= 1 {
        return lookup_chunk(db, query, tolerance, cap);
    }
    let chunk_size = query.len().div_ceil(workers);
    std::thread::scope(|scope| {
        let handles: Vec<_> = query
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || lookup_chunk(db, chunk, tolerance, cap)))
            .collect();
        let mut merged = Lookups::default();
        for handle in handles {
            let partial = handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            merged.absorb(partial);
        }
        merged
    })
}

fn lookup_chunk(
    db: &FingerprintDatabase,
    chunk: &[HashRecord],
    tolerance: Tolerance,
    cap: usize,
) -> Lookups {
    let mut found = Lookups::default();
    for query in chunk {
        let stats = db.lookup(query.key(), tolerance, cap, |record| {
            found.pairs.push(TimePair {
                db_time: record.hash.time_anchor,
                query_time: query.time_anchor,
                source_id: record.source_id,
            });
            found.votes.add(record.source_id);
        });
        if stats.truncated {
            found.truncated += 1;
        }
    }
    found
}

fn worker_count(requested: u32, hashes: usize) -> usize {
    let available = if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        requested as usize
    };
    available.min(hashes / MIN_HASHES_PER_WORKER).max(1)
}
