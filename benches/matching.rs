use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use earmark::analysis::HashRecord;
use earmark::config::MatchingConfig;
use earmark::index::Tolerance;
use earmark::{DatabaseBuilder, FingerprintDatabase, SourceId, matching};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const RECORDINGS: u32 = 64;
const HASHES_PER_RECORDING: usize = 4_000;
const QUERY_HASHES: usize = 1_000;

fn random_hashes(rng: &mut StdRng, count: usize) -> Vec<HashRecord> {
    (0..count)
        .map(|_| {
            let freq_anchor = rng.random_range(32..1_000);
            HashRecord {
                freq_anchor,
                freq_other: freq_anchor + rng.random_range(0..64) - 32,
                delta_time: rng.random_range(1..100),
                time_anchor: rng.random_range(0..20_000),
            }
        })
        .collect()
}

fn seed_database(rng: &mut StdRng) -> FingerprintDatabase {
    let mut builder = DatabaseBuilder::new();
    for id in 0..RECORDINGS {
        let hashes = random_hashes(rng, HASHES_PER_RECORDING);
        builder.register_recording(SourceId::new(id), &hashes);
    }
    builder.finish()
}

fn bench_matching(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let db = seed_database(&mut rng);
    let query = random_hashes(&mut rng, QUERY_HASHES);
    let params = MatchingConfig::default();
    let tolerance = Tolerance::from_config(&params);

    c.bench_function("range_query_default_tolerance", |b| {
        let mut next = 0;
        b.iter(|| {
            let key = query[next % query.len()].key();
            next += 1;
            black_box(db.range(black_box(key), tolerance).len())
        });
    });

    c.bench_function("identify_random_query", |b| {
        b.iter(|| black_box(matching::identify(&db, black_box(&query), &params).best));
    });

    c.bench_function("database_build", |b| {
        b.iter_batched(
            || {
                let mut rng = StdRng::seed_from_u64(11);
                (0..8)
                    .map(|_| random_hashes(&mut rng, HASHES_PER_RECORDING))
                    .collect::<Vec<_>>()
            },
            |recordings| {
                let mut builder = DatabaseBuilder::new();
                for (id, hashes) in recordings.iter().enumerate() {
                    builder.register_recording(SourceId::new(id as u32), hashes);
                }
                builder.finish()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_matching);
criterion_main!(benches);
