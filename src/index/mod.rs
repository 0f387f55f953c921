//! Fingerprint database of reference recordings.
//!
//! Records are accumulated by a [`DatabaseBuilder`] and sorted once when it is
//! finished. The resulting [`FingerprintDatabase`] is immutable and answers
//! tolerance-box range queries with binary searches over the sorted records.

mod catalog;
mod query;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{HashKey, HashRecord};

pub use catalog::{Catalog, CatalogEntry};
pub use query::{LookupStats, Tolerance};

/// Identifier of a reference recording.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(u32);

impl SourceId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }

    /// Convert a stored integer back into an id, rejecting out-of-range values.
    pub fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok().map(Self)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A hash record tagged with the recording it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatabaseRecord {
    pub hash: HashRecord,
    pub source_id: SourceId,
}

/// Accumulates reference recordings before the database is frozen.
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    records: Vec<DatabaseRecord>,
    catalog: Catalog,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reopen a finished database for more registrations.
    pub fn from_database(db: FingerprintDatabase) -> Self {
        Self {
            records: db.records,
            catalog: db.catalog,
        }
    }

    /// Recordings registered so far.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Add a recording's hash records under `source_id`.
    ///
    /// Registering the same id again appends to its records.
    pub fn register_recording(&mut self, source_id: SourceId, hashes: &[HashRecord]) {
        self.catalog.record(source_id, None, hashes.len());
        self.push_records(source_id, hashes);
    }

    /// Like [`register_recording`](Self::register_recording), also naming the recording.
    pub fn register_named_recording(
        &mut self,
        source_id: SourceId,
        name: impl Into<String>,
        hashes: &[HashRecord],
    ) {
        self.catalog.record(source_id, Some(name.into()), hashes.len());
        self.push_records(source_id, hashes);
    }

    fn push_records(&mut self, source_id: SourceId, hashes: &[HashRecord]) {
        self.records.reserve(hashes.len());
        self.records.extend(
            hashes
                .iter()
                .map(|&hash| DatabaseRecord { hash, source_id }),
        );
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort all records and freeze the database.
    pub fn finish(self) -> FingerprintDatabase {
        let database = FingerprintDatabase::from_parts(self.records, self.catalog);
        info!(
            "Fingerprint database ready: {} records from {} recordings",
            database.len(),
            database.catalog().len()
        );
        database
    }
}

/// Immutable, sorted collection of reference hash records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerprintDatabase {
    records: Vec<DatabaseRecord>,
    catalog: Catalog,
}

impl FingerprintDatabase {
    pub(crate) fn from_parts(mut records: Vec<DatabaseRecord>, catalog: Catalog) -> Self {
        if !records.is_sorted() {
            records.sort_unstable();
        }
        Self { records, catalog }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending `(freq_anchor, freq_other, delta_time, time_anchor, source)` order.
    pub fn records(&self) -> &[DatabaseRecord] {
        &self.records
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Visit every record within `tolerance` of `key`, stopping after `cap`
    /// records (0 = no cap).
    pub fn lookup(
        &self,
        key: HashKey,
        tolerance: Tolerance,
        cap: usize,
        visit: impl FnMut(&DatabaseRecord),
    ) -> LookupStats {
        query::for_each_match(&self.records, key, tolerance, cap, visit)
    }

    /// All records within `tolerance` of `key`, in storage order.
    pub fn range(&self, key: HashKey, tolerance: Tolerance) -> Vec<DatabaseRecord> {
        let mut found = Vec::new();
        self.lookup(key, tolerance, 0, |record| found.push(*record));
        found
    }
}
