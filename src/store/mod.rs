//! SQLite persistence for fingerprint databases.
//!
//! A store file holds the catalog of recordings, every hash record and the
//! analysis parameters the records were produced with. Loading returns records
//! in the database's sort order with their original field values.

mod schema;
mod util;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::HashRecord;
use crate::config::FingerprintConfig;
use crate::index::{Catalog, CatalogEntry, DatabaseRecord, FingerprintDatabase, SourceId};

use util::{column_u32, column_usize, map_sql_error};

/// Metadata key for the JSON-encoded analysis parameters.
pub const META_ANALYSIS_PARAMS: &str = "analysis_params";
/// Metadata key for the store layout version.
pub const META_FORMAT_VERSION: &str = "format_version";
const FORMAT_VERSION: &str = "1";

/// Errors returned when reading or writing a fingerprint store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query failed.
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Database is locked or busy.
    #[error("Database is busy, please retry")]
    Busy,
    /// Failed to create the parent directory of the store file.
    #[error("Could not write to {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A stored integer does not fit its field.
    #[error("Corrupt value {value} in column {column}")]
    CorruptRecord { column: &'static str, value: i64 },
    /// Stored analysis parameters could not be encoded or decoded.
    #[error("Invalid analysis parameters: {0}")]
    ParamsJson(#[from] serde_json::Error),
    /// No store file exists at the given path.
    #[error("No fingerprint store at {path}")]
    Missing { path: PathBuf },
}

/// A database read back from disk.
#[derive(Debug, Clone)]
pub struct StoredDatabase {
    pub database: FingerprintDatabase,
    /// Parameters the records were built with; `None` for stores written without them.
    pub config: Option<FingerprintConfig>,
}

/// SQLite file holding one fingerprint database.
pub struct FingerprintStore {
    connection: Connection,
    path: PathBuf,
}

impl FingerprintStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        util::create_parent_if_needed(path)?;
        let connection = Connection::open(path).map_err(map_sql_error)?;
        Self::prepare(connection, path)
    }

    /// Open the store at `path` without creating the file or its directory.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::Missing {
                path: path.to_path_buf(),
            });
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags).map_err(map_sql_error)?;
        Self::prepare(connection, path)
    }

    fn prepare(connection: Connection, path: &Path) -> Result<Self, StoreError> {
        let store = Self {
            connection,
            path: path.to_path_buf(),
        };
        store.apply_pragmas()?;
        schema::apply_schema(&store.connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
            )
            .map_err(map_sql_error)
    }

    /// Replace the stored contents with `db`, recording `config` alongside.
    pub fn save(&self, db: &FingerprintDatabase, config: &FingerprintConfig) -> Result<(), StoreError> {
        let params_json = serde_json::to_string(config)?;
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        tx.execute_batch("DELETE FROM hashes; DELETE FROM recordings;")
            .map_err(map_sql_error)?;
        {
            let mut insert_recording = tx
                .prepare_cached(
                    "INSERT INTO recordings (source_id, name, hash_count) VALUES (?1, ?2, ?3)",
                )
                .map_err(map_sql_error)?;
            for (source_id, entry) in db.catalog().iter() {
                insert_recording
                    .execute(params![
                        source_id.as_i64(),
                        entry.name,
                        entry.hash_count as i64
                    ])
                    .map_err(map_sql_error)?;
            }
            let mut insert_hash = tx
                .prepare_cached(
                    "INSERT INTO hashes (freq_anchor, freq_other, delta_time, time_anchor, source_id)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(map_sql_error)?;
            for record in db.records() {
                insert_hash
                    .execute(params![
                        i64::from(record.hash.freq_anchor),
                        i64::from(record.hash.freq_other),
                        i64::from(record.hash.delta_time),
                        i64::from(record.hash.time_anchor),
                        record.source_id.as_i64()
                    ])
                    .map_err(map_sql_error)?;
            }
            let mut upsert_meta = tx
                .prepare_cached(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .map_err(map_sql_error)?;
            upsert_meta
                .execute(params![META_ANALYSIS_PARAMS, params_json])
                .map_err(map_sql_error)?;
            upsert_meta
                .execute(params![META_FORMAT_VERSION, FORMAT_VERSION])
                .map_err(map_sql_error)?;
        }
        tx.commit().map_err(map_sql_error)?;
        info!(
            "Saved {} records for {} recordings to {}",
            db.len(),
            db.catalog().len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read the stored database and its analysis parameters.
    pub fn load(&self) -> Result<StoredDatabase, StoreError> {
        let config = self.load_params()?;
        let catalog = self.load_catalog()?;
        let records = self.load_records()?;
        Ok(StoredDatabase {
            database: FingerprintDatabase::from_parts(records, catalog),
            config,
        })
    }

    fn load_params(&self) -> Result<Option<FingerprintConfig>, StoreError> {
        let json: Option<String> = self
            .connection
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![META_ANALYSIS_PARAMS],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?;
        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn load_catalog(&self) -> Result<Catalog, StoreError> {
        let mut stmt = self
            .connection
            .prepare("SELECT source_id, name, hash_count FROM recordings ORDER BY source_id")
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(map_sql_error)?;
        let mut catalog = Catalog::default();
        for row in rows {
            let (source_id, name, hash_count) = row.map_err(map_sql_error)?;
            catalog.insert(
                parse_source_id(source_id)?,
                CatalogEntry {
                    name,
                    hash_count: column_usize("hash_count", hash_count)?,
                },
            );
        }
        Ok(catalog)
    }

    fn load_records(&self) -> Result<Vec<DatabaseRecord>, StoreError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT freq_anchor, freq_other, delta_time, time_anchor, source_id FROM hashes
                 ORDER BY freq_anchor, freq_other, delta_time, time_anchor, source_id",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok([
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ])
            })
            .map_err(map_sql_error)?;
        let mut records = Vec::new();
        for row in rows {
            let [freq_anchor, freq_other, delta_time, time_anchor, source_id] =
                row.map_err(map_sql_error)?;
            records.push(DatabaseRecord {
                hash: HashRecord {
                    freq_anchor: column_u32("freq_anchor", freq_anchor)?,
                    freq_other: column_u32("freq_other", freq_other)?,
                    delta_time: column_u32("delta_time", delta_time)?,
                    time_anchor: column_u32("time_anchor", time_anchor)?,
                },
                source_id: parse_source_id(source_id)?,
            });
        }
        Ok(records)
    }
}

fn parse_source_id(value: i64) -> Result<SourceId, StoreError> {
    SourceId::from_i64(value).ok_or(StoreError::CorruptRecord {
        column: "source_id",
        value,
    })
}

/// Write `db` and `config` to the store file at `path`.
pub fn save(path: impl AsRef<Path>, db: &FingerprintDatabase, config: &FingerprintConfig) -> Result<(), StoreError> {
    FingerprintStore::open(path)?.save(db, config)
}

/// Read the store file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<StoredDatabase, StoreError> {
    FingerprintStore::open(path)?.load()
}

/// Read the store file at `path`, warning when it was built with analysis
/// parameters other than `active`.
pub fn load_for(path: impl AsRef<Path>, active: &FingerprintConfig) -> Result<StoredDatabase, StoreError> {
    let path = path.as_ref();
    let stored = load(path)?;
    warn_on_params(path, &stored, active);
    Ok(stored)
}

/// Like [`load_for`], but fails with [`StoreError::Missing`] instead of
/// creating an empty store.
pub fn load_existing_for(
    path: impl AsRef<Path>,
    active: &FingerprintConfig,
) -> Result<StoredDatabase, StoreError> {
    let path = path.as_ref();
    let stored = FingerprintStore::open_existing(path)?.load()?;
    warn_on_params(path, &stored, active);
    Ok(stored)
}

fn warn_on_params(path: &Path, stored: &StoredDatabase, active: &FingerprintConfig) {
    match &stored.config {
        Some(config) if !config.same_analysis(active) => warn!(
            "{} was built with different analysis parameters; matches may be unreliable",
            path.display()
        ),
        None if !stored.database.is_empty() => {
            warn!("{} carries no analysis parameters", path.display())
        }
        _ => {}
    }
}
