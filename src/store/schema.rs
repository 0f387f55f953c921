use rusqlite::Connection;

use super::StoreError;
use super::util::map_sql_error;

pub(super) fn apply_schema(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
             CREATE TABLE IF NOT EXISTS recordings (
                source_id INTEGER PRIMARY KEY,
                name TEXT,
                hash_count INTEGER NOT NULL
            );
             CREATE TABLE IF NOT EXISTS hashes (
                freq_anchor INTEGER NOT NULL,
                freq_other INTEGER NOT NULL,
                delta_time INTEGER NOT NULL,
                time_anchor INTEGER NOT NULL,
                source_id INTEGER NOT NULL,
                FOREIGN KEY(source_id) REFERENCES recordings(source_id) ON DELETE CASCADE
             );
             CREATE INDEX IF NOT EXISTS idx_hashes_key
                ON hashes (freq_anchor, freq_other, delta_time);",
        )
        .map_err(map_sql_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();
        apply_schema(&connection).unwrap();
        apply_schema(&connection).unwrap();
        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('meta', 'recordings', 'hashes')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
