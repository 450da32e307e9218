use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::data::{Cursor, Page, Record};
use super::error::LibraryError;

const RECORD_COLUMNS: &str = "id, media_url, cover_url, created_at";

/// The Library manages the SQLite media catalog.
/// It stores one row per media item and serves keyset-paginated reads.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

/// A row as stored, before its timestamp is validated
struct StoredRecord {
    id: String,
    media_url: Option<String>,
    cover_url: Option<String>,
    created_at: i64,
}

impl StoredRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRecord {
            id: row.get(0)?,
            media_url: row.get(1)?,
            cover_url: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_record(self) -> Result<Record, LibraryError> {
        let created_at = DateTime::<Utc>::from_timestamp_micros(self.created_at).ok_or(
            LibraryError::InvalidTimestamp {
                id: self.id.clone(),
                micros: self.created_at,
            },
        )?;

        Ok(Record {
            id: self.id,
            media_url: self.media_url,
            cover_url: self.cover_url,
            created_at,
        })
    }
}

impl Library {
    /// Open (or create) the catalog at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let mut library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.init_schema()?;

        Ok(library)
    }

    /// Open a throwaway catalog that lives only in memory
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let mut library = Library {
            conn: Connection::open_in_memory()?,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Get the path where the catalog is stored by default.
    ///
    /// - Linux: ~/.local/share/media-wall/media_wall.db
    /// - macOS: ~/Library/Application Support/media-wall/media_wall.db
    /// - Windows: %APPDATA%\media-wall\media_wall.db
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("media-wall");
        path.push("media_wall.db");
        Some(path)
    }

    /// Initialize the database schema.
    fn init_schema(&mut self) -> Result<(), LibraryError> {
        // created_at is stored as Unix microseconds so ordering is exact
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS media_assets (
                id              TEXT PRIMARY KEY,
                media_url       TEXT,
                cover_url       TEXT,
                created_at      INTEGER NOT NULL
            )",
            [],
        )?;

        // Matches the keyset order exactly
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_assets_keyset
             ON media_assets(created_at DESC, id DESC)",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Get a count of records in the catalog
    pub fn record_count(&self) -> Result<i64, LibraryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media_assets", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a record. Returns false when a record with the same id exists.
    pub fn insert_record(&self, record: &Record) -> Result<bool, LibraryError> {
        let result = self.conn.execute(
            "INSERT INTO media_assets (id, media_url, cover_url, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.media_url,
                record.cover_url,
                record.created_at.timestamp_micros(),
            ],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a record's cover. Returns false when the id is unknown.
    pub fn set_cover_url(&self, id: &str, cover_url: &str) -> Result<bool, LibraryError> {
        let changed = self.conn.execute(
            "UPDATE media_assets SET cover_url = ?1 WHERE id = ?2",
            params![cover_url, id],
        )?;
        Ok(changed > 0)
    }

    /// Look up a single record. Not-found is `Ok(None)`.
    pub fn fetch_record(&self, id: &str) -> Result<Option<Record>, LibraryError> {
        let stored = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM media_assets WHERE id = ?1"),
                params![id],
                StoredRecord::from_row,
            )
            .optional()?;

        stored.map(StoredRecord::into_record).transpose()
    }

    /// Fetch the page that follows `cursor`, newest first.
    ///
    /// Ordering is `created_at DESC, id DESC`; a cursor keeps only rows strictly
    /// after it in that order, so walking `next_cursor` visits every row once.
    pub fn fetch_page(
        &self,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<Page, LibraryError> {
        let limit = page_size.max(1) as i64;

        let stored: Vec<StoredRecord> = match cursor {
            Some(cursor) => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {RECORD_COLUMNS} FROM media_assets
                     WHERE created_at < ?1 OR (created_at = ?1 AND id < ?2)
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?3"
                ))?;
                let rows = stmt.query_map(
                    params![cursor.created_at.timestamp_micros(), cursor.id, limit],
                    StoredRecord::from_row,
                )?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = self.conn.prepare_cached(&format!(
                    "SELECT {RECORD_COLUMNS} FROM media_assets
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit], StoredRecord::from_row)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        let items = stored
            .into_iter()
            .map(StoredRecord::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        let next_cursor = items.last().map(Record::cursor);
        let total = self.record_count()?;

        Ok(Page {
            items,
            next_cursor,
            total,
        })
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}
