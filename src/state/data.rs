/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the catalog layer and the grid layer.
use chrono::{DateTime, Utc};

/// Represents a single media item in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Unique key of the media item
    pub id: String,
    /// Playable media source (None if not registered yet)
    pub media_url: Option<String>,
    /// Cover image URL or path (None until the cover service produced one)
    pub cover_url: Option<String>,
    /// Creation time, the primary sort key
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// The keyset position of this record
    pub fn cursor(&self) -> Cursor {
        Cursor {
            created_at: self.created_at,
            id: self.id.clone(),
        }
    }
}

/// Keyset watermark: the `(created_at, id)` of the last item seen.
///
/// `Option<Cursor>::None` means "start of stream".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

/// One page of records, ordered descending by `(created_at, id)`
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    /// Cursor of the last item, None when the page is empty
    pub next_cursor: Option<Cursor>,
    /// Exact number of records in the catalog at query time
    pub total: i64,
}

impl Page {
    /// Whether this page marks the end of the stream for the given page size
    pub fn is_last(&self, page_size: usize) -> bool {
        self.next_cursor.is_none() || self.items.len() < page_size
    }
}
