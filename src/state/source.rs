/// Async access to the catalog from the UI runtime
///
/// rusqlite::Connection is not Send, so every call opens its own connection
/// on the blocking pool instead of sharing the UI thread's one.
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use walkdir::WalkDir;

use super::data::{Cursor, Page, Record};
use super::error::LibraryError;
use super::library::Library;

/// Video containers picked up by a folder import
const MEDIA_EXTENSIONS: [&str; 7] = ["mp4", "m4v", "mov", "webm", "mkv", "avi", "ogv"];

/// Image files next to a video that can serve as its cover
const COVER_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Result of a folder import operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub skipped_count: usize,
}

async fn with_library<T, F>(db_path: PathBuf, job: F) -> Result<T, Arc<LibraryError>>
where
    T: Send + 'static,
    F: FnOnce(&Library) -> Result<T, LibraryError> + Send + 'static,
{
    task::spawn_blocking(move || {
        let library = Library::open(&db_path)?;
        job(&library)
    })
    .await
    .map_err(|e| LibraryError::Worker(e.to_string()))
    .and_then(|result| result)
    .map_err(Arc::new)
}

/// Fetch one page, retrying up to `retries` more times on failure
pub async fn fetch_page(
    db_path: PathBuf,
    cursor: Option<Cursor>,
    page_size: usize,
    retries: u32,
) -> Result<Page, Arc<LibraryError>> {
    let mut attempt = 0;
    loop {
        let path = db_path.clone();
        let after = cursor.clone();
        let result = with_library(path, move |library| {
            library.fetch_page(after.as_ref(), page_size)
        })
        .await;

        match result {
            Err(e) if attempt < retries => {
                attempt += 1;
                log::warn!("⚠️  Page fetch failed ({e}), retrying ({attempt}/{retries})");
            }
            other => return other,
        }
    }
}

/// Look up the latest version of a record
pub async fn fetch_record(
    db_path: PathBuf,
    id: String,
) -> Result<Option<Record>, Arc<LibraryError>> {
    with_library(db_path, move |library| library.fetch_record(&id)).await
}

/// Store a regenerated cover and read the record back
pub async fn store_cover(
    db_path: PathBuf,
    id: String,
    cover_url: String,
) -> Result<Option<Record>, Arc<LibraryError>> {
    with_library(db_path, move |library| {
        library.set_cover_url(&id, &cover_url)?;
        library.fetch_record(&id)
    })
    .await
}

/// Register every video found under `folder_path` as a record
pub async fn import_folder(
    folder_path: PathBuf,
    db_path: PathBuf,
) -> Result<ImportResult, Arc<LibraryError>> {
    with_library(db_path, move |library| import_folder_blocking(&folder_path, library)).await
}

fn import_folder_blocking(
    folder_path: &Path,
    library: &Library,
) -> Result<ImportResult, LibraryError> {
    let mut result = ImportResult::default();
    log::info!("🔍 Scanning folder: {}", folder_path.display());

    // Walk the directory tree recursively
    for entry in WalkDir::new(folder_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !has_extension(path, &MEDIA_EXTENSIONS) {
            continue;
        }

        let Some(id) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        let created_at = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let record = Record {
            id,
            media_url: Some(path.to_string_lossy().to_string()),
            cover_url: sibling_cover(path).map(|p| p.to_string_lossy().to_string()),
            created_at,
        };

        if library.insert_record(&record)? {
            result.imported_count += 1;
            if result.imported_count % 100 == 0 {
                log::info!("⏳ Imported {} files...", result.imported_count);
            }
        } else {
            result.skipped_count += 1;
        }
    }

    log::info!(
        "✅ Import complete: {} new, {} skipped",
        result.imported_count,
        result.skipped_count
    );
    Ok(result)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn sibling_cover(video: &Path) -> Option<PathBuf> {
    COVER_EXTENSIONS
        .iter()
        .map(|ext| video.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
