/// State management module
///
/// This module handles the catalog side of the application:
/// - Database connections and keyset queries (library.rs)
/// - Async access from the UI runtime (source.rs)
/// - Shared data structures (data.rs)
/// - User configuration (config.rs)
/// - Error types (error.rs)

pub mod config;
pub mod data;
pub mod error;
pub mod library;
pub mod source;
