//! The persistence port (§6) and its SQLite adapter.
//!
//! `Storage` is the only contract the scheduler and output stage write
//! and read through; `schema`/`sqlite` are an implementation detail
//! behind it.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{
    FetchRecord, IssueRecord, LinkRecord, NewUrl, PageFactsRecord, RedirectChainRecord,
    ResourceRecord, SessionProgress, SessionRecord, SessionStatus, Storage, StorageError,
    StorageResult, StorageStats, UrlRecord,
};

use std::path::Path;

/// Opens (creating if absent) a SQLite-backed persistence port at `path`.
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}
