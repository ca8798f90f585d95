//! The persistence port (§6): the only storage contract the analyzers
//! and scheduler write through. Implementations must serialise
//! concurrent writers and give linearizable reads of their own writes;
//! no cross-method transactions are required of the port.

use crate::analysis::{CrawlStatus, Fetch, Issue, Link, RedirectChain, Resource};
use crate::extract::PageFacts;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a persistence port implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("url not found: {0}")]
    UrlNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(i64),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Everything needed to admit a new URL row; mirrors `push`'s inputs on
/// the frontier side without duplicating frontier bookkeeping.
#[derive(Debug, Clone)]
pub struct NewUrl {
    pub normalized: String,
    pub raw: String,
    pub host: String,
    pub depth: u32,
    pub discovered_from: Option<String>,
    pub is_internal: bool,
}

/// §3's URL entity.
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: i64,
    pub normalized: String,
    pub raw: String,
    pub host: String,
    pub depth: u32,
    pub discovered_from: Option<String>,
    pub is_internal: bool,
    pub status: CrawlStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// §3's Fetch entity, with its assigned id and the url it belongs to.
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub id: i64,
    pub url_id: i64,
    pub fetch: Fetch,
    pub retry_count: u32,
    pub error: Option<String>,
}

/// §3's RedirectChain entity.
#[derive(Debug, Clone)]
pub struct RedirectChainRecord {
    pub id: i64,
    pub fetch_id: i64,
    pub start_url: String,
    pub final_url: String,
    pub chain: RedirectChain,
}

impl RedirectChainRecord {
    pub fn length(&self) -> usize {
        self.chain.len()
    }
    pub fn has_loop(&self) -> bool {
        self.chain.has_loop()
    }
}

/// §3's PageFacts entity, keyed by url id.
#[derive(Debug, Clone)]
pub struct PageFactsRecord {
    pub url_id: i64,
    pub facts: PageFacts,
}

/// §3's Link entity, with the target url id resolved when known.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub id: i64,
    pub from_url_id: i64,
    pub to_url_id: Option<i64>,
    pub link: Link,
}

/// §3's Resource entity.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub id: i64,
    pub resource: Resource,
}

/// §3's Issue entity, with its assigned id and timestamp.
#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub id: i64,
    pub issue: Issue,
    pub created_at: DateTime<Utc>,
}

/// §3's Session entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub seeds: Vec<String>,
    pub config_hash: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub checkpoint_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub crawled_count: u64,
    pub failed_count: u64,
    pub skipped_count: u64,
    pub queued_count: u64,
}

/// A session's running counters, as reported by the scheduler at each
/// checkpoint interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionProgress {
    pub crawled_count: u64,
    pub failed_count: u64,
    pub skipped_count: u64,
    pub queued_count: u64,
}

/// Aggregate counters returned by `stats()`.
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub urls_total: u64,
    pub urls_crawled: u64,
    pub urls_failed: u64,
    pub urls_skipped: u64,
    pub urls_pending: u64,
    pub issues_total: u64,
    pub issues_critical: u64,
    pub issues_high: u64,
    pub issues_medium: u64,
    pub issues_low: u64,
}

/// The persistence port (§6). An ordinary (non-async) trait: the
/// reference SQLite adapter is synchronous internally and is invoked
/// from worker tasks via `spawn_blocking`-style offload, so a future
/// async backend remains free to wrap the same trait shape.
pub trait Storage: Send {
    // ===== URLs =====
    fn insert_url(&mut self, url: &NewUrl) -> StorageResult<i64>;
    fn get_url_by_normalized(&self, normalized: &str) -> StorageResult<Option<UrlRecord>>;
    fn update_url_status(&mut self, id: i64, status: CrawlStatus) -> StorageResult<()>;
    fn get_all_urls(&self) -> StorageResult<Vec<UrlRecord>>;
    fn get_url_by_id(&self, id: i64) -> StorageResult<Option<UrlRecord>>;
    /// Looks a URL up by either its raw or normalized form.
    fn get_url_by_address(&self, address: &str) -> StorageResult<Option<UrlRecord>>;

    // ===== Fetches =====
    fn insert_fetch(
        &mut self,
        url_id: i64,
        fetch: &Fetch,
        retry_count: u32,
        error: Option<&str>,
    ) -> StorageResult<i64>;
    fn get_latest_fetch(&self, url_id: i64) -> StorageResult<Option<FetchRecord>>;
    fn get_redirect_chains(&self) -> StorageResult<Vec<RedirectChainRecord>>;

    // ===== Page facts =====
    fn insert_page_facts(&mut self, url_id: i64, facts: &PageFacts) -> StorageResult<i64>;
    fn get_page_facts(&self, url_id: i64) -> StorageResult<Option<PageFactsRecord>>;

    // ===== Links =====
    fn insert_link(&mut self, from_url_id: i64, to_url_id: Option<i64>, link: &Link) -> StorageResult<i64>;
    fn insert_links(
        &mut self,
        links: &[(i64, Option<i64>, Link)],
    ) -> StorageResult<()>;
    fn get_all_links(&self) -> StorageResult<Vec<LinkRecord>>;
    fn get_inlinks(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>>;
    fn get_outlinks(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>>;

    // ===== Resources =====
    fn insert_resource(&mut self, resource: &Resource) -> StorageResult<i64>;
    fn link_page_resource(&mut self, url_id: i64, resource_id: i64) -> StorageResult<()>;
    fn get_all_resources(&self) -> StorageResult<Vec<ResourceRecord>>;

    // ===== Issues =====
    fn insert_issue(&mut self, issue: &Issue) -> StorageResult<i64>;
    fn get_all_issues(&self) -> StorageResult<Vec<IssueRecord>>;

    // ===== Sessions =====
    fn create_session(&mut self, seeds: &[String], config_hash: &str) -> StorageResult<i64>;
    fn update_session_progress(&mut self, id: i64, progress: &SessionProgress) -> StorageResult<()>;
    fn complete_session(&mut self, id: i64, status: SessionStatus) -> StorageResult<()>;
    fn get_session(&self, id: i64) -> StorageResult<Option<SessionRecord>>;
    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>>;

    // ===== Aggregate stats =====
    fn stats(&self) -> StorageResult<StorageStats>;
}
