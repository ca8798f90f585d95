//! SQLite adapter for the persistence port (§6).
//!
//! One connection behind a `&mut self` borrow, which is how the
//! scheduler already serialises writers (a single owning task holds
//! the `Box<dyn Storage>` and is messaged results to persist).

use crate::analysis::{CrawlStatus, Fetch, Issue, IssueKind, IssueSeverity, Link, RedirectChain, RedirectHop, Resource, ResourceKind};
use crate::extract::{Heading, ImageFact, PageFacts, ScriptFact};
use crate::storage::schema::SCHEMA_SQL;
use crate::storage::traits::{
    FetchRecord, IssueRecord, LinkRecord, NewUrl, PageFactsRecord, RedirectChainRecord,
    ResourceRecord, SessionProgress, SessionRecord, SessionStatus, Storage, StorageError,
    StorageResult, StorageStats, UrlRecord,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }
}

fn status_to_db(status: CrawlStatus) -> &'static str {
    match status {
        CrawlStatus::Pending => "pending",
        CrawlStatus::Crawled => "crawled",
        CrawlStatus::Failed => "failed",
        CrawlStatus::Skipped => "skipped",
    }
}

fn status_from_db(s: &str) -> CrawlStatus {
    match s {
        "crawled" => CrawlStatus::Crawled,
        "failed" => CrawlStatus::Failed,
        "skipped" => CrawlStatus::Skipped,
        _ => CrawlStatus::Pending,
    }
}

fn kind_to_db(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Image => "image",
        ResourceKind::Script => "script",
        ResourceKind::Stylesheet => "stylesheet",
        ResourceKind::Iframe => "iframe",
        ResourceKind::Video => "video",
        ResourceKind::Audio => "audio",
    }
}

fn kind_from_db(s: &str) -> Option<ResourceKind> {
    match s {
        "image" => Some(ResourceKind::Image),
        "script" => Some(ResourceKind::Script),
        "stylesheet" => Some(ResourceKind::Stylesheet),
        "iframe" => Some(ResourceKind::Iframe),
        "video" => Some(ResourceKind::Video),
        "audio" => Some(ResourceKind::Audio),
        _ => None,
    }
}

fn severity_to_db(s: IssueSeverity) -> &'static str {
    match s {
        IssueSeverity::Low => "low",
        IssueSeverity::Medium => "medium",
        IssueSeverity::High => "high",
        IssueSeverity::Critical => "critical",
    }
}

fn severity_from_db(s: &str) -> IssueSeverity {
    match s {
        "medium" => IssueSeverity::Medium,
        "high" => IssueSeverity::High,
        "critical" => IssueSeverity::Critical,
        _ => IssueSeverity::Low,
    }
}

fn issue_kind_to_db(k: IssueKind) -> &'static str {
    match k {
        IssueKind::Notice => "notice",
        IssueKind::Warning => "warning",
        IssueKind::Error => "error",
    }
}

fn issue_kind_from_db(s: &str) -> IssueKind {
    match s {
        "warning" => IssueKind::Warning,
        "error" => IssueKind::Error,
        _ => IssueKind::Notice,
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    s.parse().unwrap_or_else(|_| Utc::now())
}

fn row_to_url(row: &rusqlite::Row) -> rusqlite::Result<UrlRecord> {
    Ok(UrlRecord {
        id: row.get(0)?,
        normalized: row.get(1)?,
        raw: row.get(2)?,
        host: row.get(3)?,
        depth: row.get::<_, i64>(4)? as u32,
        discovered_from: row.get(5)?,
        is_internal: row.get::<_, i64>(6)? != 0,
        status: status_from_db(&row.get::<_, String>(7)?),
        first_seen: parse_dt(&row.get::<_, String>(8)?),
        last_seen: parse_dt(&row.get::<_, String>(9)?),
    })
}

const URL_COLUMNS: &str =
    "id, normalized, raw, host, depth, discovered_from, is_internal, status, first_seen, last_seen";

impl Storage for SqliteStorage {
    // ===== URLs =====

    fn insert_url(&mut self, url: &NewUrl) -> StorageResult<i64> {
        if let Some(existing) = self.get_url_by_normalized(&url.normalized)? {
            return Ok(existing.id);
        }
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO urls (normalized, raw, host, depth, discovered_from, is_internal, status, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                url.normalized,
                url.raw,
                url.host,
                url.depth,
                url.discovered_from,
                url.is_internal as i64,
                status_to_db(CrawlStatus::Pending),
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_url_by_normalized(&self, normalized: &str) -> StorageResult<Option<UrlRecord>> {
        let sql = format!("SELECT {URL_COLUMNS} FROM urls WHERE normalized = ?1");
        self.conn
            .query_row(&sql, params![normalized], row_to_url)
            .optional()
            .map_err(Into::into)
    }

    fn update_url_status(&mut self, id: i64, status: CrawlStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE urls SET status = ?1, last_seen = ?2 WHERE id = ?3",
            params![status_to_db(status), now, id],
        )?;
        Ok(())
    }

    fn get_all_urls(&self) -> StorageResult<Vec<UrlRecord>> {
        let sql = format!("SELECT {URL_COLUMNS} FROM urls ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_url)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_url_by_id(&self, id: i64) -> StorageResult<Option<UrlRecord>> {
        let sql = format!("SELECT {URL_COLUMNS} FROM urls WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], row_to_url)
            .optional()
            .map_err(Into::into)
    }

    fn get_url_by_address(&self, address: &str) -> StorageResult<Option<UrlRecord>> {
        let sql = format!("SELECT {URL_COLUMNS} FROM urls WHERE normalized = ?1 OR raw = ?1");
        self.conn
            .query_row(&sql, params![address], row_to_url)
            .optional()
            .map_err(Into::into)
    }

    // ===== Fetches =====

    fn insert_fetch(
        &mut self,
        url_id: i64,
        fetch: &Fetch,
        retry_count: u32,
        error: Option<&str>,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let headers_json = serde_json::to_string(&fetch.headers)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO fetches (url_id, final_url, status_code, content_type, body_size, truncated,
             ttfb_ms, total_time_ms, headers_json, retry_count, error, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                url_id,
                fetch.final_url,
                fetch.status as i64,
                fetch.content_type,
                fetch.body_size as i64,
                fetch.truncated as i64,
                fetch.ttfb.as_millis() as i64,
                fetch.total_time.as_millis() as i64,
                headers_json,
                retry_count,
                error,
                now,
            ],
        )?;
        let fetch_id = self.conn.last_insert_rowid();

        if !fetch.redirect_chain.is_empty() {
            let hops: Vec<(String, String, u16)> = fetch
                .redirect_chain
                .hops
                .iter()
                .map(|h| (h.from.clone(), h.to.clone(), h.status))
                .collect();
            let hops_json =
                serde_json::to_string(&hops).map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.conn.execute(
                "INSERT INTO redirect_chains (fetch_id, start_url, final_url, hops_json, length, has_loop)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    fetch_id,
                    fetch.url,
                    fetch.final_url,
                    hops_json,
                    fetch.redirect_chain.len() as i64,
                    fetch.redirect_chain.has_loop() as i64,
                ],
            )?;
        }

        Ok(fetch_id)
    }

    fn get_latest_fetch(&self, url_id: i64) -> StorageResult<Option<FetchRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url_id, final_url, status_code, content_type, body_size, truncated,
             ttfb_ms, total_time_ms, headers_json, retry_count, error
             FROM fetches WHERE url_id = ?1 ORDER BY id DESC LIMIT 1",
        )?;
        let url_raw: Option<String> = self
            .conn
            .query_row("SELECT raw FROM urls WHERE id = ?1", params![url_id], |r| r.get(0))
            .optional()?;
        let Some(url_raw) = url_raw else { return Ok(None) };

        let rec = stmt
            .query_row(params![url_id], |row| {
                let headers_json: String = row.get(9)?;
                let headers = serde_json::from_str(&headers_json).unwrap_or_default();
                Ok(FetchRecord {
                    id: row.get(0)?,
                    url_id: row.get(1)?,
                    fetch: Fetch {
                        url: url_raw.clone(),
                        final_url: row.get(2)?,
                        status: row.get::<_, i64>(3)? as u16,
                        headers,
                        redirect_chain: RedirectChain::default(),
                        ttfb: std::time::Duration::from_millis(row.get::<_, i64>(7)? as u64),
                        total_time: std::time::Duration::from_millis(row.get::<_, i64>(8)? as u64),
                        body_size: row.get::<_, i64>(5)? as u64,
                        truncated: row.get::<_, i64>(6)? != 0,
                        content_type: row.get(4)?,
                    },
                    retry_count: row.get::<_, i64>(10)? as u32,
                    error: row.get(11)?,
                })
            })
            .optional()?;
        Ok(rec)
    }

    fn get_redirect_chains(&self) -> StorageResult<Vec<RedirectChainRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fetch_id, start_url, final_url, hops_json, length, has_loop FROM redirect_chains",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let hops_json: String = row.get(4)?;
                let raw_hops: Vec<(String, String, u16)> =
                    serde_json::from_str(&hops_json).unwrap_or_default();
                let hops = raw_hops
                    .into_iter()
                    .map(|(from, to, status)| RedirectHop { from, to, status })
                    .collect();
                Ok(RedirectChainRecord {
                    id: row.get(0)?,
                    fetch_id: row.get(1)?,
                    start_url: row.get(2)?,
                    final_url: row.get(3)?,
                    chain: RedirectChain { hops },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Page facts =====

    fn insert_page_facts(&mut self, url_id: i64, facts: &PageFacts) -> StorageResult<i64> {
        let hreflangs_json = serde_json::to_string(&facts.hreflangs)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let og_json =
            serde_json::to_string(&facts.og).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let headings: Vec<(u8, String)> = facts
            .headings
            .iter()
            .map(|h| (h.level, h.text.clone()))
            .collect();
        let headings_json =
            serde_json::to_string(&headings).map_err(|e| StorageError::Serialization(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO page_facts (url_id, title, meta_description, meta_keywords, meta_robots,
             canonical, word_count, content_hash, language, hreflangs_json, og_json, headings_json, truncated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(url_id) DO UPDATE SET
                title = excluded.title, meta_description = excluded.meta_description,
                meta_keywords = excluded.meta_keywords, meta_robots = excluded.meta_robots,
                canonical = excluded.canonical, word_count = excluded.word_count,
                content_hash = excluded.content_hash, language = excluded.language,
                hreflangs_json = excluded.hreflangs_json, og_json = excluded.og_json,
                headings_json = excluded.headings_json, truncated = excluded.truncated",
            params![
                url_id,
                facts.title,
                facts.meta_description,
                facts.meta_keywords,
                facts.meta_robots,
                facts.canonical,
                facts.word_count as i64,
                facts.content_hash,
                Option::<String>::None,
                hreflangs_json,
                og_json,
                headings_json,
                facts.truncated as i64,
            ],
        )?;
        Ok(url_id)
    }

    fn get_page_facts(&self, url_id: i64) -> StorageResult<Option<PageFactsRecord>> {
        let rec = self
            .conn
            .query_row(
                "SELECT title, meta_description, meta_keywords, meta_robots, canonical, word_count,
                 content_hash, hreflangs_json, og_json, headings_json, truncated
                 FROM page_facts WHERE url_id = ?1",
                params![url_id],
                |row| {
                    let hreflangs_json: String = row.get(7)?;
                    let hreflangs = serde_json::from_str(&hreflangs_json).unwrap_or_default();
                    let og_json: String = row.get(8)?;
                    let og = serde_json::from_str(&og_json).unwrap_or_default();
                    let headings_json: String = row.get(9)?;
                    let raw_headings: Vec<(u8, String)> =
                        serde_json::from_str(&headings_json).unwrap_or_default();
                    let headings = raw_headings
                        .into_iter()
                        .map(|(level, text)| Heading { level, text })
                        .collect();
                    Ok(PageFactsRecord {
                        url_id,
                        facts: PageFacts {
                            title: row.get(0)?,
                            meta_description: row.get(1)?,
                            meta_keywords: row.get(2)?,
                            meta_robots: row.get(3)?,
                            canonical: row.get(4)?,
                            word_count: row.get::<_, i64>(5)? as usize,
                            content_hash: row.get(6)?,
                            hreflangs,
                            og,
                            headings,
                            truncated: row.get::<_, i64>(10)? != 0,
                            ..PageFacts::default()
                        },
                    })
                },
            )
            .optional()?;
        Ok(rec)
    }

    // ===== Links =====

    fn insert_link(&mut self, from_url_id: i64, to_url_id: Option<i64>, link: &Link) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO links (from_url_id, to_raw, to_url_id, anchor_text, is_internal, is_follow, target_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                from_url_id,
                link.to_url,
                to_url_id,
                link.anchor_text,
                link.is_internal as i64,
                link.is_follow as i64,
                link.target_status,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_links(&mut self, links: &[(i64, Option<i64>, Link)]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for (from_url_id, to_url_id, link) in links {
            tx.execute(
                "INSERT INTO links (from_url_id, to_raw, to_url_id, anchor_text, is_internal, is_follow, target_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    from_url_id,
                    link.to_url,
                    to_url_id,
                    link.anchor_text,
                    link.is_internal as i64,
                    link.is_follow as i64,
                    link.target_status,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_all_links(&self) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.from_url_id, l.to_url_id, l.to_raw, l.anchor_text, l.is_internal,
             l.is_follow, l.target_status, u.raw
             FROM links l JOIN urls u ON u.id = l.from_url_id",
        )?;
        let rows = stmt.query_map([], row_to_link)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_inlinks(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.from_url_id, l.to_url_id, l.to_raw, l.anchor_text, l.is_internal,
             l.is_follow, l.target_status, u.raw
             FROM links l JOIN urls u ON u.id = l.from_url_id
             WHERE l.to_url_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![url_id], row_to_link)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_outlinks(&self, url_id: i64) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.from_url_id, l.to_url_id, l.to_raw, l.anchor_text, l.is_internal,
             l.is_follow, l.target_status, u.raw
             FROM links l JOIN urls u ON u.id = l.from_url_id
             WHERE l.from_url_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![url_id], row_to_link)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Resources =====

    fn insert_resource(&mut self, resource: &Resource) -> StorageResult<i64> {
        let kind = resource.kind.map(kind_to_db);
        self.conn.execute(
            "INSERT INTO resources (resource_url, kind, mime, status_code, bytes, alt, width, height, is_async, is_defer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(resource_url) DO UPDATE SET
                kind = excluded.kind, mime = excluded.mime, status_code = excluded.status_code,
                bytes = excluded.bytes, alt = excluded.alt, width = excluded.width,
                height = excluded.height, is_async = excluded.is_async, is_defer = excluded.is_defer",
            params![
                resource.url,
                kind,
                resource.mime,
                resource.status,
                resource.bytes.map(|b| b as i64),
                resource.alt,
                resource.width,
                resource.height,
                resource.is_async as i64,
                resource.defer as i64,
            ],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM resources WHERE resource_url = ?1",
            params![resource.url],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn link_page_resource(&mut self, url_id: i64, resource_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO page_resources (url_id, resource_id) VALUES (?1, ?2)",
            params![url_id, resource_id],
        )?;
        Ok(())
    }

    fn get_all_resources(&self) -> StorageResult<Vec<ResourceRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, resource_url, kind, mime, status_code, bytes, alt, width, height, is_async, is_defer
             FROM resources",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind_str: Option<String> = row.get(2)?;
                Ok(ResourceRecord {
                    id: row.get(0)?,
                    resource: Resource {
                        kind: kind_str.as_deref().and_then(kind_from_db),
                        url: row.get(1)?,
                        page_url: String::new(),
                        mime: row.get(3)?,
                        status: row.get(4)?,
                        bytes: row.get::<_, Option<i64>>(5)?.map(|b| b as u64),
                        alt: row.get(6)?,
                        width: row.get(7)?,
                        height: row.get(8)?,
                        is_async: row.get::<_, i64>(9)? != 0,
                        defer: row.get::<_, i64>(10)? != 0,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Issues =====

    fn insert_issue(&mut self, issue: &Issue) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO issues (url, category, code, severity, kind, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                issue.url,
                issue.category,
                issue.code,
                severity_to_db(issue.severity),
                issue_kind_to_db(issue.kind),
                issue.message,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_all_issues(&self) -> StorageResult<Vec<IssueRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, url, category, code, severity, kind, message, created_at FROM issues")?;
        let rows = stmt
            .query_map([], |row| {
                let category: String = row.get(2)?;
                let code: String = row.get(3)?;
                Ok(IssueRecord {
                    id: row.get(0)?,
                    issue: Issue {
                        url: row.get(1)?,
                        category: Box::leak(category.into_boxed_str()),
                        code: Box::leak(code.into_boxed_str()),
                        severity: severity_from_db(&row.get::<_, String>(4)?),
                        kind: issue_kind_from_db(&row.get::<_, String>(5)?),
                        message: row.get(6)?,
                    },
                    created_at: parse_dt(&row.get::<_, String>(7)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Sessions =====

    fn create_session(&mut self, seeds: &[String], config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let seeds_json =
            serde_json::to_string(seeds).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO sessions (seeds_json, config_hash, status, started_at, checkpoint_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![seeds_json, config_hash, SessionStatus::Running.as_db_str(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_session_progress(&mut self, id: i64, progress: &SessionProgress) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sessions SET crawled_count = ?1, failed_count = ?2, skipped_count = ?3,
             queued_count = ?4, checkpoint_at = ?5 WHERE id = ?6",
            params![
                progress.crawled_count as i64,
                progress.failed_count as i64,
                progress.skipped_count as i64,
                progress.queued_count as i64,
                now,
                id,
            ],
        )?;
        Ok(())
    }

    fn complete_session(&mut self, id: i64, status: SessionStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sessions SET status = ?1, completed_at = ?2, checkpoint_at = ?2 WHERE id = ?3",
            params![status.as_db_str(), now, id],
        )?;
        Ok(())
    }

    fn get_session(&self, id: i64) -> StorageResult<Option<SessionRecord>> {
        self.conn
            .query_row(
                "SELECT id, seeds_json, config_hash, status, started_at, checkpoint_at, completed_at,
                 crawled_count, failed_count, skipped_count, queued_count FROM sessions WHERE id = ?1",
                params![id],
                row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>> {
        self.conn
            .query_row(
                "SELECT id, seeds_json, config_hash, status, started_at, checkpoint_at, completed_at,
                 crawled_count, failed_count, skipped_count, queued_count FROM sessions ORDER BY id DESC LIMIT 1",
                [],
                row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    // ===== Stats =====

    fn stats(&self) -> StorageResult<StorageStats> {
        let mut stats = StorageStats::default();
        stats.urls_total = self.conn.query_row("SELECT COUNT(*) FROM urls", [], |r| r.get::<_, i64>(0))? as u64;
        stats.urls_crawled = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status_to_db(CrawlStatus::Crawled)],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.urls_failed = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status_to_db(CrawlStatus::Failed)],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.urls_skipped = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status_to_db(CrawlStatus::Skipped)],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.urls_pending = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status_to_db(CrawlStatus::Pending)],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.issues_total = self.conn.query_row("SELECT COUNT(*) FROM issues", [], |r| r.get::<_, i64>(0))? as u64;
        stats.issues_critical = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE severity = 'critical'",
            [],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.issues_high = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE severity = 'high'",
            [],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.issues_medium = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE severity = 'medium'",
            [],
            |r| r.get::<_, i64>(0),
        )? as u64;
        stats.issues_low = self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE severity = 'low'",
            [],
            |r| r.get::<_, i64>(0),
        )? as u64;
        Ok(stats)
    }
}

fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<LinkRecord> {
    let from_raw: String = row.get(8)?;
    Ok(LinkRecord {
        id: row.get(0)?,
        from_url_id: row.get(1)?,
        to_url_id: row.get(2)?,
        link: Link {
            from_url: from_raw,
            to_url: row.get(3)?,
            anchor_text: row.get(4)?,
            is_internal: row.get::<_, i64>(5)? != 0,
            is_follow: row.get::<_, i64>(6)? != 0,
            target_status: row.get::<_, Option<i64>>(7)?.map(|s| s as u16),
            target_is_redirect: false,
        },
    })
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<SessionRecord> {
    let seeds_json: String = row.get(1)?;
    let seeds: Vec<String> = serde_json::from_str(&seeds_json).unwrap_or_default();
    let completed_at: Option<String> = row.get(6)?;
    Ok(SessionRecord {
        id: row.get(0)?,
        seeds,
        config_hash: row.get(2)?,
        status: SessionStatus::from_db_str(&row.get::<_, String>(3)?),
        started_at: parse_dt(&row.get::<_, String>(4)?),
        checkpoint_at: parse_dt(&row.get::<_, String>(5)?),
        completed_at: completed_at.map(|s| parse_dt(&s)),
        crawled_count: row.get::<_, i64>(7)? as u64,
        failed_count: row.get::<_, i64>(8)? as u64,
        skipped_count: row.get::<_, i64>(9)? as u64,
        queued_count: row.get::<_, i64>(10)? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn new_url(normalized: &str) -> NewUrl {
        NewUrl {
            normalized: normalized.to_string(),
            raw: normalized.to_string(),
            host: "example.com".to_string(),
            depth: 0,
            discovered_from: None,
            is_internal: true,
        }
    }

    fn sample_fetch(url: &str) -> Fetch {
        Fetch {
            url: url.to_string(),
            final_url: url.to_string(),
            status: 200,
            headers: HashMap::new(),
            redirect_chain: RedirectChain::default(),
            ttfb: Duration::from_millis(50),
            total_time: Duration::from_millis(100),
            body_size: 1024,
            truncated: false,
            content_type: Some("text/html".into()),
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_insert_and_get_url() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.insert_url(&new_url("https://example.com/")).unwrap();
        assert!(id > 0);
        let record = storage.get_url_by_normalized("https://example.com/").unwrap().unwrap();
        assert_eq!(record.status, CrawlStatus::Pending);
    }

    #[test]
    fn test_insert_url_deduplicates_by_normalized() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id1 = storage.insert_url(&new_url("https://example.com/")).unwrap();
        let id2 = storage.insert_url(&new_url("https://example.com/")).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_update_url_status() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.insert_url(&new_url("https://example.com/")).unwrap();
        storage.update_url_status(id, CrawlStatus::Crawled).unwrap();
        let record = storage.get_url_by_id(id).unwrap().unwrap();
        assert_eq!(record.status, CrawlStatus::Crawled);
    }

    #[test]
    fn test_insert_fetch_and_get_latest() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url_id = storage.insert_url(&new_url("https://example.com/")).unwrap();
        storage
            .insert_fetch(url_id, &sample_fetch("https://example.com/"), 0, None)
            .unwrap();
        let latest = storage.get_latest_fetch(url_id).unwrap().unwrap();
        assert_eq!(latest.fetch.status, 200);
    }

    #[test]
    fn test_redirect_chain_persisted() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url_id = storage.insert_url(&new_url("https://example.com/a")).unwrap();
        let mut fetch = sample_fetch("https://example.com/a");
        fetch.redirect_chain = RedirectChain {
            hops: vec![RedirectHop {
                from: "https://example.com/a".into(),
                to: "https://example.com/b".into(),
                status: 301,
            }],
        };
        storage.insert_fetch(url_id, &fetch, 0, None).unwrap();
        let chains = storage.get_redirect_chains().unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].length(), 1);
    }

    #[test]
    fn test_page_facts_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url_id = storage.insert_url(&new_url("https://example.com/")).unwrap();
        let mut facts = PageFacts::default();
        facts.title = Some("Hello".into());
        facts.word_count = 10;
        storage.insert_page_facts(url_id, &facts).unwrap();
        let record = storage.get_page_facts(url_id).unwrap().unwrap();
        assert_eq!(record.facts.title, Some("Hello".into()));
        assert_eq!(record.facts.word_count, 10);
    }

    #[test]
    fn test_page_facts_overwritten_on_recrawl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url_id = storage.insert_url(&new_url("https://example.com/")).unwrap();
        let mut facts = PageFacts::default();
        facts.title = Some("First".into());
        storage.insert_page_facts(url_id, &facts).unwrap();
        facts.title = Some("Second".into());
        storage.insert_page_facts(url_id, &facts).unwrap();
        let record = storage.get_page_facts(url_id).unwrap().unwrap();
        assert_eq!(record.facts.title, Some("Second".into()));
    }

    #[test]
    fn test_insert_link_and_get_inlinks() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let from_id = storage.insert_url(&new_url("https://example.com/a")).unwrap();
        let to_id = storage.insert_url(&new_url("https://example.com/b")).unwrap();
        let link = Link {
            from_url: "https://example.com/a".into(),
            to_url: "https://example.com/b".into(),
            anchor_text: "b".into(),
            is_internal: true,
            is_follow: true,
            target_status: Some(200),
            target_is_redirect: false,
        };
        storage.insert_link(from_id, Some(to_id), &link).unwrap();
        let inlinks = storage.get_inlinks(to_id).unwrap();
        assert_eq!(inlinks.len(), 1);
        assert_eq!(inlinks[0].link.anchor_text, "b");
    }

    #[test]
    fn test_resource_upsert() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let resource = Resource::image("https://example.com/", "https://example.com/a.jpg");
        let id1 = storage.insert_resource(&resource).unwrap();
        let id2 = storage.insert_resource(&resource).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_issue_insert_and_list() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let issue = Issue::new(
            "https://example.com/",
            "titles",
            "title-missing",
            IssueSeverity::High,
            IssueKind::Error,
            "no title",
        );
        storage.insert_issue(&issue).unwrap();
        let issues = storage.get_all_issues().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue.code, "title-missing");
    }

    #[test]
    fn test_session_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_session(&["https://example.com/".to_string()], "hash1")
            .unwrap();
        storage
            .update_session_progress(
                id,
                &SessionProgress {
                    crawled_count: 5,
                    ..Default::default()
                },
            )
            .unwrap();
        storage.complete_session(id, SessionStatus::Completed).unwrap();
        let session = storage.get_session(id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.crawled_count, 5);
        assert!(session.completed_at.is_some());
    }

    #[test]
    fn test_stats_counts_by_status() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.insert_url(&new_url("https://example.com/a")).unwrap();
        let _b = storage.insert_url(&new_url("https://example.com/b")).unwrap();
        storage.update_url_status(a, CrawlStatus::Crawled).unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.urls_total, 2);
        assert_eq!(stats.urls_crawled, 1);
        assert_eq!(stats.urls_pending, 1);
    }
}
