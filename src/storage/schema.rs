//! Database schema for the persistence port's SQLite adapter.
//!
//! The schema is an implementation detail of this adapter, not part of
//! the port contract (§1's "on-disk schema DDL" is explicitly out of
//! scope for the core); nothing outside `storage::sqlite` should depend
//! on column names or table shapes here.

/// SQL schema for the database.
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl session (§3 Session).
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seeds_json TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    checkpoint_at TEXT NOT NULL,
    completed_at TEXT,
    crawled_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0,
    skipped_count INTEGER NOT NULL DEFAULT 0,
    queued_count INTEGER NOT NULL DEFAULT 0
);

-- Every URL ever observed, keyed by its normalized dedup form (§3 URL).
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    normalized TEXT NOT NULL UNIQUE,
    raw TEXT NOT NULL,
    host TEXT NOT NULL,
    depth INTEGER NOT NULL,
    discovered_from TEXT,
    is_internal INTEGER NOT NULL,
    status TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_urls_host ON urls(host);
CREATE INDEX IF NOT EXISTS idx_urls_status ON urls(status);

-- One row per fetch attempt (§3 Fetch); immutable once written.
CREATE TABLE IF NOT EXISTS fetches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(id),
    final_url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    body_size INTEGER NOT NULL,
    truncated INTEGER NOT NULL,
    ttfb_ms INTEGER NOT NULL,
    total_time_ms INTEGER NOT NULL,
    headers_json TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fetches_url ON fetches(url_id);

-- Redirect chains observed by a fetch (§3 RedirectChain); one row per
-- chain, hops serialized since the core only needs the ordered list
-- back, not per-hop querying.
CREATE TABLE IF NOT EXISTS redirect_chains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fetch_id INTEGER NOT NULL REFERENCES fetches(id),
    start_url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    hops_json TEXT NOT NULL,
    length INTEGER NOT NULL,
    has_loop INTEGER NOT NULL
);

-- Per-URL SEO extraction, overwritten on re-crawl (§3 PageFacts: "at
-- most one PageFacts row exists" per URL).
CREATE TABLE IF NOT EXISTS page_facts (
    url_id INTEGER PRIMARY KEY REFERENCES urls(id),
    title TEXT,
    meta_description TEXT,
    meta_keywords TEXT,
    meta_robots TEXT,
    canonical TEXT,
    word_count INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    language TEXT,
    hreflangs_json TEXT NOT NULL,
    og_json TEXT NOT NULL,
    headings_json TEXT NOT NULL,
    truncated INTEGER NOT NULL
);

-- Links discovered on a page (§3 Link); immutable per fetch.
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_url_id INTEGER NOT NULL REFERENCES urls(id),
    to_raw TEXT NOT NULL,
    to_url_id INTEGER REFERENCES urls(id),
    anchor_text TEXT NOT NULL,
    is_internal INTEGER NOT NULL,
    is_follow INTEGER NOT NULL,
    target_status INTEGER
);

CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_url_id);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(to_url_id);

-- Images/scripts/stylesheets/etc. (§3 Resource); upsert on observation.
CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_url TEXT NOT NULL UNIQUE,
    kind TEXT,
    mime TEXT,
    status_code INTEGER,
    bytes INTEGER,
    alt TEXT,
    width TEXT,
    height TEXT,
    is_async INTEGER NOT NULL,
    is_defer INTEGER NOT NULL
);

-- Join table: which pages reference which resources.
CREATE TABLE IF NOT EXISTS page_resources (
    url_id INTEGER NOT NULL REFERENCES urls(id),
    resource_id INTEGER NOT NULL REFERENCES resources(id),
    PRIMARY KEY (url_id, resource_id)
);

-- Append-only issue log (§3 Issue).
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    category TEXT NOT NULL,
    code TEXT NOT NULL,
    severity TEXT NOT NULL,
    kind TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_issues_url ON issues(url);
CREATE INDEX IF NOT EXISTS idx_issues_code ON issues(code);
"#;
