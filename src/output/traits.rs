//! Crawl summary types: the shape [`stats`] and [`markdown`] render,
//! assembled in [`super::generate_summary`] from a closed-out
//! [`Storage`](crate::storage::Storage) session.

use crate::analysis::IssueSeverity;
use crate::storage::{SessionRecord, SessionStatus};
use std::collections::HashMap;

/// Summary statistics for one crawl session, assembled from its closing
/// [`SessionRecord`] plus the storage port's aggregate queries.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Session metadata
    pub session_id: i64,
    pub seeds: Vec<String>,
    pub config_hash: String,
    pub status: SessionStatusLabel,
    pub started_at: String,
    pub checkpoint_at: String,
    pub completed_at: Option<String>,

    // URL counters
    pub urls_total: u64,
    pub urls_crawled: u64,
    pub urls_failed: u64,
    pub urls_skipped: u64,
    pub urls_pending: u64,

    // Issue counters
    pub issues_total: u64,
    pub issues_critical: u64,
    pub issues_high: u64,
    pub issues_medium: u64,
    pub issues_low: u64,
    pub issues_by_category: Vec<(String, u64)>,

    // Link graph
    pub total_links: u64,
    pub unique_hosts: u64,

    // Redirect chains
    pub redirect_chains_total: u64,
    pub redirect_chains_with_loops: u64,
    pub longest_redirect_chain: usize,

    // Depth breakdown (depth -> count)
    pub depth_breakdown: HashMap<u32, u64>,
}

/// A session's terminal status, kept separate from [`SessionStatus`] so
/// this module doesn't need to reach into storage internals to print one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatusLabel {
    #[default]
    Running,
    Paused,
    Completed,
    Failed,
}

impl From<SessionStatus> for SessionStatusLabel {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Running => Self::Running,
            SessionStatus::Paused => Self::Paused,
            SessionStatus::Completed => Self::Completed,
            SessionStatus::Failed => Self::Failed,
        }
    }
}

impl std::fmt::Display for SessionStatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a summary's session-metadata fields from its session record.
    pub fn from_session(session: &SessionRecord) -> Self {
        Self {
            session_id: session.id,
            seeds: session.seeds.clone(),
            config_hash: session.config_hash.clone(),
            status: session.status.into(),
            started_at: session.started_at.to_rfc3339(),
            checkpoint_at: session.checkpoint_at.to_rfc3339(),
            completed_at: session.completed_at.map(|dt| dt.to_rfc3339()),
            ..Default::default()
        }
    }

    /// Terminal URL count: everything no longer pending.
    pub fn total_terminal_urls(&self) -> u64 {
        self.urls_crawled + self.urls_failed + self.urls_skipped
    }

    pub fn success_rate(&self) -> f64 {
        let terminal = self.total_terminal_urls();
        if terminal == 0 {
            return 0.0;
        }
        (self.urls_crawled as f64 / terminal as f64) * 100.0
    }

    pub fn issue_rate_per_page(&self) -> f64 {
        if self.urls_crawled == 0 {
            return 0.0;
        }
        self.issues_total as f64 / self.urls_crawled as f64
    }
}

/// Severity bucket an issue counts toward, per §3's severity scale.
pub fn severity_bucket(severity: IssueSeverity) -> &'static str {
    match severity {
        IssueSeverity::Critical => "critical",
        IssueSeverity::High => "high",
        IssueSeverity::Medium => "medium",
        IssueSeverity::Low => "low",
    }
}
