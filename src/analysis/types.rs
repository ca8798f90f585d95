//! Shared records passed between the scheduler, the analyzer pipeline,
//! and the persistence port (§3, §4.9).

use crate::extract::PageFacts;
use crate::robots::RobotsDirectives;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Pending,
    Crawled,
    Failed,
    Skipped,
}

/// One redirect hop.
#[derive(Debug, Clone)]
pub struct RedirectHop {
    pub from: String,
    pub to: String,
    pub status: u16,
}

#[derive(Debug, Clone, Default)]
pub struct RedirectChain {
    pub hops: Vec<RedirectHop>,
}

impl RedirectChain {
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// A hop target repeated earlier in the chain.
    pub fn has_loop(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        for hop in &self.hops {
            if !seen.insert(hop.from.clone()) {
                return true;
            }
        }
        false
    }
}

/// The outcome of fetching one URL, independent of whether the body
/// was parsed successfully.
#[derive(Debug, Clone)]
pub struct Fetch {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub redirect_chain: RedirectChain,
    pub ttfb: Duration,
    pub total_time: Duration,
    pub body_size: u64,
    pub truncated: bool,
    pub content_type: Option<String>,
}

impl Fetch {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct Link {
    pub from_url: String,
    pub to_url: String,
    pub anchor_text: String,
    pub is_internal: bool,
    pub is_follow: bool,
    /// Known status of the target, when it has already been fetched.
    pub target_status: Option<u16>,
    /// The target resolved to a redirect rather than a terminal page.
    pub target_is_redirect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Script,
    Stylesheet,
    Iframe,
    Video,
    Audio,
}

#[derive(Debug, Clone, Default)]
pub struct Resource {
    pub kind: Option<ResourceKind>,
    pub url: String,
    pub page_url: String,
    pub mime: Option<String>,
    pub status: Option<u16>,
    pub bytes: Option<u64>,
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub is_async: bool,
    pub defer: bool,
}

impl Resource {
    pub fn image(page_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: Some(ResourceKind::Image),
            page_url: page_url.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn script(page_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: Some(ResourceKind::Script),
            page_url: page_url.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}

/// §3's severity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// §3's issue kind, orthogonal to severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Notice,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub url: String,
    pub category: &'static str,
    pub code: &'static str,
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn new(
        url: impl Into<String>,
        category: &'static str,
        code: &'static str,
        severity: IssueSeverity,
        kind: IssueKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            category,
            code,
            severity,
            kind,
            message: message.into(),
        }
    }
}

/// Configurable quantitative thresholds; defaults per §4.9.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub title_min: usize,
    pub title_max: usize,
    pub title_pixel_cap: u32,
    pub meta_desc_min: usize,
    pub meta_desc_max: usize,
    pub meta_desc_pixel_cap: u32,
    pub h1_max: usize,
    pub url_max: usize,
    pub thin_content_words: usize,
    pub large_image_bytes: u64,
    pub slow_response: Duration,
    pub max_redirect_chain: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            title_min: 30,
            title_max: 60,
            title_pixel_cap: 580,
            meta_desc_min: 70,
            meta_desc_max: 155,
            meta_desc_pixel_cap: 920,
            h1_max: 70,
            url_max: 115,
            thin_content_words: 200,
            large_image_bytes: 100 * 1024,
            slow_response: Duration::from_millis(500),
            max_redirect_chain: 2,
        }
    }
}

impl Thresholds {
    /// Applies a config's optional overrides on top of the defaults.
    pub fn with_overrides(overrides: &crate::config::ThresholdsConfig) -> Self {
        let mut t = Self::default();
        if let Some(v) = overrides.title_min {
            t.title_min = v;
        }
        if let Some(v) = overrides.title_max {
            t.title_max = v;
        }
        if let Some(v) = overrides.meta_desc_min {
            t.meta_desc_min = v;
        }
        if let Some(v) = overrides.meta_desc_max {
            t.meta_desc_max = v;
        }
        if let Some(v) = overrides.h1_max {
            t.h1_max = v;
        }
        if let Some(v) = overrides.url_max {
            t.url_max = v;
        }
        if let Some(v) = overrides.thin_content_words {
            t.thin_content_words = v;
        }
        if let Some(v) = overrides.large_image_bytes {
            t.large_image_bytes = v;
        }
        if let Some(v) = overrides.slow_response_ms {
            t.slow_response = Duration::from_millis(v);
        }
        if let Some(v) = overrides.max_redirect_chain {
            t.max_redirect_chain = v;
        }
        t
    }
}

/// Everything one per-page analyzer needs, bundled for a single call.
pub struct AnalysisContext<'a> {
    pub url: &'a str,
    pub depth: u32,
    pub fetch: &'a Fetch,
    pub facts: Option<&'a PageFacts>,
    pub body: Option<&'a str>,
    pub directives: RobotsDirectives,
    pub links: &'a [Link],
    pub resources: &'a [Resource],
    pub thresholds: &'a Thresholds,
    pub custom_search: &'a [crate::config::CustomRule],
    pub custom_extraction: &'a [crate::config::CustomRule],
}

/// One page's hreflang declarations, `(lang, target-url)` pairs as
/// written in the markup (targets are not yet resolved to URL-ids).
pub type HreflangSet = Vec<(String, String)>;

/// Accumulated cross-page state, consulted (never mutated) by the
/// per-page analyzers and mutated only by the pipeline driver after
/// each page, then consumed by the finalizers.
#[derive(Debug, Default)]
pub struct CrossPageIndex {
    pub title_hash_to_urls: HashMap<u64, Vec<String>>,
    pub meta_desc_hash_to_urls: HashMap<u64, Vec<String>>,
    pub content_hash_to_urls: HashMap<String, Vec<String>>,
    pub h1_hash_to_urls: HashMap<u64, Vec<String>>,
    pub canonical_of: HashMap<String, String>,
    pub inlink_count: HashMap<String, usize>,
    pub hreflang_of: HashMap<String, HreflangSet>,
    pub depth_of: HashMap<String, u32>,
    pub all_crawled_urls: std::collections::HashSet<String>,
    pub internal_urls: std::collections::HashSet<String>,
    pub sitemap_urls: std::collections::HashSet<String>,
}

impl CrossPageIndex {
    fn hash_str(s: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    pub fn record_page(&mut self, url: &str, depth: u32, is_internal: bool, facts: Option<&PageFacts>) {
        self.all_crawled_urls.insert(url.to_string());
        self.depth_of.insert(url.to_string(), depth);
        if is_internal {
            self.internal_urls.insert(url.to_string());
        }
        let Some(facts) = facts else { return };

        if let Some(title) = &facts.title {
            self.title_hash_to_urls
                .entry(Self::hash_str(title))
                .or_default()
                .push(url.to_string());
        }
        if let Some(desc) = &facts.meta_description {
            self.meta_desc_hash_to_urls
                .entry(Self::hash_str(desc))
                .or_default()
                .push(url.to_string());
        }
        if !facts.content_hash.is_empty() {
            self.content_hash_to_urls
                .entry(facts.content_hash.clone())
                .or_default()
                .push(url.to_string());
        }
        let h1_text: String = facts
            .headings
            .iter()
            .filter(|h| h.level == 1)
            .map(|h| h.text.as_str())
            .collect();
        if !h1_text.is_empty() {
            self.h1_hash_to_urls
                .entry(Self::hash_str(&h1_text))
                .or_default()
                .push(url.to_string());
        }
        if let Some(canonical) = &facts.canonical {
            self.canonical_of.insert(url.to_string(), canonical.clone());
        }
        if !facts.hreflangs.is_empty() {
            self.hreflang_of
                .insert(url.to_string(), facts.hreflangs.clone());
        }
    }

    pub fn record_link(&mut self, link: &Link) {
        if link.is_internal {
            *self.inlink_count.entry(link.to_url.clone()).or_insert(0) += 1;
        }
    }

    pub fn record_sitemap_url(&mut self, url: &str) {
        self.sitemap_urls.insert(url.to_string());
    }
}
