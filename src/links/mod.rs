//! Link classification: internal/external, follow/nofollow, and the
//! include/exclude/extension admission filter (§4.7).

use crate::url::{same_domain, same_host};
use regex::Regex;
use url::Url;

/// `rel` attribute values that mark a link as non-followed.
fn rel_has_nofollow(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case("nofollow"))
}

/// A link as discovered by the extractor, before classification.
#[derive(Debug, Clone)]
pub struct RawLink {
    pub href: String,
    pub rel: Option<String>,
    pub anchor_text: String,
}

/// A link after classification, ready for frontier admission or
/// reporting.
#[derive(Debug, Clone)]
pub struct ClassifiedLink {
    pub target: Url,
    pub anchor_text: String,
    pub is_internal: bool,
    pub is_follow: bool,
    pub admitted: bool,
}

/// Compiled include/exclude/extension filters applied before a link is
/// admitted to the frontier.
pub struct LinkFilters {
    pub include_patterns: Vec<Regex>,
    pub exclude_patterns: Vec<Regex>,
    pub exclude_extensions: Vec<String>,
    pub include_subdomains: bool,
}

impl LinkFilters {
    pub fn new() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            exclude_extensions: Vec::new(),
            include_subdomains: false,
        }
    }

    fn extension_excluded(&self, url: &Url) -> bool {
        let path = url.path().to_ascii_lowercase();
        self.exclude_extensions
            .iter()
            .any(|ext| path.ends_with(&format!(".{}", ext.trim_start_matches('.').to_ascii_lowercase())))
    }

    fn pattern_allows(&self, url: &Url) -> bool {
        let s = url.as_str();
        if self.exclude_patterns.iter().any(|re| re.is_match(s)) {
            return false;
        }
        if self.include_patterns.is_empty() {
            return true;
        }
        self.include_patterns.iter().any(|re| re.is_match(s))
    }
}

impl Default for LinkFilters {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a raw link relative to the seed URL and the page-level
/// follow directive, resolving `href` against `base` and running it
/// through `filters`.
pub fn classify_link(
    raw: &RawLink,
    base: &Url,
    seed: &Url,
    page_nofollow: bool,
    filters: &LinkFilters,
) -> Option<ClassifiedLink> {
    let trimmed = raw.href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let target = base.join(&raw.href).ok()?;
    if target.scheme() != "http" && target.scheme() != "https" {
        return None;
    }

    let is_internal = if filters.include_subdomains {
        same_domain(seed, &target)
    } else {
        same_host(seed, &target)
    };

    let rel_nofollow = raw.rel.as_deref().map(rel_has_nofollow).unwrap_or(false);
    let is_follow = !rel_nofollow && !page_nofollow;

    let admitted = !filters.extension_excluded(&target) && filters.pattern_allows(&target);

    Some(ClassifiedLink {
        target,
        anchor_text: raw.anchor_text.clone(),
        is_internal,
        is_follow,
        admitted,
    })
}
