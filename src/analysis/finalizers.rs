//! Cross-page finalizers (§4.9): run once, after the last page has
//! been analysed, over the accumulated `CrossPageIndex`. Each is
//! idempotent — running the same index through a finalizer twice
//! produces the same issue set, since nothing here is consumed or
//! mutated, only read.

use super::analyzers::is_valid_hreflang_code;
use super::types::{CrossPageIndex, Issue, IssueKind, IssueSeverity};
use crate::sitemap::SitemapUrlEntry;
use std::collections::{HashMap, HashSet};

fn duplicate_issues(
    map: &HashMap<u64, Vec<String>>,
    category: &'static str,
    code: &'static str,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for urls in map.values() {
        if urls.len() < 2 {
            continue;
        }
        for url in urls {
            issues.push(Issue::new(
                url.clone(),
                category,
                code,
                IssueSeverity::Medium,
                IssueKind::Warning,
                format!("shared by {} URLs", urls.len()),
            ));
        }
    }
    issues
}

pub fn finalize_duplicate_titles(index: &CrossPageIndex) -> Vec<Issue> {
    duplicate_issues(&index.title_hash_to_urls, "page-titles", "duplicate-title")
}

pub fn finalize_duplicate_meta_descriptions(index: &CrossPageIndex) -> Vec<Issue> {
    duplicate_issues(&index.meta_desc_hash_to_urls, "meta-description", "duplicate-meta-desc")
}

pub fn finalize_duplicate_h1(index: &CrossPageIndex) -> Vec<Issue> {
    duplicate_issues(&index.h1_hash_to_urls, "h1", "duplicate-h1")
}

/// Content duplication is keyed by the content hash string directly
/// (not a `u64` hash of it), so it gets its own loop rather than
/// reusing `duplicate_issues`.
pub fn finalize_duplicate_content(index: &CrossPageIndex) -> Vec<Issue> {
    let mut issues = Vec::new();
    for urls in index.content_hash_to_urls.values() {
        if urls.len() < 2 {
            continue;
        }
        for url in urls {
            issues.push(Issue::new(
                url.clone(),
                "content",
                "duplicate-content",
                IssueSeverity::Medium,
                IssueKind::Warning,
                format!("shared by {} URLs", urls.len()),
            ));
        }
    }
    issues
}

/// `duplicate-url` fires when two distinct recorded URL strings share
/// one normalized form; the frontier's dedup means that should never
/// happen by construction, but a resumed session merging two config
/// generations could still produce it, so the check stays defensive.
pub fn finalize_duplicate_urls(index: &CrossPageIndex, normalized_of: &HashMap<String, String>) -> Vec<Issue> {
    let mut by_normalized: HashMap<&str, Vec<&String>> = HashMap::new();
    for url in &index.all_crawled_urls {
        if let Some(normalized) = normalized_of.get(url) {
            by_normalized.entry(normalized.as_str()).or_default().push(url);
        }
    }
    let mut issues = Vec::new();
    for urls in by_normalized.values() {
        if urls.len() < 2 {
            continue;
        }
        for url in urls {
            issues.push(Issue::new(
                (*url).clone(),
                "url-health",
                "duplicate-url",
                IssueSeverity::Medium,
                IssueKind::Warning,
                format!("{} URLs share one normalized form", urls.len()),
            ));
        }
    }
    issues
}

/// Walks `canonical_of` from each page; a chain of length > 2 (A → B →
/// C, so resolving A to its ultimate canonical crosses two hops) or
/// one that revisits a URL emits `canonical-chain` on the starting
/// page.
pub fn finalize_canonical_chains(index: &CrossPageIndex) -> Vec<Issue> {
    let mut issues = Vec::new();

    for start in index.canonical_of.keys() {
        let mut chain = vec![start.clone()];
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(start.clone());
        let mut current = start.clone();
        let mut looped = false;

        loop {
            let Some(next) = index.canonical_of.get(&current) else { break };
            if next == &current {
                break;
            }
            if !seen.insert(next.clone()) {
                looped = true;
                chain.push(next.clone());
                break;
            }
            chain.push(next.clone());
            current = next.clone();
        }

        if looped || chain.len() > 2 {
            issues.push(Issue::new(
                start.clone(),
                "canonicals",
                "canonical-chain",
                IssueSeverity::Medium,
                IssueKind::Warning,
                format!("canonical chain of length {} starting here", chain.len()),
            ));
        }
    }

    issues
}

/// An internal URL at depth > 0 with zero internal inlinks once the
/// whole crawl is done.
pub fn finalize_orphan_pages(index: &CrossPageIndex) -> Vec<Issue> {
    let mut issues = Vec::new();
    for url in &index.internal_urls {
        let depth = index.depth_of.get(url).copied().unwrap_or(0);
        if depth == 0 {
            continue;
        }
        let inlinks = index.inlink_count.get(url).copied().unwrap_or(0);
        if inlinks == 0 {
            issues.push(Issue::new(
                url.clone(),
                "links",
                "orphan-page",
                IssueSeverity::Medium,
                IssueKind::Warning,
                "no internal inlinks found after the crawl completed",
            ));
        }
    }
    issues
}

/// For every (lang, target) edge a page declares, the target page
/// must declare a reciprocal edge back. A missing reciprocal is
/// attached to the *declaring* page (§8 S6), once per page no matter
/// how many of its edges are unreciprocated.
pub fn finalize_hreflang_return_links(index: &CrossPageIndex) -> Vec<Issue> {
    let mut issues = Vec::new();

    for (source, edges) in &index.hreflang_of {
        let mut missing = false;
        for (_, target) in edges {
            if target == source {
                continue;
            }
            let reciprocated = index
                .hreflang_of
                .get(target)
                .map(|target_edges| target_edges.iter().any(|(_, back)| back == source))
                .unwrap_or(false);
            if !reciprocated {
                missing = true;
                break;
            }
        }
        if missing {
            issues.push(Issue::new(
                source.clone(),
                "hreflang",
                "missing-return-link",
                IssueSeverity::Medium,
                IssueKind::Warning,
                "a declared hreflang target does not link back",
            ));
        }
    }

    issues
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapPresence {
    InSitemapOnly,
    InCrawlOnly,
    Both,
}

/// Sitemaps (§4.9): reconciles the parsed sitemap URL set against the
/// crawled set. `sitemap-orphan` marks a sitemap URL never reached by
/// the crawl; `invalid-lastmod` flags entries whose `lastmod` couldn't
/// be parsed. Not a per-page analyzer — it runs once, like the other
/// finalizers, but it is driven by sitemap entries rather than the
/// cross-page index alone.
pub fn analyze_sitemaps(
    entries: &[SitemapUrlEntry],
    crawled: &HashSet<String>,
) -> (HashMap<String, SitemapPresence>, Vec<Issue>) {
    let mut presence = HashMap::new();
    let mut issues = Vec::new();

    for entry in entries {
        let in_crawl = crawled.contains(&entry.loc);
        let status = if in_crawl {
            SitemapPresence::Both
        } else {
            SitemapPresence::InSitemapOnly
        };
        presence.insert(entry.loc.clone(), status);

        if !in_crawl {
            issues.push(Issue::new(
                entry.loc.clone(),
                "sitemaps",
                "sitemap-orphan",
                IssueSeverity::Low,
                IssueKind::Notice,
                "URL is listed in the sitemap but was never crawled",
            ));
        }
        if entry.lastmod_invalid {
            issues.push(Issue::new(
                entry.loc.clone(),
                "sitemaps",
                "invalid-lastmod",
                IssueSeverity::Low,
                IssueKind::Notice,
                format!("unparseable lastmod: {:?}", entry.lastmod_raw),
            ));
        }
    }

    for url in crawled {
        presence.entry(url.clone()).or_insert(SitemapPresence::InCrawlOnly);
    }

    (presence, issues)
}

#[allow(dead_code)]
fn assert_hreflang_codes_valid(codes: &[&str]) -> bool {
    codes.iter().all(|c| is_valid_hreflang_code(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with_titles(pairs: &[(&str, &str)]) -> CrossPageIndex {
        let mut index = CrossPageIndex::default();
        for (url, title) in pairs {
            let mut facts = crate::extract::PageFacts::default();
            facts.title = Some(title.to_string());
            index.record_page(url, 1, true, Some(&facts));
        }
        index
    }

    #[test]
    fn test_duplicate_titles_exactly_three() {
        let index = index_with_titles(&[
            ("https://x/a", "Welcome"),
            ("https://x/b", "Welcome"),
            ("https://x/c", "Welcome"),
        ]);
        let issues = finalize_duplicate_titles(&index);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.severity == IssueSeverity::Medium));
        assert!(issues.iter().all(|i| i.message.contains('3')));
    }

    #[test]
    fn test_unique_titles_no_issues() {
        let index = index_with_titles(&[("https://x/a", "A"), ("https://x/b", "B")]);
        assert!(finalize_duplicate_titles(&index).is_empty());
    }

    #[test]
    fn test_orphan_page_detection() {
        let mut index = CrossPageIndex::default();
        index.record_page("https://x/", 0, true, None);
        index.record_page("https://x/orphan", 1, true, None);
        index.record_page("https://x/linked", 1, true, None);
        index.inlink_count.insert("https://x/linked".into(), 1);

        let issues = finalize_orphan_pages(&index);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].url, "https://x/orphan");
    }

    #[test]
    fn test_seed_is_never_orphan() {
        let mut index = CrossPageIndex::default();
        index.record_page("https://x/", 0, true, None);
        assert!(finalize_orphan_pages(&index).is_empty());
    }

    #[test]
    fn test_hreflang_return_links_s6() {
        let mut index = CrossPageIndex::default();
        let mut facts_a = crate::extract::PageFacts::default();
        facts_a.hreflangs = vec![
            ("en".into(), "https://x/en/".into()),
            ("de".into(), "https://x/de/".into()),
        ];
        index.record_page("https://x/en/", 0, true, Some(&facts_a));

        let mut facts_b = crate::extract::PageFacts::default();
        facts_b.hreflangs = vec![("de".into(), "https://x/de/".into())];
        index.record_page("https://x/de/", 0, true, Some(&facts_b));

        let issues = finalize_hreflang_return_links(&index);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].url, "https://x/en/");
    }

    #[test]
    fn test_canonical_chain_length_three() {
        let mut index = CrossPageIndex::default();
        index.canonical_of.insert("https://x/a".into(), "https://x/b".into());
        index.canonical_of.insert("https://x/b".into(), "https://x/c".into());
        let issues = finalize_canonical_chains(&index);
        assert!(issues.iter().any(|i| i.url == "https://x/a"));
    }

    #[test]
    fn test_canonical_self_reference_is_not_a_chain() {
        let mut index = CrossPageIndex::default();
        index.canonical_of.insert("https://x/a".into(), "https://x/a".into());
        let issues = finalize_canonical_chains(&index);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_sitemap_orphan_flagged() {
        let entries = vec![SitemapUrlEntry {
            loc: "https://x/never-crawled".into(),
            ..Default::default()
        }];
        let crawled = HashSet::new();
        let (_, issues) = analyze_sitemaps(&entries, &crawled);
        assert_eq!(issues[0].code, "sitemap-orphan");
    }

    #[test]
    fn test_sitemap_invalid_lastmod_flagged() {
        let entries = vec![SitemapUrlEntry {
            loc: "https://x/a".into(),
            lastmod_invalid: true,
            lastmod_raw: Some("not-a-date".into()),
            ..Default::default()
        }];
        let mut crawled = HashSet::new();
        crawled.insert("https://x/a".to_string());
        let (_, issues) = analyze_sitemaps(&entries, &crawled);
        assert!(issues.iter().any(|i| i.code == "invalid-lastmod"));
    }
}
