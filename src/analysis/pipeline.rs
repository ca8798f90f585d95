//! The analyzer pipeline manager (§4.9): runs every per-page analyzer
//! over one `AnalysisContext`, folds the result into the page's report
//! and the shared `CrossPageIndex`, and — once the scheduler signals
//! the last page has been analysed — runs the cross-page finalizers.

use super::analyzers::{
    analyze_accessibility, analyze_amp, analyze_canonicals, analyze_content,
    analyze_custom_extraction, analyze_custom_search, analyze_directives, analyze_h1, analyze_h2,
    analyze_hreflang, analyze_images, analyze_javascript, analyze_links, analyze_meta_description,
    analyze_mobile, analyze_response_codes, analyze_title, analyze_url_health, AmpStatus,
    CanonicalStatus, ContentStatus, DirectiveStatus, H1Status, H2Status, HreflangStatus,
    MetaDescStatus, MobileStatus, ResponseStatus, TitleStatus, UrlHealthStatus,
};
use super::finalizers::{
    finalize_canonical_chains, finalize_duplicate_content, finalize_duplicate_h1,
    finalize_duplicate_meta_descriptions, finalize_duplicate_titles,
    finalize_duplicate_urls, finalize_hreflang_return_links, finalize_orphan_pages,
};
use super::structured_data::{analyze_json_ld, StructuredBlock};
use super::types::{AnalysisContext, CrossPageIndex, Issue};
use std::collections::HashMap;

/// Every per-page analyzer's output for one page, bundled for
/// persistence and for the markdown/stats output stage.
#[derive(Debug)]
pub struct PageReport {
    pub url: String,
    pub response_status: ResponseStatus,
    pub title_status: TitleStatus,
    pub meta_desc_status: MetaDescStatus,
    pub h1_status: H1Status,
    pub h2_status: H2Status,
    pub content_status: ContentStatus,
    pub canonical_status: CanonicalStatus,
    pub directive_status: DirectiveStatus,
    pub hreflang_status: HreflangStatus,
    pub url_health_status: UrlHealthStatus,
    pub mobile_status: MobileStatus,
    pub accessibility_score: u8,
    pub amp_status: AmpStatus,
    pub structured_data: Vec<StructuredBlock>,
    pub custom_search: HashMap<String, usize>,
    pub custom_extraction: HashMap<String, Vec<String>>,
    pub issues: Vec<Issue>,
}

/// Runs every per-page analyzer over `ctx` and returns the combined
/// report. Does not touch the cross-page index — the caller records
/// `ctx`'s facts into it separately once the report is in hand, since
/// the scheduler may want to persist the report first.
pub fn analyze_page(ctx: &AnalysisContext) -> PageReport {
    let mut issues = Vec::new();

    let (response_status, mut i) = analyze_response_codes(ctx);
    issues.append(&mut i);
    let (title_status, mut i) = analyze_title(ctx);
    issues.append(&mut i);
    let (meta_desc_status, mut i) = analyze_meta_description(ctx);
    issues.append(&mut i);
    let (h1_status, mut i) = analyze_h1(ctx);
    issues.append(&mut i);
    let (h2_status, _) = analyze_h2(ctx);
    let (content_status, mut i) = analyze_content(ctx);
    issues.append(&mut i);
    let (canonical_status, mut i) = analyze_canonicals(ctx);
    issues.append(&mut i);
    let (directive_status, mut i) = analyze_directives(ctx);
    issues.append(&mut i);
    issues.append(&mut analyze_links(ctx));
    let (hreflang_status, mut i) = analyze_hreflang(ctx);
    issues.append(&mut i);
    let (url_health_status, mut i) = analyze_url_health(ctx);
    issues.append(&mut i);
    issues.append(&mut analyze_images(ctx));
    issues.append(&mut analyze_javascript(ctx));
    let (mobile_status, mut i) = analyze_mobile(ctx);
    issues.append(&mut i);
    let (accessibility_score, mut i) = analyze_accessibility(ctx);
    issues.append(&mut i);
    let (amp_status, mut i) = analyze_amp(ctx);
    issues.append(&mut i);

    let structured_data = if let Some(facts) = ctx.facts {
        let (blocks, mut i) = analyze_json_ld(ctx.url, &facts.json_ld_blocks);
        issues.append(&mut i);
        blocks
    } else {
        Vec::new()
    };

    let custom_search = analyze_custom_search(ctx);
    let custom_extraction = analyze_custom_extraction(ctx);

    PageReport {
        url: ctx.url.to_string(),
        response_status,
        title_status,
        meta_desc_status,
        h1_status,
        h2_status,
        content_status,
        canonical_status,
        directive_status,
        hreflang_status,
        url_health_status,
        mobile_status,
        accessibility_score,
        amp_status,
        structured_data,
        custom_search,
        custom_extraction,
        issues,
    }
}

/// Runs all cross-page finalizers over the completed index. Called
/// once, after the scheduler has drained the frontier.
pub fn run_finalizers(index: &CrossPageIndex, normalized_of: &HashMap<String, String>) -> Vec<Issue> {
    let mut issues = Vec::new();
    issues.extend(finalize_duplicate_titles(index));
    issues.extend(finalize_duplicate_meta_descriptions(index));
    issues.extend(finalize_duplicate_h1(index));
    issues.extend(finalize_duplicate_content(index));
    issues.extend(finalize_duplicate_urls(index, normalized_of));
    issues.extend(finalize_canonical_chains(index));
    issues.extend(finalize_orphan_pages(index));
    issues.extend(finalize_hreflang_return_links(index));
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{Fetch, RedirectChain, Thresholds};
    use crate::extract::PageFacts;
    use crate::robots::RobotsDirectives;
    use std::time::Duration;

    #[test]
    fn test_analyze_page_runs_every_analyzer() {
        let fetch = Fetch {
            url: "https://x/".into(),
            final_url: "https://x/".into(),
            status: 200,
            headers: Default::default(),
            redirect_chain: RedirectChain::default(),
            ttfb: Duration::from_millis(10),
            total_time: Duration::from_millis(20),
            body_size: 100,
            truncated: false,
            content_type: Some("text/html".into()),
        };
        let mut facts = PageFacts::default();
        facts.title = Some("A perfectly reasonable page title length".into());
        facts.word_count = 500;
        let thresholds = Thresholds::default();
        let ctx = AnalysisContext {
            url: "https://x/",
            depth: 0,
            fetch: &fetch,
            facts: Some(&facts),
            body: Some("<html lang=\"en\"><body></body></html>"),
            directives: RobotsDirectives::default(),
            links: &[],
            resources: &[],
            thresholds: &thresholds,
            custom_search: &[],
            custom_extraction: &[],
        };
        let report = analyze_page(&ctx);
        assert_eq!(report.response_status, ResponseStatus::Success);
        assert_eq!(report.content_status, ContentStatus::Ok);
    }

    #[test]
    fn test_finalizers_idempotent() {
        let mut index = CrossPageIndex::default();
        let mut facts = PageFacts::default();
        facts.title = Some("Dup".into());
        index.record_page("https://x/a", 1, true, Some(&facts));
        index.record_page("https://x/b", 1, true, Some(&facts));

        let normalized_of = HashMap::new();
        let first: Vec<_> = run_finalizers(&index, &normalized_of).into_iter().map(|i| i.code).collect();
        let second: Vec<_> = run_finalizers(&index, &normalized_of).into_iter().map(|i| i.code).collect();
        assert_eq!(first, second);
    }
}
