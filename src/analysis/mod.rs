//! The analyzer pipeline (§4.9): per-page analyzers, cross-page
//! finalizers, structured-data validation, and the restricted
//! selector grammar that backs the custom-search/extraction rules.

mod analyzers;
mod finalizers;
mod pipeline;
mod selectors;
mod structured_data;
mod types;

pub use analyzers::{
    analyze_accessibility, analyze_amp, analyze_canonicals, analyze_content,
    analyze_custom_extraction, analyze_custom_search, analyze_directives, analyze_h1, analyze_h2,
    analyze_hreflang, analyze_images, analyze_javascript, analyze_links, analyze_meta_description,
    analyze_mobile, analyze_response_codes, analyze_title, analyze_url_health,
    is_valid_hreflang_code, resources_from_facts, AmpStatus, CanonicalStatus, ContentStatus,
    DirectiveStatus, H1Status, H2Status, HreflangStatus, MetaDescStatus, MobileStatus,
    ResponseStatus, TitleStatus, UrlHealthStatus,
};
pub use finalizers::{
    analyze_sitemaps, finalize_canonical_chains, finalize_duplicate_content,
    finalize_duplicate_h1, finalize_duplicate_meta_descriptions, finalize_duplicate_titles,
    finalize_duplicate_urls, finalize_hreflang_return_links, finalize_orphan_pages,
    SitemapPresence,
};
pub use pipeline::{analyze_page, run_finalizers, PageReport};
pub use selectors::{apply_selector, parse_selector, validate_selector_syntax, Selector, SelectorError};
pub use structured_data::{analyze_json_ld, StructuredBlock};
pub use types::{
    AnalysisContext, CrawlStatus, CrossPageIndex, Fetch, HreflangSet, Issue, IssueKind,
    IssueSeverity, Link, RedirectChain, RedirectHop, Resource, ResourceKind, Thresholds,
};
