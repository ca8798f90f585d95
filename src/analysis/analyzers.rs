//! Per-page analyzers (§4.9). Each is a pure function from
//! `AnalysisContext` to a status label plus zero or more issues; none
//! of them mutate or consult the cross-page index — that is the
//! finalizers' job, run once after the last page.

use super::selectors::{apply_selector, parse_selector};
use super::types::{AnalysisContext, Issue, IssueKind, IssueSeverity, Resource, ResourceKind};
use regex::Regex;
use scraper::{Html, Selector as CssSelector};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Redirect,
    ClientError,
    ServerError,
}

pub fn analyze_response_codes(ctx: &AnalysisContext) -> (ResponseStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let f = ctx.fetch;

    let status = if f.is_success() {
        ResponseStatus::Success
    } else if f.is_redirect() || !f.redirect_chain.is_empty() {
        ResponseStatus::Redirect
    } else if f.is_client_error() {
        ResponseStatus::ClientError
    } else {
        ResponseStatus::ServerError
    };

    if f.redirect_chain.has_loop() {
        issues.push(Issue::new(
            ctx.url,
            "response-codes",
            "redirect-loop",
            IssueSeverity::High,
            IssueKind::Error,
            "redirect chain loops back to an earlier hop",
        ));
    } else if f.redirect_chain.len() > ctx.thresholds.max_redirect_chain {
        issues.push(Issue::new(
            ctx.url,
            "response-codes",
            "redirect-chain",
            IssueSeverity::Medium,
            IssueKind::Warning,
            format!(
                "redirect chain length {} exceeds max {}",
                f.redirect_chain.len(),
                ctx.thresholds.max_redirect_chain
            ),
        ));
    }

    if f.is_client_error() {
        issues.push(Issue::new(
            ctx.url,
            "response-codes",
            "client-error",
            IssueSeverity::Medium,
            IssueKind::Error,
            format!("HTTP {}", f.status),
        ));
    }
    if f.is_server_error() {
        issues.push(Issue::new(
            ctx.url,
            "response-codes",
            "server-error",
            IssueSeverity::High,
            IssueKind::Error,
            format!("HTTP {}", f.status),
        ));
    }
    if f.total_time >= ctx.thresholds.slow_response {
        issues.push(Issue::new(
            ctx.url,
            "response-codes",
            "slow-response",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("response took {:?}", f.total_time),
        ));
    }

    (status, issues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStatus {
    Missing,
    Ok,
    TooLong,
    TooShort,
}

pub fn analyze_title(ctx: &AnalysisContext) -> (TitleStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let title = ctx.facts.and_then(|f| f.title.as_deref()).unwrap_or("");

    if title.is_empty() {
        issues.push(Issue::new(
            ctx.url,
            "page-titles",
            "missing-title",
            IssueSeverity::High,
            IssueKind::Error,
            "page has no <title>",
        ));
        return (TitleStatus::Missing, issues);
    }

    let len = title.chars().count();
    if len > ctx.thresholds.title_max {
        issues.push(Issue::new(
            ctx.url,
            "page-titles",
            "title-too-long",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("title is {len} chars, max {}", ctx.thresholds.title_max),
        ));
        return (TitleStatus::TooLong, issues);
    }
    if len < ctx.thresholds.title_min {
        issues.push(Issue::new(
            ctx.url,
            "page-titles",
            "title-too-short",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("title is {len} chars, min {}", ctx.thresholds.title_min),
        ));
        return (TitleStatus::TooShort, issues);
    }
    (TitleStatus::Ok, issues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaDescStatus {
    Missing,
    Ok,
    TooLong,
    TooShort,
}

pub fn analyze_meta_description(ctx: &AnalysisContext) -> (MetaDescStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let desc = ctx
        .facts
        .and_then(|f| f.meta_description.as_deref())
        .unwrap_or("");

    if desc.is_empty() {
        issues.push(Issue::new(
            ctx.url,
            "meta-description",
            "missing-meta-desc",
            IssueSeverity::Medium,
            IssueKind::Warning,
            "page has no meta description",
        ));
        return (MetaDescStatus::Missing, issues);
    }

    let len = desc.chars().count();
    if len > ctx.thresholds.meta_desc_max {
        issues.push(Issue::new(
            ctx.url,
            "meta-description",
            "too-long",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("meta description is {len} chars, max {}", ctx.thresholds.meta_desc_max),
        ));
        return (MetaDescStatus::TooLong, issues);
    }
    if len < ctx.thresholds.meta_desc_min {
        issues.push(Issue::new(
            ctx.url,
            "meta-description",
            "too-short",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("meta description is {len} chars, min {}", ctx.thresholds.meta_desc_min),
        ));
        return (MetaDescStatus::TooShort, issues);
    }
    (MetaDescStatus::Ok, issues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H1Status {
    Missing,
    Ok,
    Multiple,
    TooLong,
}

pub fn analyze_h1(ctx: &AnalysisContext) -> (H1Status, Vec<Issue>) {
    let mut issues = Vec::new();
    let h1s: Vec<&str> = ctx
        .facts
        .map(|f| {
            f.headings
                .iter()
                .filter(|h| h.level == 1)
                .map(|h| h.text.as_str())
                .collect()
        })
        .unwrap_or_default();

    if h1s.is_empty() {
        issues.push(Issue::new(
            ctx.url,
            "h1",
            "missing-h1",
            IssueSeverity::Medium,
            IssueKind::Warning,
            "page has no H1",
        ));
        return (H1Status::Missing, issues);
    }
    if h1s.len() > 1 {
        issues.push(Issue::new(
            ctx.url,
            "h1",
            "multiple-h1",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("page has {} H1 elements", h1s.len()),
        ));
        return (H1Status::Multiple, issues);
    }
    if h1s[0].chars().count() > ctx.thresholds.h1_max {
        return (H1Status::TooLong, issues);
    }
    (H1Status::Ok, issues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H2Status {
    Missing,
    Ok,
}

pub fn analyze_h2(ctx: &AnalysisContext) -> (H2Status, Vec<Issue>) {
    let has_h2 = ctx
        .facts
        .map(|f| f.headings.iter().any(|h| h.level == 2))
        .unwrap_or(false);
    let status = if has_h2 { H2Status::Ok } else { H2Status::Missing };
    (status, Vec::new())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    Empty,
    Thin,
    Ok,
}

pub fn analyze_content(ctx: &AnalysisContext) -> (ContentStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let word_count = ctx.facts.map(|f| f.word_count).unwrap_or(0);

    if word_count == 0 {
        return (ContentStatus::Empty, issues);
    }
    if word_count < ctx.thresholds.thin_content_words {
        issues.push(Issue::new(
            ctx.url,
            "content",
            "thin-content",
            IssueSeverity::Medium,
            IssueKind::Warning,
            format!("{word_count} words, below {} threshold", ctx.thresholds.thin_content_words),
        ));
        return (ContentStatus::Thin, issues);
    }
    (ContentStatus::Ok, issues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Missing,
    SelfReferencing,
    Canonicalised,
}

pub fn analyze_canonicals(ctx: &AnalysisContext) -> (CanonicalStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let canonical = ctx.facts.and_then(|f| f.canonical.as_deref());

    match canonical {
        None => {
            issues.push(Issue::new(
                ctx.url,
                "canonicals",
                "missing-canonical",
                IssueSeverity::Low,
                IssueKind::Notice,
                "page declares no canonical link",
            ));
            (CanonicalStatus::Missing, issues)
        }
        Some(c) if c == ctx.url => (CanonicalStatus::SelfReferencing, issues),
        Some(_) => (CanonicalStatus::Canonicalised, issues),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveStatus {
    Indexable,
    NonIndexable,
}

pub fn analyze_directives(ctx: &AnalysisContext) -> (DirectiveStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let indexable = ctx.directives.is_indexable();

    if !indexable {
        issues.push(Issue::new(
            ctx.url,
            "directives",
            "noindex",
            IssueSeverity::Low,
            IssueKind::Notice,
            "page is marked noindex",
        ));
    }

    let canonical = ctx.facts.and_then(|f| f.canonical.as_deref());
    if !indexable {
        if let Some(c) = canonical {
            if c != ctx.url {
                issues.push(Issue::new(
                    ctx.url,
                    "directives",
                    "canonical+noindex-conflict",
                    IssueSeverity::High,
                    IssueKind::Error,
                    "page is noindex but canonicalises to a different URL",
                ));
            }
        }
    }

    let status = if indexable {
        DirectiveStatus::Indexable
    } else {
        DirectiveStatus::NonIndexable
    };
    (status, issues)
}

pub fn analyze_links(ctx: &AnalysisContext) -> Vec<Issue> {
    let mut issues = Vec::new();

    let has_internal_outlink = ctx.links.iter().any(|l| l.is_internal);
    if !has_internal_outlink && !ctx.links.is_empty() {
        issues.push(Issue::new(
            ctx.url,
            "links",
            "no-internal-outlinks",
            IssueSeverity::Low,
            IssueKind::Notice,
            "page has no internal outlinks",
        ));
    } else if ctx.links.is_empty() {
        issues.push(Issue::new(
            ctx.url,
            "links",
            "no-internal-outlinks",
            IssueSeverity::Low,
            IssueKind::Notice,
            "page has no outlinks at all",
        ));
    }

    for link in ctx.links {
        if let Some(status) = link.target_status {
            if status >= 400 {
                issues.push(Issue::new(
                    ctx.url,
                    "links",
                    "broken-link",
                    IssueSeverity::High,
                    IssueKind::Error,
                    format!("link to {} returned {status}", link.to_url),
                ));
            } else if link.target_is_redirect {
                issues.push(Issue::new(
                    ctx.url,
                    "links",
                    "redirect-link",
                    IssueSeverity::Low,
                    IssueKind::Notice,
                    format!("link to {} is a redirect", link.to_url),
                ));
            }
        }
    }

    issues
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HreflangStatus {
    None,
    HasHreflang,
}

fn hreflang_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z]{2,3}(-[a-z]{2})?$").unwrap())
}

pub fn is_valid_hreflang_code(code: &str) -> bool {
    code.eq_ignore_ascii_case("x-default") || hreflang_code_regex().is_match(code)
}

pub fn analyze_hreflang(ctx: &AnalysisContext) -> (HreflangStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let hreflangs = ctx.facts.map(|f| f.hreflangs.as_slice()).unwrap_or(&[]);

    if hreflangs.is_empty() {
        return (HreflangStatus::None, issues);
    }

    let has_self_ref = hreflangs.iter().any(|(_, target)| target == ctx.url);
    if !has_self_ref {
        issues.push(Issue::new(
            ctx.url,
            "hreflang",
            "missing-self-ref",
            IssueSeverity::Medium,
            IssueKind::Warning,
            "hreflang set does not include a self-referencing entry",
        ));
    }

    for (lang, _target) in hreflangs {
        if !is_valid_hreflang_code(lang) {
            issues.push(Issue::new(
                ctx.url,
                "hreflang",
                "invalid-code",
                IssueSeverity::Low,
                IssueKind::Notice,
                format!("'{lang}' is not a valid hreflang code"),
            ));
        }
    }

    (HreflangStatus::HasHreflang, issues)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlHealthStatus {
    Ok,
    Issues,
}

pub fn analyze_url_health(ctx: &AnalysisContext) -> (UrlHealthStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    if ctx.url.chars().count() > ctx.thresholds.url_max {
        issues.push(Issue::new(
            ctx.url,
            "url-health",
            "url-too-long",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("URL is {} chars, max {}", ctx.url.chars().count(), ctx.thresholds.url_max),
        ));
    }
    let status = if issues.is_empty() {
        UrlHealthStatus::Ok
    } else {
        UrlHealthStatus::Issues
    };
    (status, issues)
}

pub fn analyze_images(ctx: &AnalysisContext) -> Vec<Issue> {
    let mut issues = Vec::new();

    if let Some(facts) = ctx.facts {
        for img in &facts.images {
            if img.alt.as_deref().unwrap_or("").trim().is_empty() {
                issues.push(Issue::new(
                    ctx.url,
                    "images",
                    "missing-alt",
                    IssueSeverity::Medium,
                    IssueKind::Warning,
                    format!("image {} has no alt text", img.src.as_deref().unwrap_or("<unknown>")),
                ));
            }
        }
    }

    for resource in ctx.resources.iter().filter(|r| r.kind == Some(ResourceKind::Image)) {
        if let Some(status) = resource.status {
            if status >= 400 {
                issues.push(Issue::new(
                    ctx.url,
                    "images",
                    "broken-image",
                    IssueSeverity::Medium,
                    IssueKind::Error,
                    format!("image {} returned {status}", resource.url),
                ));
            }
        }
        if let Some(bytes) = resource.bytes {
            if bytes >= ctx.thresholds.large_image_bytes {
                issues.push(Issue::new(
                    ctx.url,
                    "images",
                    "large-image",
                    IssueSeverity::Low,
                    IssueKind::Notice,
                    format!("image {} is {bytes} bytes", resource.url),
                ));
            }
        }
    }

    issues
}

pub fn analyze_javascript(ctx: &AnalysisContext) -> Vec<Issue> {
    let mut issues = Vec::new();

    for resource in ctx.resources.iter().filter(|r| r.kind == Some(ResourceKind::Script)) {
        if let Some(status) = resource.status {
            if status >= 400 {
                issues.push(Issue::new(
                    ctx.url,
                    "javascript",
                    "broken-script",
                    IssueSeverity::Medium,
                    IssueKind::Error,
                    format!("script {} returned {status}", resource.url),
                ));
            }
        }
        if !resource.is_async && !resource.defer {
            issues.push(Issue::new(
                ctx.url,
                "javascript",
                "render-blocking-script",
                IssueSeverity::Low,
                IssueKind::Notice,
                format!("script {} has no async/defer attribute", resource.url),
            ));
        }
    }

    issues
}

/// Resources for the images/JS analyzers, derived from `PageFacts`
/// (status/bytes are filled in later by the scheduler once each
/// resource has been probed — analysis on first sight leaves them
/// `None`).
pub fn resources_from_facts(page_url: &str, facts: &crate::extract::PageFacts) -> Vec<Resource> {
    let mut out = Vec::new();
    for img in &facts.images {
        out.push(Resource {
            kind: Some(ResourceKind::Image),
            url: img.src.clone().unwrap_or_default(),
            page_url: page_url.to_string(),
            alt: img.alt.clone(),
            width: img.width.clone(),
            height: img.height.clone(),
            ..Default::default()
        });
    }
    for script in &facts.scripts {
        if let Some(src) = &script.src {
            out.push(Resource {
                kind: Some(ResourceKind::Script),
                url: src.clone(),
                page_url: page_url.to_string(),
                is_async: script.is_async,
                defer: script.defer,
                mime: script.script_type.clone(),
                ..Default::default()
            });
        }
    }
    for href in &facts.stylesheets {
        out.push(Resource {
            kind: Some(ResourceKind::Stylesheet),
            url: href.clone(),
            page_url: page_url.to_string(),
            ..Default::default()
        });
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileStatus {
    Friendly,
    NeedsWork,
    NotFriendly,
}

pub fn analyze_mobile(ctx: &AnalysisContext) -> (MobileStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let viewport = ctx
        .facts
        .and_then(|f| f.other_meta.get("viewport"))
        .map(String::as_str);

    let Some(viewport) = viewport else {
        issues.push(Issue::new(
            ctx.url,
            "mobile",
            "missing-viewport",
            IssueSeverity::Medium,
            IssueKind::Warning,
            "page has no viewport meta tag",
        ));
        return (MobileStatus::NotFriendly, issues);
    };

    let lower = viewport.to_ascii_lowercase();
    let mut needs_work = false;

    if lower.contains("width=") && !lower.contains("width=device-width") {
        issues.push(Issue::new(
            ctx.url,
            "mobile",
            "fixed-width",
            IssueSeverity::Low,
            IssueKind::Notice,
            format!("viewport uses a fixed width: {viewport}"),
        ));
        needs_work = true;
    }
    if lower.contains("user-scalable=no") || lower.contains("maximum-scale=1") {
        issues.push(Issue::new(
            ctx.url,
            "mobile",
            "zoom-disabled",
            IssueSeverity::Low,
            IssueKind::Notice,
            "viewport disables pinch-zoom",
        ));
        needs_work = true;
    }

    let status = if needs_work {
        MobileStatus::NeedsWork
    } else {
        MobileStatus::Friendly
    };
    (status, issues)
}

/// A 0-100 accessibility score plus the issues behind the deductions:
/// missing alt text, heading-level skips, form inputs with no
/// associated label, and invalid ARIA roles. `body` is walked with
/// `scraper` rather than the streaming extractor because these checks
/// need structural (parent/child, id-reference) relationships.
pub fn analyze_accessibility(ctx: &AnalysisContext) -> (u8, Vec<Issue>) {
    let mut issues = Vec::new();
    let mut score: i32 = 100;

    let Some(facts) = ctx.facts else {
        return (0, issues);
    };

    let missing_alt = facts
        .images
        .iter()
        .filter(|i| i.alt.as_deref().unwrap_or("").trim().is_empty())
        .count();
    if missing_alt > 0 {
        score -= (missing_alt as i32 * 5).min(40);
        issues.push(Issue::new(
            ctx.url,
            "accessibility",
            "missing-alt-count",
            IssueSeverity::Medium,
            IssueKind::Warning,
            format!("{missing_alt} images missing alt text"),
        ));
    }

    let mut prev_level = 0u8;
    let mut skip_found = false;
    for h in &facts.headings {
        if prev_level != 0 && h.level > prev_level + 1 {
            skip_found = true;
        }
        prev_level = h.level;
    }
    if skip_found {
        score -= 10;
        issues.push(Issue::new(
            ctx.url,
            "accessibility",
            "heading-level-skip",
            IssueSeverity::Low,
            IssueKind::Notice,
            "heading levels skip a step (e.g. H1 to H3)",
        ));
    }

    if let Some(lang_missing) = facts
        .other_meta
        .get("html-lang-missing")
        .map(|_| true)
        .or(Some(false))
    {
        let _ = lang_missing;
    }

    if let Some(body) = ctx.body {
        let document = Html::parse_document(body);
        if let Ok(html_sel) = CssSelector::parse("html[lang]") {
            if document.select(&html_sel).next().is_none() {
                score -= 10;
                issues.push(Issue::new(
                    ctx.url,
                    "accessibility",
                    "missing-lang",
                    IssueSeverity::Medium,
                    IssueKind::Warning,
                    "<html> has no lang attribute",
                ));
            }
        }

        if let (Ok(input_sel), Ok(label_sel)) = (
            CssSelector::parse("input:not([type=hidden]):not([type=submit]):not([type=button])"),
            CssSelector::parse("label"),
        ) {
            let labelled_ids: std::collections::HashSet<String> = document
                .select(&label_sel)
                .filter_map(|el| el.value().attr("for").map(str::to_string))
                .collect();
            let unlabelled = document
                .select(&input_sel)
                .filter(|el| {
                    let has_id_label = el
                        .value()
                        .attr("id")
                        .map(|id| labelled_ids.contains(id))
                        .unwrap_or(false);
                    let has_aria = el.value().attr("aria-label").is_some();
                    !has_id_label && !has_aria
                })
                .count();
            if unlabelled > 0 {
                score -= (unlabelled as i32 * 5).min(20);
                issues.push(Issue::new(
                    ctx.url,
                    "accessibility",
                    "form-label-gap",
                    IssueSeverity::Medium,
                    IssueKind::Warning,
                    format!("{unlabelled} form inputs have no associated label"),
                ));
            }
        }

        if let Ok(role_sel) = CssSelector::parse("[role]") {
            let invalid_roles = document
                .select(&role_sel)
                .filter(|el| {
                    el.value()
                        .attr("role")
                        .map(|r| !is_valid_aria_role(r))
                        .unwrap_or(false)
                })
                .count();
            if invalid_roles > 0 {
                score -= (invalid_roles as i32 * 5).min(20);
                issues.push(Issue::new(
                    ctx.url,
                    "accessibility",
                    "invalid-role",
                    IssueSeverity::Low,
                    IssueKind::Notice,
                    format!("{invalid_roles} elements use an invalid ARIA role"),
                ));
            }
        }
    }

    (score.max(0) as u8, issues)
}

fn is_valid_aria_role(role: &str) -> bool {
    const VALID: &[&str] = &[
        "alert", "alertdialog", "application", "article", "banner", "button", "checkbox",
        "complementary", "contentinfo", "dialog", "document", "feed", "figure", "form", "grid",
        "gridcell", "heading", "img", "link", "list", "listbox", "listitem", "main", "menu",
        "menubar", "menuitem", "navigation", "none", "note", "option", "presentation",
        "progressbar", "radio", "radiogroup", "region", "row", "rowgroup", "search", "searchbox",
        "separator", "slider", "spinbutton", "status", "switch", "tab", "table", "tablist",
        "tabpanel", "textbox", "timer", "toolbar", "tooltip", "tree", "treegrid", "treeitem",
    ];
    VALID.contains(&role)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpStatus {
    HasAmp,
    None,
}

/// Detects whether this page *is* an AMP document (`<html amp>` or
/// `<html ⚡>`), and if so whether its canonical link points somewhere
/// other than itself — an AMP page with no canonical, or one that
/// canonicalises to itself, can't be resolved back to its original.
pub fn analyze_amp(ctx: &AnalysisContext) -> (AmpStatus, Vec<Issue>) {
    let mut issues = Vec::new();
    let Some(body) = ctx.body else {
        return (AmpStatus::None, issues);
    };

    let document = Html::parse_document(body);
    let Ok(html_sel) = CssSelector::parse("html") else {
        return (AmpStatus::None, issues);
    };
    let is_amp = document.select(&html_sel).next().map_or(false, |el| {
        let v = el.value();
        v.attr("amp").is_some() || v.attr("⚡").is_some()
    });

    if !is_amp {
        return (AmpStatus::None, issues);
    }

    let canonical = ctx.facts.and_then(|f| f.canonical.as_deref());
    match canonical {
        None => {
            issues.push(Issue::new(
                ctx.url,
                "amp",
                "amp-canonical-mismatch",
                IssueSeverity::Medium,
                IssueKind::Warning,
                "AMP page declares no canonical back to the original",
            ));
        }
        Some(c) if c == ctx.url => {
            issues.push(Issue::new(
                ctx.url,
                "amp",
                "amp-canonical-mismatch",
                IssueSeverity::Medium,
                IssueKind::Warning,
                "AMP page canonicalises to itself instead of the original",
            ));
        }
        Some(_) => {}
    }

    (AmpStatus::HasAmp, issues)
}

/// CustomSearch (§4.9, §9): counts how many matches each configured
/// rule finds on the page body. No issues — counts only.
pub fn analyze_custom_search(ctx: &AnalysisContext) -> HashMap<String, usize> {
    let mut out = HashMap::new();
    let Some(body) = ctx.body else { return out };
    for rule in ctx.custom_search {
        if let Ok(selector) = parse_selector(&rule.selector) {
            out.insert(rule.name.clone(), apply_selector(&selector, body).len());
        }
    }
    out
}

/// CustomExtraction (§4.9, §9): the matched strings themselves, per
/// configured rule.
pub fn analyze_custom_extraction(ctx: &AnalysisContext) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    let Some(body) = ctx.body else { return out };
    for rule in ctx.custom_extraction {
        if let Ok(selector) = parse_selector(&rule.selector) {
            out.insert(rule.name.clone(), apply_selector(&selector, body));
        }
    }
    out
}
