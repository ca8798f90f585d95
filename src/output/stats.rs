//! Statistics generation from a crawl database (§6).
//!
//! Builds a [`CrawlSummary`] from whatever session a database has most
//! recently recorded, and prints it to stdout for `--stats` mode.

use crate::analysis::IssueSeverity;
use crate::output::traits::{severity_bucket, CrawlSummary};
use crate::storage::Storage;
use crate::SumiError;
use std::collections::HashMap;

/// Loads the latest session's [`CrawlSummary`] from storage.
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - the latest session, if one has ever run
/// * `Err(SumiError)` - the storage layer failed to answer a query
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlSummary, SumiError> {
    let mut summary = match storage.get_latest_session()? {
        Some(session) => CrawlSummary::from_session(&session),
        None => CrawlSummary::new(),
    };

    let stats = storage.stats()?;
    summary.urls_total = stats.urls_total;
    summary.urls_crawled = stats.urls_crawled;
    summary.urls_failed = stats.urls_failed;
    summary.urls_skipped = stats.urls_skipped;
    summary.urls_pending = stats.urls_pending;
    summary.issues_total = stats.issues_total;
    summary.issues_critical = stats.issues_critical;
    summary.issues_high = stats.issues_high;
    summary.issues_medium = stats.issues_medium;
    summary.issues_low = stats.issues_low;

    let urls = storage.get_all_urls()?;
    let mut depth_breakdown: HashMap<u32, u64> = HashMap::new();
    let mut hosts = std::collections::HashSet::new();
    for url in &urls {
        *depth_breakdown.entry(url.depth).or_insert(0) += 1;
        hosts.insert(url.host.clone());
    }
    summary.depth_breakdown = depth_breakdown;
    summary.unique_hosts = hosts.len() as u64;

    summary.total_links = storage.get_all_links()?.len() as u64;

    let chains = storage.get_redirect_chains()?;
    summary.redirect_chains_total = chains.len() as u64;
    summary.redirect_chains_with_loops = chains.iter().filter(|c| c.has_loop()).count() as u64;
    summary.longest_redirect_chain = chains.iter().map(|c| c.length()).max().unwrap_or(0);

    let mut by_category: HashMap<&'static str, u64> = HashMap::new();
    for record in storage.get_all_issues()? {
        *by_category.entry(record.issue.category).or_insert(0) += 1;
    }
    let mut issues_by_category: Vec<(String, u64)> = by_category
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    issues_by_category.sort_by(|a, b| b.1.cmp(&a.1));
    summary.issues_by_category = issues_by_category;

    Ok(summary)
}

/// Prints a [`CrawlSummary`] to stdout in a human-readable format.
pub fn print_statistics(summary: &CrawlSummary) {
    println!("=== Crawl Statistics ===\n");

    println!("Session:");
    println!("  ID: {}", summary.session_id);
    println!("  Status: {}", summary.status);
    println!("  Started: {}", summary.started_at);
    if let Some(completed) = &summary.completed_at {
        println!("  Completed: {}", completed);
    }
    println!();

    println!("URLs:");
    println!("  Total: {}", summary.urls_total);
    println!("  Crawled: {}", summary.urls_crawled);
    println!("  Failed: {}", summary.urls_failed);
    println!("  Skipped: {}", summary.urls_skipped);
    println!("  Pending: {}", summary.urls_pending);
    println!("  Success rate: {:.1}%", summary.success_rate());
    println!();

    println!("Link graph:");
    println!("  Total links: {}", summary.total_links);
    println!("  Unique hosts: {}", summary.unique_hosts);
    println!();

    if summary.redirect_chains_total > 0 {
        println!("Redirects:");
        println!("  Chains recorded: {}", summary.redirect_chains_total);
        println!("  Chains with loops: {}", summary.redirect_chains_with_loops);
        println!("  Longest chain: {} hops", summary.longest_redirect_chain);
        println!();
    }

    if !summary.depth_breakdown.is_empty() {
        println!("Depth breakdown:");
        let mut depths: Vec<_> = summary.depth_breakdown.iter().collect();
        depths.sort_by_key(|(d, _)| **d);
        for (depth, count) in depths {
            println!("  depth {}: {}", depth, count);
        }
        println!();
    }

    if summary.issues_total > 0 {
        println!("Issues ({} total):", summary.issues_total);
        println!("  Critical: {}", summary.issues_critical);
        println!("  High: {}", summary.issues_high);
        println!("  Medium: {}", summary.issues_medium);
        println!("  Low: {}", summary.issues_low);
        println!("  Per crawled page: {:.2}", summary.issue_rate_per_page());
        if !summary.issues_by_category.is_empty() {
            println!("  By category:");
            for (category, count) in &summary.issues_by_category {
                println!("    {}: {}", category, count);
            }
        }
    }
}

/// Counts a severity toward the right bucket label, used by consumers
/// that iterate raw issues rather than the precomputed summary fields.
pub fn count_by_severity(severities: &[IssueSeverity]) -> HashMap<&'static str, u64> {
    let mut counts = HashMap::new();
    for severity in severities {
        *counts.entry(severity_bucket(*severity)).or_insert(0) += 1;
    }
    counts
}
