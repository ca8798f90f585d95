//! Markdown summary generation (§6).
//!
//! Renders a [`CrawlSummary`] as a human-readable report, mirroring the
//! table-based layout `--stats` prints to stdout.

use crate::output::traits::CrawlSummary;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Writes a markdown summary of `summary` to `output_path`.
///
/// # Returns
///
/// * `Ok(())` - the file was written successfully
/// * `Err(io::Error)` - the file could not be created or written
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> io::Result<()> {
    let markdown = format_markdown_summary(summary);
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())
}

/// Formats a [`CrawlSummary`] as markdown.
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Crawl Summary\n\n");

    md.push_str("## Session\n\n");
    md.push_str(&format!("- **Session ID**: {}\n", summary.session_id));
    md.push_str(&format!("- **Seeds**: {}\n", summary.seeds.join(", ")));
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(completed) = &summary.completed_at {
        md.push_str(&format!("- **Completed**: {}\n", completed));
    }
    md.push_str(&format!("- **Config hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **URLs total**: {}\n", summary.urls_total));
    md.push_str(&format!("- **Unique hosts**: {}\n", summary.unique_hosts));
    md.push_str(&format!("- **Total links**: {}\n", summary.total_links));
    md.push_str(&format!("- **Success rate**: {:.2}%\n\n", summary.success_rate()));

    md.push_str("## URL State Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Crawled | {} |\n", summary.urls_crawled));
    md.push_str(&format!("| Failed | {} |\n", summary.urls_failed));
    md.push_str(&format!("| Skipped | {} |\n", summary.urls_skipped));
    md.push_str(&format!("| Pending | {} |\n\n", summary.urls_pending));

    if summary.redirect_chains_total > 0 {
        md.push_str("## Redirects\n\n");
        md.push_str(&format!("- **Chains recorded**: {}\n", summary.redirect_chains_total));
        md.push_str(&format!(
            "- **Chains with loops**: {}\n",
            summary.redirect_chains_with_loops
        ));
        md.push_str(&format!(
            "- **Longest chain**: {} hops\n\n",
            summary.longest_redirect_chain
        ));
    }

    if !summary.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | URLs |\n");
        md.push_str("|-------|------|\n");
        let mut depths: Vec<_> = summary.depth_breakdown.iter().collect();
        depths.sort_by_key(|(d, _)| **d);
        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if summary.issues_total > 0 {
        md.push_str("## Issues\n\n");
        md.push_str(&format!("Total: {}\n\n", summary.issues_total));
        md.push_str("| Severity | Count |\n");
        md.push_str("|----------|-------|\n");
        md.push_str(&format!("| Critical | {} |\n", summary.issues_critical));
        md.push_str(&format!("| High | {} |\n", summary.issues_high));
        md.push_str(&format!("| Medium | {} |\n", summary.issues_medium));
        md.push_str(&format!("| Low | {} |\n\n", summary.issues_low));

        if !summary.issues_by_category.is_empty() {
            md.push_str("### By Category\n\n");
            md.push_str("| Category | Count |\n");
            md.push_str("|----------|-------|\n");
            for (category, count) in &summary.issues_by_category {
                md.push_str(&format!("| {} | {} |\n", category, count));
            }
            md.push('\n');
        }
    }

    md
}
