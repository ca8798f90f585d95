//! Crawl summary generation (§6): a [`CrawlSummary`] assembled from a
//! closed-out session, rendered to stdout (`stats`) or to a markdown
//! file (`markdown`).

mod markdown;
mod stats;
mod traits;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics};
pub use traits::{severity_bucket, CrawlSummary, SessionStatusLabel};

use crate::storage::Storage;
use crate::SumiError;

/// Generates a [`CrawlSummary`] from the latest session recorded in
/// `storage`. Equivalent to [`load_statistics`], exposed under this name
/// for the `--export-summary` entry point.
pub fn generate_summary(storage: &dyn Storage) -> Result<CrawlSummary, SumiError> {
    load_statistics(storage)
}
