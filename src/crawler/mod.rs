//! Crawler module: HTTP fetching with retry, the worker-pool scheduler,
//! and the coordinator that wires every collaborator together from a
//! [`Config`] and drives one crawl session to completion.

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{run_crawl, run_crawl_with_cancel, run_crawl_with_controls};
pub use fetcher::{build_http_client, fetch_url, fetch_url_with_body, fetch_with_retry, is_retryable, FetchError};
pub use scheduler::Scheduler;

use crate::config::Config;
use crate::SumiError;

/// Runs a complete crawl operation against `config`, recording
/// `config_hash` on the session row.
///
/// # Example
///
/// ```no_run
/// use seo_crawl_core::config::load_config_with_hash;
/// use seo_crawl_core::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// crawl(config, hash).await?;
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, config_hash: String) -> Result<(), SumiError> {
    run_crawl(config, config_hash).await
}
