use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

fn default_true() -> bool {
    true
}

/// Top-level configuration for a crawl session (§6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Seed URLs the crawl starts from.
    pub seeds: Vec<String>,

    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub redirects: RedirectsConfig,
    #[serde(default)]
    pub robots: RobotsConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub normalisation: NormalisationConfig,
    #[serde(default)]
    pub authentication: AuthConfig,
    #[serde(default)]
    pub storage_flags: StorageFlags,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub custom_search: Vec<CustomRule>,
    #[serde(default)]
    pub custom_extraction: Vec<CustomRule>,

    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    Bfs,
    Dfs,
}

impl Default for TraversalMode {
    fn default() -> Self {
        TraversalMode::Bfs
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TraversalConfig {
    #[serde(default)]
    pub mode: TraversalMode,
    pub max_depth: Option<u32>,
    pub max_urls: Option<usize>,
    pub max_query_params: Option<usize>,
    #[serde(default = "default_max_response_size")]
    pub max_response_size: u64,
    /// Wall-clock crawl duration cap, in seconds.
    pub crawl_duration_secs: Option<u64>,
}

fn default_max_response_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            mode: TraversalMode::default(),
            max_depth: None,
            max_urls: None,
            max_query_params: None,
            max_response_size: default_max_response_size(),
            crawl_duration_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolitenessConfig {
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_crawl_delay_ms")]
    pub crawl_delay_ms: u64,
    pub per_host_rate_limit: Option<f64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_rps() -> f64 {
    5.0
}
fn default_concurrency() -> usize {
    8
}
fn default_crawl_delay_ms() -> u64 {
    0
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            concurrency: default_concurrency(),
            crawl_delay_ms: default_crawl_delay_ms(),
            per_host_rate_limit: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl PolitenessConfig {
    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectPolicy {
    Follow,
    NoFollow,
    FollowSameHost,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        RedirectPolicy::Follow
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RedirectsConfig {
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
    #[serde(default)]
    pub policy: RedirectPolicy,
}

fn default_max_redirects() -> u32 {
    10
}

impl Default for RedirectsConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            policy: RedirectPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RobotsConfig {
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,
    #[serde(default = "default_true")]
    pub respect_nofollow: bool,
    #[serde(default)]
    pub follow_canonicals: bool,
    #[serde(default)]
    pub crawl_sitemap_urls: bool,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            respect_robots_txt: true,
            respect_nofollow: true,
            follow_canonicals: false,
            crawl_sitemap_urls: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FiltersConfig {
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub crawl_outside_start_folder: bool,
    #[serde(default)]
    pub include_subdomains: bool,
    #[serde(default)]
    pub allowed_content_types: Vec<String>,
    #[serde(default)]
    pub exclude_extensions: Vec<String>,
}

fn default_ignore_query_params() -> Vec<String> {
    vec![
        "utm_source".into(),
        "utm_medium".into(),
        "utm_campaign".into(),
        "utm_term".into(),
        "utm_content".into(),
        "gclid".into(),
        "fbclid".into(),
        "msclkid".into(),
        "ref".into(),
        "source".into(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NormalisationConfig {
    #[serde(default = "default_ignore_query_params")]
    pub ignore_query_params: Vec<String>,
    #[serde(default = "default_true")]
    pub sort_query_params: bool,
    #[serde(default = "default_true")]
    pub remove_trailing_slash: bool,
    #[serde(default)]
    pub lowercase_urls: bool,
    #[serde(default)]
    pub strip_www: bool,
}

impl Default for NormalisationConfig {
    fn default() -> Self {
        Self {
            ignore_query_params: default_ignore_query_params(),
            sort_query_params: true,
            remove_trailing_slash: true,
            lowercase_urls: false,
            strip_www: false,
        }
    }
}

impl NormalisationConfig {
    /// Builds the [`crate::url::NormalizeOptions`] this config describes,
    /// for use against both seed and discovered URLs.
    pub fn to_normalize_options(&self) -> crate::url::NormalizeOptions {
        crate::url::NormalizeOptions {
            ignore_params: self.ignore_query_params.iter().cloned().collect(),
            strip_www: self.strip_www,
            lowercase_all: self.lowercase_urls,
            sort_query_params: self.sort_query_params,
            remove_trailing_slash: self.remove_trailing_slash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    None,
    Basic,
    Bearer,
    Cookie,
    Form,
}

impl Default for AuthType {
    fn default() -> Self {
        AuthType::None
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthConfig {
    #[serde(default)]
    pub auth_type: AuthType,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub login_url: Option<String>,
    #[serde(default)]
    pub form_fields: HashMap<String, String>,
    pub success_url: Option<String>,
    pub success_text: Option<String>,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
    /// Paths to Netscape-format cookie files to seed the jar with.
    #[serde(default)]
    pub cookie_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageFlags {
    #[serde(default)]
    pub store_html: bool,
    #[serde(default = "default_true")]
    pub store_headers: bool,
}

/// Optional overrides for `analysis::Thresholds`; unset fields keep the
/// spec defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThresholdsConfig {
    pub title_min: Option<usize>,
    pub title_max: Option<usize>,
    pub meta_desc_min: Option<usize>,
    pub meta_desc_max: Option<usize>,
    pub h1_max: Option<usize>,
    pub url_max: Option<usize>,
    pub thin_content_words: Option<usize>,
    pub large_image_bytes: Option<u64>,
    pub slow_response_ms: Option<u64>,
    pub max_redirect_chain: Option<usize>,
}

/// A user-configured rule for the `CustomSearch`/`CustomExtraction`
/// analyzers (§4.9, §9). `selector` follows the restricted grammar:
/// `regex:<pattern>`, `substring:<text>`, `#id`, `.class`, `tag`,
/// `tag[attr]`, `//tag`, `//tag/@attr`, `//tag/text()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CustomRule {
    pub name: String,
    pub selector: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    pub crawler_name: String,
    pub crawler_version: String,
    pub contact_url: String,
    pub contact_email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    pub database_path: String,
    pub summary_path: String,
}
