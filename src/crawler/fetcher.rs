//! HTTP fetcher (§4.5).
//!
//! Redirects are handled manually (the client is built with
//! `redirect::Policy::none()`) so each hop can be recorded into a
//! `RedirectChain`, checked against the configured policy, and checked
//! for loops — none of which `reqwest`'s built-in follower exposes.

use crate::analysis::{Fetch, RedirectChain, RedirectHop};
use crate::auth::SessionProvider;
use crate::config::{PolitenessConfig, RedirectPolicy, RedirectsConfig, UserAgentConfig};
use crate::url::same_host;
use reqwest::{redirect::Policy, Client};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// A fetch that produced no `Fetch` record at all: the request never
/// reached a server response we can classify into a status code.
#[derive(Debug, Clone)]
pub enum FetchError {
    Dns(String),
    Connect(String),
    Tls(String),
    Timeout,
    Read(String),
    SizeCap,
    TooManyRedirects,
    RedirectLoop,
    InvalidRedirectTarget(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dns(e) => write!(f, "dns resolution failed: {e}"),
            Self::Connect(e) => write!(f, "connection failed: {e}"),
            Self::Tls(e) => write!(f, "tls handshake failed: {e}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Read(e) => write!(f, "body read failed: {e}"),
            Self::SizeCap => write!(f, "response exceeded max-response-size"),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::RedirectLoop => write!(f, "redirect loop detected"),
            Self::InvalidRedirectTarget(l) => write!(f, "invalid redirect location: {l}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Whether a completed attempt (`Ok(Fetch)` or `Err(FetchError)`) is
/// worth retrying, per §4.5: 5xx/408/429 and transport errors are
/// retryable; other 4xx are not.
pub fn is_retryable(result: &Result<Fetch, FetchError>) -> bool {
    match result {
        Ok(fetch) => fetch.is_server_error() || matches!(fetch.status, 408 | 429),
        Err(FetchError::Dns(_))
        | Err(FetchError::Connect(_))
        | Err(FetchError::Tls(_))
        | Err(FetchError::Timeout)
        | Err(FetchError::Read(_)) => true,
        Err(_) => false,
    }
}

/// Builds the HTTP client used for both page fetches and robots.txt
/// lookups. Redirects are disabled here; the fetcher follows them by
/// hand so it can build a `RedirectChain`.
pub fn build_http_client(ua: &UserAgentConfig, politeness: &PolitenessConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        ua.crawler_name, ua.crawler_version, ua.contact_url, ua.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(politeness.timeout())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .cookie_store(true)
        .build()
}

fn classify_transport_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        return FetchError::Timeout;
    }
    if e.is_connect() {
        let msg = e.to_string();
        if msg.contains("dns") || msg.contains("resolve") || msg.contains("lookup") {
            return FetchError::Dns(msg);
        }
        if msg.contains("tls") || msg.contains("ssl") || msg.contains("certificate") {
            return FetchError::Tls(msg);
        }
        return FetchError::Connect(msg);
    }
    FetchError::Read(e.to_string())
}

fn resolve_location(base: &str, location: &str) -> Option<String> {
    let base_url = url::Url::parse(base).ok()?;
    base_url.join(location).ok().map(|u| u.to_string())
}

/// Fetches `url`, following redirects per `redirects` and capping the
/// body at `max_response_size` bytes. Unlike the extractor's per-field
/// caps, crossing this limit aborts the fetch (`FetchError::SizeCap`)
/// rather than truncating and continuing — it exists to bound crawler
/// memory, not to salvage a partial page.
///
/// Returns the terminal response alongside the body text, which the
/// scheduler feeds straight into extraction without a second request.
async fn fetch_inner(
    client: &Client,
    auth: &SessionProvider,
    url: &str,
    redirects: &RedirectsConfig,
    max_response_size: u64,
) -> Result<(Fetch, String), FetchError> {
    let original_url = url::Url::parse(url).ok();

    let mut current = url.to_string();
    let mut hops: Vec<RedirectHop> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let overall_start = Instant::now();

    loop {
        if !visited.insert(current.clone()) {
            return Err(FetchError::RedirectLoop);
        }
        if hops.len() as u32 > redirects.max_redirects {
            return Err(FetchError::TooManyRedirects);
        }

        let request = auth.apply_to(client.get(&current));
        let send_start = Instant::now();
        let response = request.send().await.map_err(|e| classify_transport_error(&e))?;
        let ttfb = send_start.elapsed();

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let content_type = headers.get("content-type").cloned();

        if status.is_redirection() && redirects.policy != RedirectPolicy::NoFollow {
            let location = headers.get("location").cloned();
            let Some(location) = location else {
                return Err(FetchError::InvalidRedirectTarget("missing Location".into()));
            };
            let Some(resolved) = resolve_location(&current, &location) else {
                return Err(FetchError::InvalidRedirectTarget(location));
            };

            if redirects.policy == RedirectPolicy::FollowSameHost {
                let target_url = url::Url::parse(&resolved).ok();
                let same = match (&original_url, &target_url) {
                    (Some(a), Some(b)) => same_host(a, b),
                    _ => false,
                };
                if !same {
                    let fetch = Fetch {
                        url: url.to_string(),
                        final_url: resolved,
                        status: status.as_u16(),
                        headers,
                        redirect_chain: RedirectChain { hops },
                        ttfb,
                        total_time: overall_start.elapsed(),
                        body_size: 0,
                        truncated: false,
                        content_type,
                    };
                    return Ok((fetch, String::new()));
                }
            }

            hops.push(RedirectHop {
                from: current.clone(),
                to: resolved.clone(),
                status: status.as_u16(),
            });
            current = resolved;
            continue;
        }

        let mut body = Vec::new();
        let mut truncated = false;
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await.map_err(|e| classify_transport_error(&e))? {
            if body.len() as u64 + chunk.len() as u64 > max_response_size {
                let remaining = max_response_size.saturating_sub(body.len() as u64) as usize;
                body.extend_from_slice(&chunk[..remaining.min(chunk.len())]);
                truncated = true;
                return Err(FetchError::SizeCap);
            }
            body.extend_from_slice(&chunk);
        }
        let _ = truncated; // kept for clarity; size-cap crossing always returns above

        let text = String::from_utf8_lossy(&body).into_owned();
        let fetch = Fetch {
            url: url.to_string(),
            final_url: current,
            status: status.as_u16(),
            headers,
            redirect_chain: RedirectChain { hops },
            ttfb,
            total_time: overall_start.elapsed(),
            body_size: body.len() as u64,
            truncated: false,
            content_type,
        };
        return Ok((fetch, text));
    }
}

/// Fetches `url` and returns the terminal `Fetch` record only.
pub async fn fetch_url(
    client: &Client,
    auth: &SessionProvider,
    url: &str,
    redirects: &RedirectsConfig,
    max_response_size: u64,
) -> Result<Fetch, FetchError> {
    fetch_inner(client, auth, url, redirects, max_response_size)
        .await
        .map(|(fetch, _)| fetch)
}

/// Fetches `url` and returns both the `Fetch` record and the response
/// body, for callers (the scheduler) that need to run extraction over
/// it without a second round trip.
pub async fn fetch_url_with_body(
    client: &Client,
    auth: &SessionProvider,
    url: &str,
    redirects: &RedirectsConfig,
    max_response_size: u64,
) -> Result<(Fetch, String), FetchError> {
    fetch_inner(client, auth, url, redirects, max_response_size).await
}

/// Wraps [`fetch_url_with_body`] with the configured retry policy:
/// 5xx/408/429 responses and transport errors get retried with
/// exponential backoff (`base * 2^attempt`), up to
/// `politeness.max_retries`. Returns the attempt count alongside the
/// result so callers can persist `retry_count`.
pub async fn fetch_with_retry(
    client: &Client,
    auth: &SessionProvider,
    url: &str,
    redirects: &RedirectsConfig,
    max_response_size: u64,
    politeness: &PolitenessConfig,
) -> (Result<(Fetch, String), FetchError>, u32) {
    let mut attempt = 0;
    loop {
        let result = fetch_url_with_body(client, auth, url, redirects, max_response_size).await;
        let retryable = match &result {
            Ok((fetch, _)) => is_retryable(&Ok(fetch.clone())),
            Err(e) => is_retryable(&Err(e.clone())),
        };
        if attempt >= politeness.max_retries || !retryable {
            return (result, attempt);
        }
        let backoff = politeness.retry_backoff() * 2u32.pow(attempt);
        tracing::debug!(url, attempt, ?backoff, "retrying fetch");
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn ua() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&ua(), &PolitenessConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_is_retryable_5xx() {
        let fetch = Fetch {
            url: "https://x/".into(),
            final_url: "https://x/".into(),
            status: 503,
            headers: Default::default(),
            redirect_chain: RedirectChain::default(),
            ttfb: Duration::ZERO,
            total_time: Duration::ZERO,
            body_size: 0,
            truncated: false,
            content_type: None,
        };
        assert!(is_retryable(&Ok(fetch)));
    }

    #[test]
    fn test_is_not_retryable_404() {
        let fetch = Fetch {
            url: "https://x/".into(),
            final_url: "https://x/".into(),
            status: 404,
            headers: Default::default(),
            redirect_chain: RedirectChain::default(),
            ttfb: Duration::ZERO,
            total_time: Duration::ZERO,
            body_size: 0,
            truncated: false,
            content_type: None,
        };
        assert!(!is_retryable(&Ok(fetch)));
    }

    #[test]
    fn test_is_retryable_timeout() {
        assert!(is_retryable(&Err(FetchError::Timeout)));
    }

    #[test]
    fn test_is_not_retryable_redirect_loop() {
        assert!(!is_retryable(&Err(FetchError::RedirectLoop)));
    }

    #[tokio::test]
    async fn test_fetch_url_success() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = build_http_client(&ua(), &PolitenessConfig::default()).unwrap();
        let auth = SessionProvider::new(AuthConfig::default());
        let (fetch, body) = fetch_url_with_body(&client, &auth, &server.uri(), &RedirectsConfig::default(), 1024 * 1024)
            .await
            .unwrap();
        assert_eq!(fetch.status, 200);
        assert!(!fetch.truncated);
        assert!(body.contains("<html>"));
    }

    #[tokio::test]
    async fn test_fetch_url_follows_redirect() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/old"))
            .respond_with(wiremock::ResponseTemplate::new(301).insert_header("Location", "/new"))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/new"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = build_http_client(&ua(), &PolitenessConfig::default()).unwrap();
        let auth = SessionProvider::new(AuthConfig::default());
        let url = format!("{}/old", server.uri());
        let fetch = fetch_url(&client, &auth, &url, &RedirectsConfig::default(), 1024 * 1024)
            .await
            .unwrap();
        assert_eq!(fetch.status, 200);
        assert_eq!(fetch.redirect_chain.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_url_no_follow_stops_at_redirect() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/old"))
            .respond_with(wiremock::ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&server)
            .await;

        let client = build_http_client(&ua(), &PolitenessConfig::default()).unwrap();
        let auth = SessionProvider::new(AuthConfig::default());
        let redirects = RedirectsConfig {
            max_redirects: 10,
            policy: RedirectPolicy::NoFollow,
        };
        let url = format!("{}/old", server.uri());
        let fetch = fetch_url(&client, &auth, &url, &redirects, 1024 * 1024).await.unwrap();
        assert_eq!(fetch.status, 302);
        assert!(fetch.redirect_chain.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_url_size_cap_aborts() {
        let server = wiremock::MockServer::start().await;
        let big = "x".repeat(2048);
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(big))
            .mount(&server)
            .await;

        let client = build_http_client(&ua(), &PolitenessConfig::default()).unwrap();
        let auth = SessionProvider::new(AuthConfig::default());
        let result = fetch_url(&client, &auth, &server.uri(), &RedirectsConfig::default(), 512).await;
        assert!(matches!(result, Err(FetchError::SizeCap)));
    }
}
