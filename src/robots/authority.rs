//! Per-host robots.txt authority (§4.4): lazily fetches and caches one
//! parsed robots.txt per host, refetching once the cache entry goes
//! stale, and serves `isAllowed`/crawl-delay queries from it.

use crate::robots::{fetch_robots, CachedRobots, ParsedRobots};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub struct RobotsAuthority {
    cache: Mutex<HashMap<String, CachedRobots>>,
    user_agent: String,
    enabled: bool,
}

impl RobotsAuthority {
    pub fn new(user_agent: impl Into<String>, enabled: bool) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            user_agent: user_agent.into(),
            enabled,
        }
    }

    /// True if `path` on `host` is allowed. Always true when robots.txt
    /// handling is disabled in config.
    pub async fn is_allowed(&self, host: &str, path: &str) -> bool {
        if !self.enabled {
            return true;
        }
        self.get_or_fetch(host).await.is_allowed(path, &self.user_agent)
    }

    /// The crawl delay robots.txt declares for this host, if any.
    pub async fn crawl_delay(&self, host: &str) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        self.get_or_fetch(host)
            .await
            .crawl_delay(&self.user_agent)
            .map(Duration::from_secs_f64)
    }

    /// Sitemap URLs declared by `host`'s robots.txt.
    pub async fn sitemaps(&self, host: &str) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        self.get_or_fetch(host).await.sitemaps().to_vec()
    }

    async fn get_or_fetch(&self, host: &str) -> ParsedRobots {
        let cached = {
            let guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .get(host)
                .filter(|c| !c.is_stale())
                .map(|c| c.content.clone())
        };
        if let Some(content) = cached {
            return content;
        }

        let fetched = fetch_robots(host, &self.user_agent)
            .await
            .unwrap_or_else(|_| ParsedRobots::allow_all());
        let mut guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(host.to_string(), CachedRobots::new(fetched.clone()));
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_always_allows() {
        let authority = RobotsAuthority::new("TestBot", false);
        assert!(authority.is_allowed("example.invalid", "/private").await);
    }

    #[tokio::test]
    async fn test_unreachable_host_falls_back_to_allow_all() {
        // No network access in test environments; the fetch fails and the
        // authority must fall back to permissive rather than propagate.
        let authority = RobotsAuthority::new("TestBot", true);
        assert!(authority.is_allowed("invalid.invalid.invalid", "/x").await);
    }
}
