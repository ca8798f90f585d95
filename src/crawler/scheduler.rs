//! Worker-pool scheduler (§4.8): pops frontier items, applies the
//! politeness and robots gates, fetches, extracts, classifies links,
//! analyses, and persists — until the frontier drains or the crawl is
//! cancelled.
//!
//! `fetch_with_retry` already exhausts the configured retry/backoff
//! policy (§4.5) before returning, so a frontier pop is matched by
//! exactly one outcome: a success that gets marked visited and whose
//! discovered links get pushed, or a terminal failure that gets marked
//! visited with no links pushed. Nothing here requeues for a transient
//! fetch error — only `CancelToken` early-exit leaves an item
//! permanently unprocessed.

use crate::analysis::{
    analyze_page, resources_from_facts, AnalysisContext, CrawlStatus, CrossPageIndex, Fetch,
    Issue, Link, PageReport, Resource, Thresholds,
};
use crate::auth::SessionProvider;
use crate::cancel::CancelToken;
use crate::config::{CustomRule, PolitenessConfig, RedirectsConfig};
use crate::crawler::fetcher::fetch_with_retry;
use crate::extract::{extract_page_facts, ExtractionCaps};
use crate::frontier::{FrontierItem, SharedFrontier};
use crate::links::{classify_link, LinkFilters, RawLink};
use crate::pause::PauseToken;
use crate::politeness::PolitenessGovernor;
use crate::robots::{parse_meta_robots, parse_x_robots_tag, RobotsAuthority, RobotsDirectives};
use crate::storage::{NewUrl, Storage};
use crate::url::NormalizeOptions;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Everything one worker needs that does not change across the crawl.
/// Built once by the coordinator and shared (via `Arc`) across the
/// worker pool.
pub struct Scheduler {
    pub frontier: SharedFrontier,
    pub politeness: Arc<PolitenessGovernor>,
    pub robots: Arc<RobotsAuthority>,
    pub client: Client,
    pub auth: Arc<SessionProvider>,
    pub storage: Arc<Mutex<dyn Storage>>,
    pub cross_page_index: Arc<Mutex<CrossPageIndex>>,
    pub normalized_of: Arc<Mutex<HashMap<String, String>>>,
    pub cancel: CancelToken,
    /// §4.8 step 1: every worker blocks here on each loop iteration while
    /// paused, resuming once [`PauseToken::resume`] is called or the
    /// crawl is cancelled.
    pub pause: PauseToken,
    pub redirects: RedirectsConfig,
    pub politeness_config: PolitenessConfig,
    pub max_response_size: u64,
    pub extraction_caps: ExtractionCaps,
    pub link_filters: Arc<LinkFilters>,
    pub thresholds: Arc<Thresholds>,
    pub custom_search: Arc<Vec<CustomRule>>,
    pub custom_extraction: Arc<Vec<CustomRule>>,
    pub respect_robots_txt: bool,
    pub respect_nofollow: bool,
    pub seed: Url,
    pub normalize_options: NormalizeOptions,
    /// How many of the spawned workers (indices `0..worker_count`)
    /// should be actively popping right now; the rest idle. Set once
    /// per tick from `politeness.backpressure.worker_count()`.
    pub active_workers: AtomicUsize,
    pub max_workers: usize,
    /// Number of frontier items popped but not yet fully processed;
    /// used to tell "frontier empty, nothing in flight, crawl is done"
    /// apart from "frontier momentarily empty, a worker might still
    /// enqueue more".
    in_flight: AtomicUsize,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frontier: SharedFrontier,
        politeness: Arc<PolitenessGovernor>,
        robots: Arc<RobotsAuthority>,
        client: Client,
        auth: Arc<SessionProvider>,
        storage: Arc<Mutex<dyn Storage>>,
        cross_page_index: Arc<Mutex<CrossPageIndex>>,
        normalized_of: Arc<Mutex<HashMap<String, String>>>,
        cancel: CancelToken,
        pause: PauseToken,
        redirects: RedirectsConfig,
        politeness_config: PolitenessConfig,
        max_response_size: u64,
        link_filters: LinkFilters,
        thresholds: Thresholds,
        custom_search: Vec<CustomRule>,
        custom_extraction: Vec<CustomRule>,
        respect_robots_txt: bool,
        respect_nofollow: bool,
        seed: Url,
        max_workers: usize,
        normalize_options: NormalizeOptions,
    ) -> Self {
        Self {
            frontier,
            politeness,
            robots,
            client,
            auth,
            storage,
            cross_page_index,
            normalized_of,
            cancel,
            pause,
            redirects,
            politeness_config,
            max_response_size,
            extraction_caps: ExtractionCaps::default(),
            link_filters: Arc::new(link_filters),
            thresholds: Arc::new(thresholds),
            custom_search: Arc::new(custom_search),
            custom_extraction: Arc::new(custom_extraction),
            respect_robots_txt,
            respect_nofollow,
            seed,
            normalize_options,
            active_workers: AtomicUsize::new(max_workers),
            max_workers,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Spawns the worker pool and awaits every worker's completion.
    /// Returns once the frontier has drained and nothing is in flight,
    /// or immediately once `cancel` fires.
    pub async fn run(self: &Arc<Self>) {
        let mut handles = Vec::with_capacity(self.max_workers);
        for index in 0..self.max_workers {
            let scheduler = Arc::clone(self);
            handles.push(tokio::spawn(async move { scheduler.worker_loop(index).await }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn worker_loop(&self, index: usize) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            self.pause.wait_while_paused(&self.cancel).await;
            if self.cancel.is_cancelled() {
                return;
            }

            // `BackpressureController::worker_count()` scales against its own
            // default bounds; the scheduler instead scales the pressure
            // level against the configured concurrency directly.
            let allowed = self
                .politeness
                .backpressure
                .pressure_level()
                .worker_count(self.max_workers, 1);
            self.active_workers.store(allowed, Ordering::Relaxed);
            if index >= allowed.max(1) {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {},
                    _ = self.cancel.cancelled() => return,
                }
                continue;
            }

            let Some(item) = self.frontier.pop() else {
                if self.in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {},
                    _ = self.cancel.cancelled() => return,
                }
                continue;
            };

            self.in_flight.fetch_add(1, Ordering::AcqRel);
            self.process_item(item).await;
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }
    }

    async fn process_item(&self, item: FrontierItem) {
        let Ok(target_url) = Url::parse(&item.raw) else {
            self.frontier.mark_visited(&item.normalized);
            return;
        };
        let Some(host) = target_url.host_str().map(str::to_string) else {
            self.frontier.mark_visited(&item.normalized);
            return;
        };

        if self.respect_robots_txt
            && !self
                .robots
                .is_allowed(&host, target_url.path())
                .await
        {
            self.frontier.mark_visited(&item.normalized);
            self.record_terminal(&item, CrawlStatus::Skipped, None);
            return;
        }

        let robots_delay = if self.respect_robots_txt {
            self.robots.crawl_delay(&host).await
        } else {
            None
        };
        if !self.politeness.acquire(&host, robots_delay, &self.cancel).await {
            // Cancelled mid-wait; leave the item unvisited so a resumed
            // session picks it back up.
            self.frontier.requeue(item);
            return;
        }

        self.politeness.backpressure.request_started();
        let start = std::time::Instant::now();
        let (result, retry_count) = fetch_with_retry(
            &self.client,
            &self.auth,
            target_url.as_str(),
            &self.redirects,
            self.max_response_size,
            &self.politeness_config,
        )
        .await;
        let was_error = match &result {
            Err(_) => true,
            Ok((fetch, _)) => fetch.is_server_error(),
        };
        self.politeness
            .backpressure
            .request_finished(was_error, start.elapsed());

        self.frontier.mark_visited(&item.normalized);

        match result {
            Ok((fetch, body)) => self.handle_fetched(&item, fetch, body, retry_count),
            Err(err) => {
                self.record_terminal(&item, CrawlStatus::Failed, Some(err.to_string()));
            }
        }
    }

    fn handle_fetched(&self, item: &FrontierItem, fetch: Fetch, body: String, retry_count: u32) {
        let final_url = match Url::parse(&fetch.final_url) {
            Ok(u) => u,
            Err(_) => return,
        };
        let is_internal = final_url.host_str() == self.seed.host_str();

        let is_html = fetch
            .content_type
            .as_deref()
            .map(|ct| ct.contains("html"))
            .unwrap_or(false);

        let facts = if is_html && fetch.is_success() {
            Some(extract_page_facts(&body, &final_url, &self.extraction_caps))
        } else {
            None
        };

        let mut directives = RobotsDirectives::default();
        if let Some(facts) = &facts {
            if let Some(meta) = &facts.meta_robots {
                directives.merge(&parse_meta_robots(meta));
            }
        }
        if let Some(header) = fetch.headers.get("x-robots-tag") {
            directives.merge(&parse_x_robots_tag(header, "*"));
        }

        let resources = facts
            .as_ref()
            .map(|f| resources_from_facts(&fetch.final_url, f))
            .unwrap_or_default();

        let classified_links: Vec<_> = facts
            .as_ref()
            .map(|f| {
                f.links
                    .iter()
                    .filter_map(|raw: &RawLink| {
                        classify_link(
                            raw,
                            &final_url,
                            &self.seed,
                            directives.nofollow,
                            &self.link_filters,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let links: Vec<Link> = classified_links
            .iter()
            .map(|c| Link {
                from_url: fetch.final_url.clone(),
                to_url: c.target.to_string(),
                anchor_text: c.anchor_text.clone(),
                is_internal: c.is_internal,
                is_follow: c.is_follow,
                target_status: None,
                target_is_redirect: false,
            })
            .collect();

        let ctx = AnalysisContext {
            url: &fetch.final_url,
            depth: item.depth,
            fetch: &fetch,
            facts: facts.as_ref(),
            body: Some(body.as_str()),
            directives: directives.clone(),
            links: &links,
            resources: &resources,
            thresholds: self.thresholds.as_ref(),
            custom_search: self.custom_search.as_ref(),
            custom_extraction: self.custom_extraction.as_ref(),
        };
        let report: PageReport = analyze_page(&ctx);

        self.persist_page(item, &fetch, retry_count, facts.as_ref(), &links, &resources, &report);

        {
            let mut index = self.cross_page_index.lock().unwrap_or_else(|e| e.into_inner());
            index.record_page(&fetch.final_url, item.depth, is_internal, facts.as_ref());
            for link in &links {
                index.record_link(link);
            }
        }
        self.normalized_of
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fetch.final_url.clone(), item.normalized.clone());

        if !directives.is_indexable() {
            return;
        }

        for classified in &classified_links {
            if !classified.admitted || !classified.is_internal {
                continue;
            }
            let Ok(normalized) =
                crate::url::normalize_with(classified.target.as_str(), &self.normalize_options)
            else {
                continue;
            };
            let next = FrontierItem::new(
                normalized.as_str(),
                classified.target.as_str(),
                item.depth + 1,
            )
            .with_discovered_from(item.normalized.clone());
            self.frontier.push(next);
        }
    }

    fn persist_page(
        &self,
        item: &FrontierItem,
        fetch: &Fetch,
        retry_count: u32,
        facts: Option<&crate::extract::PageFacts>,
        links: &[Link],
        resources: &[Resource],
        report: &PageReport,
    ) {
        let mut storage = self.storage.lock().unwrap_or_else(|e| e.into_inner());

        let new_url = NewUrl {
            normalized: item.normalized.clone(),
            raw: item.raw.clone(),
            host: Url::parse(&item.raw)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default(),
            depth: item.depth,
            discovered_from: item.discovered_from.clone(),
            is_internal: true,
        };
        let Ok(url_id) = storage.insert_url(&new_url) else { return };
        let status = if fetch.is_success() {
            CrawlStatus::Crawled
        } else {
            CrawlStatus::Failed
        };
        let _ = storage.update_url_status(url_id, status);
        let _ = storage.insert_fetch(url_id, fetch, retry_count, None);

        if let Some(facts) = facts {
            let _ = storage.insert_page_facts(url_id, facts);
        }

        let mut link_rows = Vec::with_capacity(links.len());
        for link in links {
            let to_id = storage.get_url_by_normalized(&link.to_url).ok().flatten().map(|u| u.id);
            link_rows.push((url_id, to_id, link.clone()));
        }
        let _ = storage.insert_links(&link_rows);

        for resource in resources {
            if let Ok(resource_id) = storage.insert_resource(resource) {
                let _ = storage.link_page_resource(url_id, resource_id);
            }
        }

        for issue in &report.issues {
            let _ = storage.insert_issue(issue);
        }
    }

    fn record_terminal(&self, item: &FrontierItem, status: CrawlStatus, error: Option<String>) {
        let mut storage = self.storage.lock().unwrap_or_else(|e| e.into_inner());
        let new_url = NewUrl {
            normalized: item.normalized.clone(),
            raw: item.raw.clone(),
            host: Url::parse(&item.raw)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default(),
            depth: item.depth,
            discovered_from: item.discovered_from.clone(),
            is_internal: true,
        };
        if let Ok(url_id) = storage.insert_url(&new_url) {
            let _ = storage.update_url_status(url_id, status);
            if let Some(error) = error {
                tracing::debug!(url = %item.raw, %error, "terminal fetch failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::frontier::FrontierConfig;
    use crate::politeness::PolitenessGovernor;
    use crate::storage::SqliteStorage;

    fn test_scheduler() -> Arc<Scheduler> {
        let frontier = SharedFrontier::new(FrontierConfig::default());
        let politeness = Arc::new(PolitenessGovernor::new(1, 1000.0, Duration::from_millis(0)));
        let robots = Arc::new(RobotsAuthority::new("TestBot", false));
        let client = reqwest::Client::new();
        let auth = Arc::new(SessionProvider::new(AuthConfig::default()));
        let storage: Arc<Mutex<dyn Storage>> = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        let seed = Url::parse("https://example.com/").unwrap();
        Arc::new(Scheduler::new(
            frontier,
            politeness,
            robots,
            client,
            auth,
            storage,
            Arc::new(Mutex::new(CrossPageIndex::default())),
            Arc::new(Mutex::new(HashMap::new())),
            CancelToken::new(),
            PauseToken::new(),
            RedirectsConfig::default(),
            PolitenessConfig::default(),
            10 * 1024 * 1024,
            LinkFilters::default(),
            Thresholds::default(),
            Vec::new(),
            Vec::new(),
            false,
            true,
            seed,
            1,
            NormalizeOptions::default(),
        ))
    }

    #[tokio::test]
    async fn test_empty_frontier_completes_immediately() {
        let scheduler = test_scheduler();
        scheduler.run().await;
        assert_eq!(scheduler.frontier.size(), 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_worker_loop() {
        let scheduler = test_scheduler();
        scheduler
            .frontier
            .push(FrontierItem::new("https://example.invalid/", "https://example.invalid/", 0));
        scheduler.cancel.cancel();
        scheduler.run().await;
        // Cancelled before any pop could complete; frontier still holds the item.
        assert_eq!(scheduler.frontier.size(), 1);
    }

    #[tokio::test]
    async fn test_paused_worker_does_not_pop_until_resumed() {
        let scheduler = test_scheduler();
        scheduler
            .frontier
            .push(FrontierItem::new("https://example.invalid/", "https://example.invalid/", 0));
        scheduler.pause.pause();

        let run_handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Still paused: the item has not been popped.
        assert_eq!(scheduler.frontier.size(), 1);

        scheduler.cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), run_handle).await;
    }
}
