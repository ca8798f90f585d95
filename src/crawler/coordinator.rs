//! Crawl coordinator (§4.8, §6): builds every crawl-wide collaborator
//! from a validated [`Config`] — frontier, politeness governor, robots
//! authority, session provider, storage, cross-page index — seeds the
//! frontier, drives the [`Scheduler`]'s worker pool to completion, runs
//! the cross-page finalizers, and closes out the session record.

use crate::analysis::{analyze_sitemaps, run_finalizers, CrossPageIndex, Thresholds};
use crate::auth::SessionProvider;
use crate::cancel::CancelToken;
use crate::pause::PauseToken;
use crate::config::{Config, RobotsConfig, TraversalMode as ConfigTraversalMode};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::scheduler::Scheduler;
use crate::frontier::{FrontierConfig, FrontierItem, SharedFrontier, TraversalMode};
use crate::links::LinkFilters;
use crate::politeness::PolitenessGovernor;
use crate::robots::RobotsAuthority;
use crate::sitemap::parse_sitemap;
use crate::storage::{SessionProgress, SessionStatus, SqliteStorage, Storage};
use crate::url::{normalize_with, same_domain, same_host};
use crate::{ConfigError, SumiError};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;

/// Runs one crawl session to completion against a freshly opened
/// database. `config_hash` is recorded on the session row so a future
/// resume can detect a changed configuration.
pub async fn run_crawl(config: Config, config_hash: String) -> Result<(), SumiError> {
    run_crawl_with_cancel(config, config_hash, CancelToken::new()).await
}

/// As [`run_crawl`], but accepts a [`CancelToken`] the caller can fire
/// to stop the crawl early (signal handling, a wrapping timeout, tests).
pub async fn run_crawl_with_cancel(
    config: Config,
    config_hash: String,
    cancel: CancelToken,
) -> Result<(), SumiError> {
    run_crawl_with_controls(config, config_hash, cancel, PauseToken::new()).await
}

/// As [`run_crawl_with_cancel`], but also accepts a [`PauseToken`] the
/// caller can use to pause and resume the worker pool mid-crawl (§4.8
/// step 1) independently of cancellation.
pub async fn run_crawl_with_controls(
    config: Config,
    config_hash: String,
    cancel: CancelToken,
    pause: PauseToken,
) -> Result<(), SumiError> {
    let normalize_options = config.normalisation.to_normalize_options();
    let seeds: Vec<Url> = config
        .seeds
        .iter()
        .map(|s| normalize_with(s, &normalize_options).map_err(SumiError::UrlError))
        .collect::<Result<Vec<_>, _>>()?;
    let seed = seeds.first().cloned().ok_or_else(|| {
        SumiError::Config(ConfigError::Validation("no seed URLs configured".into()))
    })?;

    let client = build_http_client(&config.user_agent, &config.politeness)?;
    let auth = Arc::new(SessionProvider::new(config.authentication.clone()));
    auth.refresh_if_needed(&client).await?;

    let frontier = SharedFrontier::new(FrontierConfig {
        mode: match config.traversal.mode {
            ConfigTraversalMode::Bfs => TraversalMode::Bfs,
            ConfigTraversalMode::Dfs => TraversalMode::Dfs,
        },
        max_depth: config.traversal.max_depth,
        max_urls: config.traversal.max_urls.map(|n| n as u64),
    });
    for seed_url in &seeds {
        frontier.push(FrontierItem::new(seed_url.as_str(), seed_url.as_str(), 0));
    }

    let politeness = Arc::new(PolitenessGovernor::new(
        config.politeness.concurrency as f64,
        config
            .politeness
            .per_host_rate_limit
            .unwrap_or(config.politeness.requests_per_second),
        config.politeness.crawl_delay(),
    ));
    let robots = Arc::new(RobotsAuthority::new(
        format!(
            "{}/{}",
            config.user_agent.crawler_name, config.user_agent.crawler_version
        ),
        config.robots.respect_robots_txt,
    ));

    if config.robots.crawl_sitemap_urls {
        ingest_sitemaps(&client, &robots, &seed, &frontier, &config.robots, &normalize_options).await;
    }

    let storage_impl = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let storage: Arc<Mutex<dyn Storage>> = Arc::new(Mutex::new(storage_impl));
    let session_id = storage
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .create_session(&config.seeds, &config_hash)?;

    let link_filters = compile_link_filters(&config)?;
    let thresholds = Thresholds::with_overrides(&config.thresholds);
    let cross_page_index = Arc::new(Mutex::new(CrossPageIndex::default()));
    let normalized_of = Arc::new(Mutex::new(HashMap::new()));

    let robots_for_sitemaps = Arc::clone(&robots);
    let client_for_sitemaps = client.clone();
    let seed_for_sitemaps = seed.clone();

    let scheduler = Arc::new(Scheduler::new(
        frontier.clone(),
        politeness,
        robots,
        client,
        auth,
        Arc::clone(&storage),
        Arc::clone(&cross_page_index),
        Arc::clone(&normalized_of),
        cancel.clone(),
        pause,
        config.redirects.clone(),
        config.politeness.clone(),
        config.traversal.max_response_size,
        link_filters,
        thresholds,
        config.custom_search.clone(),
        config.custom_extraction.clone(),
        config.robots.respect_robots_txt,
        config.robots.respect_nofollow,
        seed,
        config.politeness.concurrency,
        normalize_options,
    ));

    match config.traversal.crawl_duration_secs {
        Some(secs) => {
            let deadline = tokio::time::Duration::from_secs(secs);
            let run_handle = {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move { scheduler.run().await })
            };
            if tokio::time::timeout(deadline, run_handle).await.is_err() {
                tracing::info!(secs, "crawl duration cap reached, cancelling remaining work");
                cancel.cancel();
            }
        }
        None => scheduler.run().await,
    }

    let mut finalizer_issues = {
        let index = cross_page_index.lock().unwrap_or_else(|e| e.into_inner());
        let normalized = normalized_of.lock().unwrap_or_else(|e| e.into_inner());
        run_finalizers(&index, &normalized)
    };

    if config.robots.crawl_sitemap_urls {
        let crawled = cross_page_index
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .all_crawled_urls
            .clone();
        finalizer_issues.extend(
            diff_sitemaps_against_crawl(&client_for_sitemaps, &robots_for_sitemaps, &seed_for_sitemaps, &crawled)
                .await,
        );
    }

    let session_status = {
        let mut storage_guard = storage.lock().unwrap_or_else(|e| e.into_inner());
        for issue in &finalizer_issues {
            let _ = storage_guard.insert_issue(issue);
        }

        let stats = storage_guard.stats()?;
        storage_guard.update_session_progress(
            session_id,
            &SessionProgress {
                crawled_count: stats.urls_crawled,
                failed_count: stats.urls_failed,
                skipped_count: stats.urls_skipped,
                queued_count: frontier.size() as u64,
            },
        )?;

        let status = if cancel.is_cancelled() {
            SessionStatus::Paused
        } else {
            SessionStatus::Completed
        };
        storage_guard.complete_session(session_id, status)?;
        status
    };

    tracing::info!(
        status = status_label(session_status),
        issues = finalizer_issues.len(),
        "crawl session finished"
    );
    Ok(())
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Running => "running",
        SessionStatus::Paused => "paused",
        SessionStatus::Completed => "completed",
        SessionStatus::Failed => "failed",
    }
}

fn compile_link_filters(config: &Config) -> Result<LinkFilters, SumiError> {
    let compile = |patterns: &[String]| -> Result<Vec<Regex>, SumiError> {
        patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| SumiError::Config(ConfigError::InvalidPattern(format!("{p}: {e}"))))
            })
            .collect()
    };
    Ok(LinkFilters {
        include_patterns: compile(&config.filters.include_patterns)?,
        exclude_patterns: compile(&config.filters.exclude_patterns)?,
        exclude_extensions: config.filters.exclude_extensions.clone(),
        include_subdomains: config.filters.include_subdomains,
    })
}

/// Walks the seed host's declared sitemaps (robots.txt `Sitemap:`
/// directives), recursing through sitemap-index files, and seeds the
/// frontier with every in-scope URL discovered. Bounded to 200 sitemap
/// documents so a misbehaving site can't turn this into an unbounded
/// fetch loop; documents beyond the cap are silently skipped.
async fn ingest_sitemaps(
    client: &reqwest::Client,
    robots: &RobotsAuthority,
    seed: &Url,
    frontier: &SharedFrontier,
    filters: &RobotsConfig,
    normalize_options: &crate::url::NormalizeOptions,
) {
    let Some(host) = seed.host_str() else { return };
    let mut pending: Vec<String> = robots.sitemaps(host).await;
    let mut visited: HashSet<String> = HashSet::new();
    let mut fetched = 0usize;

    while let Some(sitemap_url) = pending.pop() {
        if fetched >= 200 || !visited.insert(sitemap_url.clone()) {
            continue;
        }
        fetched += 1;

        let Ok(response) = client.get(&sitemap_url).send().await else {
            continue;
        };
        let Ok(body) = response.text().await else {
            continue;
        };
        let parsed = parse_sitemap(&body);

        pending.extend(parsed.sitemap_index);

        for entry in &parsed.urls {
            let Ok(target) = Url::parse(&entry.loc) else {
                continue;
            };
            let in_scope = if filters.crawl_sitemap_urls {
                same_domain(seed, &target) || same_host(seed, &target)
            } else {
                same_host(seed, &target)
            };
            if !in_scope {
                continue;
            }
            let Ok(normalized) = normalize_with(target.as_str(), normalize_options) else {
                continue;
            };
            frontier.push(
                FrontierItem::new(normalized.as_str(), target.as_str(), 0)
                    .with_discovered_from("sitemap".to_string()),
            );
        }
    }
}

/// Loads sitemap entries for `seed`'s host and diffs them against the
/// cross-page index's crawled set, returning presence issues. Separate
/// from [`ingest_sitemaps`] since the index is only populated after the
/// scheduler finishes; called by [`run_crawl_with_cancel`] only when
/// sitemap crawling was enabled and sitemaps were found.
async fn diff_sitemaps_against_crawl(
    client: &reqwest::Client,
    robots: &RobotsAuthority,
    seed: &Url,
    crawled: &HashSet<String>,
) -> Vec<crate::analysis::Issue> {
    let Some(host) = seed.host_str() else { return Vec::new() };
    let mut issues = Vec::new();
    for sitemap_url in robots.sitemaps(host).await {
        let Ok(response) = client.get(&sitemap_url).send().await else { continue };
        let Ok(body) = response.text().await else { continue };
        let parsed = parse_sitemap(&body);
        let (_presence, found) = analyze_sitemaps(&parsed.urls, crawled);
        issues.extend(found);
    }
    issues
}
