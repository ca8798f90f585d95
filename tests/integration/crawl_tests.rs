//! End-to-end crawl tests driven against wiremock servers.

use seo_crawl_core::analysis::CrawlStatus;
use seo_crawl_core::config::{
    AuthConfig, Config, FiltersConfig, NormalisationConfig, OutputConfig, PolitenessConfig,
    RedirectsConfig, RobotsConfig, StorageFlags, ThresholdsConfig, TraversalConfig, TraversalMode,
    UserAgentConfig,
};
use seo_crawl_core::crawler::run_crawl;
use seo_crawl_core::output::load_statistics;
use seo_crawl_core::storage::{SqliteStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(seeds: Vec<String>, db_path: &str, max_depth: Option<u32>) -> Config {
    Config {
        seeds,
        traversal: TraversalConfig {
            mode: TraversalMode::Bfs,
            max_depth,
            max_urls: None,
            max_query_params: None,
            max_response_size: 10 * 1024 * 1024,
            crawl_duration_secs: Some(30),
        },
        politeness: PolitenessConfig {
            requests_per_second: 50.0,
            concurrency: 4,
            crawl_delay_ms: 0,
            per_host_rate_limit: Some(50.0),
            timeout_secs: 10,
            max_retries: 0,
            retry_backoff_ms: 10,
        },
        redirects: RedirectsConfig::default(),
        robots: RobotsConfig {
            respect_robots_txt: false,
            respect_nofollow: true,
            follow_canonicals: false,
            crawl_sitemap_urls: false,
        },
        filters: FiltersConfig::default(),
        normalisation: NormalisationConfig::default(),
        authentication: AuthConfig::default(),
        storage_flags: StorageFlags::default(),
        thresholds: ThresholdsConfig::default(),
        custom_search: Vec::new(),
        custom_extraction: Vec::new(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            summary_path: "/tmp/test_summary.md".to_string(),
        },
    }
}

fn temp_db(name: &str) -> String {
    format!("/tmp/{}_{}.db", name, std::process::id())
}

#[tokio::test]
async fn test_full_crawl_discovers_and_persists_linked_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Home</title></head><body>
                    <a href="{base}/page1">Page 1</a>
                    <a href="{base}/page2">Page 2</a>
                    </body></html>"#
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Page 1</title></head><body>Content 1</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Page 2</title></head><body>Content 2</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let db_path = temp_db("full_crawl");
    let _ = std::fs::remove_file(&db_path);

    let config = test_config(vec![format!("{base}/")], &db_path, Some(2));
    run_crawl(config, "testhash".to_string()).await.expect("crawl failed");

    let storage = SqliteStorage::new(std::path::Path::new(&db_path)).expect("failed to open db");
    let urls = storage.get_all_urls().expect("get_all_urls failed");
    assert_eq!(urls.len(), 3, "expected /, /page1, /page2 to be recorded");
    assert!(urls.iter().all(|u| u.status == CrawlStatus::Crawled));

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_crawl_with_depth_limit_stops_admission() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Root</title></head><body><a href="{base}/level1">L1</a></body></html>"#
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/level1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Level 1</title></head><body><a href="{base}/level2">L2</a></body></html>"#
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    // level2 is beyond the depth cap; it must never be requested.
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unreachable"))
        .expect(0)
        .mount(&server)
        .await;

    let db_path = temp_db("depth_limit");
    let _ = std::fs::remove_file(&db_path);

    // Root is depth 0, /level1 is depth 1: max_depth=1 admits both but
    // rejects /level2 (depth 2) at the frontier before it is ever fetched.
    let config = test_config(vec![format!("{base}/")], &db_path, Some(1));
    run_crawl(config, "testhash".to_string()).await.expect("crawl failed");

    let storage = SqliteStorage::new(std::path::Path::new(&db_path)).expect("failed to open db");
    let urls = storage.get_all_urls().expect("get_all_urls failed");
    assert_eq!(urls.len(), 2, "expected only / and /level1 to be recorded");
    assert!(urls.iter().any(|u| u.normalized.ends_with("/level1") || u.raw.ends_with("/level1")));
    assert!(!urls.iter().any(|u| u.normalized.ends_with("/level2") || u.raw.ends_with("/level2")));

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_crawl_summary_reflects_completed_session() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Home</title></head><body>hi</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let db_path = temp_db("summary");
    let _ = std::fs::remove_file(&db_path);

    let config = test_config(vec![format!("{base}/")], &db_path, Some(0));
    run_crawl(config, "testhash".to_string()).await.expect("crawl failed");

    let storage = SqliteStorage::new(std::path::Path::new(&db_path)).expect("failed to open db");
    let summary = load_statistics(&storage).expect("load_statistics failed");
    assert_eq!(summary.status.to_string(), "completed");
    assert_eq!(summary.urls_crawled, 1);
    assert_eq!(summary.success_rate(), 100.0);

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_discovered_link_variants_deduplicate_via_normalization() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Three hrefs that all normalize to the same key (trailing slash,
    // a dot-segment, and a stripped tracking parameter) must collapse to
    // a single frontier entry and a single recorded URL.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Home</title></head><body>
                    <a href="{base}/dup">Dup 1</a>
                    <a href="{base}/dup/">Dup 2</a>
                    <a href="{base}/a/../dup?utm_source=x">Dup 3</a>
                    </body></html>"#
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dup"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Dup</title></head><body>hi</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let db_path = temp_db("dedup_normalize");
    let _ = std::fs::remove_file(&db_path);

    let config = test_config(vec![format!("{base}/")], &db_path, Some(1));
    run_crawl(config, "testhash".to_string()).await.expect("crawl failed");

    let storage = SqliteStorage::new(std::path::Path::new(&db_path)).expect("failed to open db");
    let urls = storage.get_all_urls().expect("get_all_urls failed");
    assert_eq!(urls.len(), 2, "expected only / and one normalized /dup row");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_lone_fragment_link_is_not_crawled() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><title>Home</title></head><body>
                    <a href="#section">Jump</a>
                    <a href="javascript:void(0)">JS</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let db_path = temp_db("lone_fragment");
    let _ = std::fs::remove_file(&db_path);

    let config = test_config(vec![format!("{base}/")], &db_path, Some(2));
    run_crawl(config, "testhash".to_string()).await.expect("crawl failed");

    let storage = SqliteStorage::new(std::path::Path::new(&db_path)).expect("failed to open db");
    let urls = storage.get_all_urls().expect("get_all_urls failed");
    assert_eq!(urls.len(), 1, "the lone-fragment and javascript: hrefs must never be admitted");

    let _ = std::fs::remove_file(&db_path);
}
