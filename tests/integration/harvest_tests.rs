//! Integration tests for complete harvest runs
//!
//! These tests use wiremock to stand in for the directory site, the object
//! store and the mail API, and run `run_harvest` end-to-end.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yp_harvest::config::{
    Config, CrawlerConfig, NotifyConfig, OutputConfig, RunParams, SiteConfig, StorageConfig,
};
use yp_harvest::crawler::run_harvest;
use yp_harvest::{HarvestError, SiteKind};

const PAGE_ONE: &str = r#"<html><body>
  <div class="listing">
    <div class="listing__content">
      <a class="listing__name--link jsListingName" href="/bus/Ontario/Toronto/Acme-Bakery/1111111.html">Acme Bakery</a>
      <div class="listing__headings"><a href="/cat/1">Bakery</a></div>
      <span itemprop="streetAddress">12 Queen St W</span>
      <span itemprop="addressLocality">Toronto</span>
      <span itemprop="addressRegion">ON</span>
      <span itemprop="postalCode">M5H 2N2</span>
      <ul class="mlr__submenu"><li>416-555-0100</li></ul>
    </div>
  </div>
  <div class="listing">
    <div class="listing__content">
      <a class="listing__name--link jsListingName" href="/bus/Ontario/Toronto/Crumb-Co/2222222.html">Crumb Co</a>
      <div class="listing__headings"><a href="/cat/1">Bakery</a></div>
      <ul class="mlr__submenu"><li>416-555-0200</li></ul>
    </div>
  </div>
  <div class="listing">
    <div class="listing__content">
      <a class="listing__name--link jsListingName" href="/bus/Ontario/Toronto/Acme-Bakery/1111111.html">Acme Bakery</a>
      <div class="listing__headings"><a href="/cat/1">Bakery</a></div>
      <ul class="mlr__submenu"><li>416-555-0100</li></ul>
    </div>
  </div>
  <div class="pagination"><a href="/search/si/2/bakery/Toronto">Next &raquo;</a></div>
</body></html>"#;

const PAGE_TWO: &str = r#"<html><body>
  <div class="listing">
    <div class="listing__content">
      <a class="listing__name--link jsListingName" href="/bus/Ontario/Toronto/Pipe-Pros/3333333.html">Pipe Pros</a>
      <div class="listing__headings"><a href="/cat/9">Plumbers</a></div>
      <ul class="mlr__submenu"><li>416-555-0300</li></ul>
    </div>
  </div>
</body></html>"#;

/// Writes single-column term files and returns their paths
fn write_terms(dir: &Path, what: &[&str], place: &[&str]) -> (PathBuf, PathBuf) {
    let what_path = dir.join("what.csv");
    let where_path = dir.join("where.csv");
    std::fs::write(&what_path, format!("what\n{}\n", what.join("\n"))).unwrap();
    std::fs::write(&where_path, format!("where\n{}\n", place.join("\n"))).unwrap();
    (what_path, where_path)
}

fn test_config(server: &MockServer, base_dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrent_requests: 2,
            download_delay_ms: 0,
            request_timeout_secs: 5,
            max_attempts: 3,
        },
        output: OutputConfig {
            base_dir: base_dir.join("data").display().to_string(),
        },
        site: SiteConfig {
            base_url: Some(server.uri()),
        },
        storage: None,
        notify: None,
    }
}

fn canada_params(dir: &Path) -> RunParams {
    let (what, place) = write_terms(dir, &["bakery"], &["Toronto"]);
    let mut params = RunParams::new(SiteKind::YellowPagesCanada);
    params.what_file = Some(what);
    params.where_file = Some(place);
    params.dir_name = Some("batch-1".to_string());
    params.source = "integration".to_string();
    params.proxies_file = dir.join("no-proxies.json");
    params
}

async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/si/1/bakery/Toronto"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_ONE))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/si/2/bakery/Toronto"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_TWO))
        .expect(1)
        .mount(server)
        .await;
}

fn run_dir(base: &Path) -> PathBuf {
    base.join("data")
        .join("YP_Canada")
        .join("output")
        .join("batch-1")
}

fn read_summary(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(content.trim_start_matches('\u{feff}')).unwrap()
}

#[tokio::test]
async fn test_full_run_writes_csv_and_summary() {
    let server = MockServer::start().await;
    mount_directory(&server).await;

    let temp = TempDir::new().unwrap();
    let config = test_config(&server, temp.path());
    let params = canada_params(temp.path());

    let summary = run_harvest(&config, &params, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(summary.notes, "finished");
    assert_eq!(summary.unique_items, 3);
    assert_eq!(summary.duplicate_items, 1);
    assert_eq!(summary.total_encountered, 4);
    assert_eq!(summary.saved_items, 3);
    assert_eq!(summary.written_items, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.total_requests, 2);
    assert_eq!(summary.total_responses, 2);
    assert_eq!(summary.category_matching, "no");
    assert!(summary.run_id.starts_with("yellowpages_canada-"));

    let dir = run_dir(temp.path());
    let csv = std::fs::read_to_string(dir.join("output.csv")).unwrap();
    assert!(csv.starts_with('\u{feff}'));
    assert!(csv.contains("Acme Bakery"));
    assert!(csv.contains("Pipe Pros"));
    assert_eq!(csv.matches("Acme Bakery").count(), 1);
    assert_eq!(csv.lines().count(), 4);

    let json = read_summary(&dir.join("summary.json"));
    assert_eq!(json["unique_items"], 3);
    assert_eq!(json["what_inputs"][0], "bakery");
    assert_eq!(json["where_inputs"][0], "Toronto");
    assert_eq!(json["source"], "integration");
    assert!(json.get("output_url").is_none());
}

#[tokio::test]
async fn test_category_matching_excludes_other_trades() {
    let server = MockServer::start().await;
    mount_directory(&server).await;

    let temp = TempDir::new().unwrap();
    let config = test_config(&server, temp.path());
    let mut params = canada_params(temp.path());
    params.category_matching = true;

    let summary = run_harvest(&config, &params, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(summary.unique_items, 3);
    assert_eq!(summary.excluded_record_count, 1);
    assert_eq!(summary.saved_items, 2);
    assert_eq!(summary.category_matching, "yes");

    let csv = std::fs::read_to_string(run_dir(temp.path()).join("output.csv")).unwrap();
    assert!(!csv.contains("Pipe Pros"));
}

#[tokio::test]
async fn test_server_error_without_proxies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = test_config(&server, temp.path());
    let params = canada_params(temp.path());

    let summary = run_harvest(&config, &params, std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.saved_items, 0);
    assert_eq!(summary.notes, "finished");
    assert!(run_dir(temp.path()).join("summary.json").exists());
}

#[tokio::test]
async fn test_missing_terms_fail_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = test_config(&server, temp.path());
    let mut params = canada_params(temp.path());
    params.what_file = Some(temp.path().join("missing.csv"));

    let result = run_harvest(&config, &params, std::future::pending::<()>()).await;
    assert!(matches!(result, Err(HarvestError::Config(_))));
}

#[tokio::test]
async fn test_storage_run_uploads_outputs() {
    std::env::set_var("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");

    let server = MockServer::start().await;
    mount_directory(&server).await;

    let store = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/listings/.*/YP_Canada/output/batch-1/output\.csv$"))
        .and(header_exists("authorization"))
        .and(body_string_contains("Acme Bakery"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&store)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/listings/.*/YP_Canada/output/batch-1/summary\.json$"))
        .and(body_string_contains("\"unique_items\": 3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&store)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = test_config(&server, temp.path());
    config.storage = Some(StorageConfig {
        bucket: "listings".to_string(),
        region: "ca-central-1".to_string(),
        endpoint: Some(store.uri()),
        public_read: true,
    });
    let mut params = canada_params(temp.path());
    params.save_to_storage = true;

    let summary = run_harvest(&config, &params, std::future::pending::<()>())
        .await
        .unwrap();

    assert!(summary.output_file.starts_with("s3://listings/"));
    assert!(summary.output_url.is_some());
    assert!(summary.summary_url.is_some());
    assert!(!run_dir(temp.path()).join("output.csv").exists());
}

#[tokio::test]
async fn test_notification_sent_on_completion() {
    std::env::set_var("MAILGUN_API_KEY", "key-integration");

    let server = MockServer::start().await;
    mount_directory(&server).await;

    let mail = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mg.example.com/messages"))
        .and(body_string_contains("to=ops%40example.com"))
        .and(body_string_contains("3+saved"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mail)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = test_config(&server, temp.path());
    config.notify = Some(NotifyConfig {
        api_base: mail.uri(),
        domain: "mg.example.com".to_string(),
        sender: None,
        recipients: Vec::new(),
    });
    let mut params = canada_params(temp.path());
    params.notify_to = vec!["ops@example.com".to_string()];

    let summary = run_harvest(&config, &params, std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(summary.saved_items, 3);
}
