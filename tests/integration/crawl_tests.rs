//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for both the listing site and the
//! chat completions endpoint, and run the full crawl against them.

use listing_harvest::config::{ExtractorConfig, FetcherConfig, FlushMode};
use listing_harvest::crawler::{
    CrawlSettings, FetchOutcome, HttpFetcher, LlmExtractor, ListingTarget, PageFetcher,
    PageProcessor, StructuredExtractor,
};
use listing_harvest::output::CsvSink;
use listing_harvest::record::RecordSchema;
use listing_harvest::state::{CrawlState, ResumeStore};
use listing_harvest::Coordinator;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SELECTOR: &str = "div.sku";

fn listing_page(products: &[&str]) -> String {
    let blocks: String = products
        .iter()
        .map(|name| {
            format!(
                r#"<div class="sku"><h3>{}</h3><span class="price">₹999</span></div>"#,
                name
            )
        })
        .collect();
    format!(
        "<html><head><title>Home Appliances</title></head><body><nav>Menu</nav>{}</body></html>",
        blocks
    )
}

fn exhausted_page() -> String {
    "<html><body><nav>Menu</nav><h2>No Results Found</h2></body></html>".to_string()
}

fn product(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "price": "₹999",
        "discount": "10%",
        "rating": "4.2",
        "category": "Home Appliances",
        "stock_availability": "In Stock",
        "description": format!("A dependable {}", name.to_lowercase()),
    })
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ],
        "usage": { "prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120 }
    })
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/pc/home-appliances/"))
        .and(query_param("page", page))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

async fn mount_extraction(server: &MockServer, trigger: &str, records: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains(trigger))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&records.to_string())))
        .mount(server)
        .await;
}

fn extractor_config(server: &MockServer) -> ExtractorConfig {
    ExtractorConfig {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        model: "gpt-4o-mini".to_string(),
        api_key_env: "UNUSED".to_string(),
        temperature: 0.0,
        chunk_size: 12_000,
        instruction: "Extract products as a JSON array.".to_string(),
        timeout: 5,
    }
}

fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        user_agent: "TestHarvester/1.0".to_string(),
        timeout: 5,
    }
}

fn target(server: &MockServer) -> ListingTarget {
    ListingTarget {
        base_url: Url::parse(&format!("{}/pc/home-appliances/", server.uri())).unwrap(),
        page_param: "page".to_string(),
        css_selector: SELECTOR.to_string(),
        session_id: "integration_session".to_string(),
        no_results_marker: "No Results Found".to_string(),
    }
}

fn settings(max_fetch_retries: u32) -> CrawlSettings {
    CrawlSettings {
        page_delay: Duration::from_millis(10),
        max_fetch_retries,
        retry_delay: Duration::from_millis(10),
        max_pages: None,
        flush: FlushMode::EndOfRun,
    }
}

fn coordinator(
    server: &MockServer,
    dir: &TempDir,
    max_fetch_retries: u32,
) -> Coordinator<HttpFetcher, LlmExtractor, CsvSink> {
    let schema = RecordSchema::default();
    Coordinator::new(
        PageProcessor::new(
            HttpFetcher::new(fetcher_config()),
            LlmExtractor::new(extractor_config(server), "test-key").unwrap(),
            target(server),
            schema.clone(),
        ),
        ResumeStore::new(dir.path().join("last_page.txt")),
        CsvSink::new(dir.path().join("extracted_details.csv"), schema),
        settings(max_fetch_retries),
    )
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("Failed to open CSV")
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_until_no_results() {
    let server = MockServer::start().await;

    mount_page(&server, "1", listing_page(&["Kettle", "Toaster"])).await;
    mount_page(&server, "2", listing_page(&["Iron", "Mixer"])).await;
    mount_page(&server, "3", exhausted_page()).await;
    mount_extraction(&server, "Kettle", json!([product("Kettle"), product("Toaster")])).await;
    mount_extraction(&server, "Iron", json!([product("Iron"), product("Mixer")])).await;

    let dir = TempDir::new().unwrap();
    let mut coordinator = coordinator(&server, &dir, 0);
    let report = coordinator.run(false).await.expect("Crawl failed");

    assert_eq!(report.final_state(), CrawlState::StoppedNoResults);
    assert_eq!(report.records_saved, 4);
    assert_eq!(report.last_completed_page, Some(2));

    let rows = read_csv(&dir.path().join("extracted_details.csv"));
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0][0], "name");
    assert_eq!(rows[0][6], "description");
    let names: Vec<&str> = rows[1..].iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, vec!["Kettle", "Toaster", "Iron", "Mixer"]);
    assert_eq!(rows[1][5], "In Stock");

    assert_eq!(
        std::fs::read_to_string(dir.path().join("last_page.txt")).unwrap(),
        "2"
    );

    let usage = coordinator.processor().extractor().usage();
    assert_eq!(usage.requests, 2);
    assert_eq!(usage.total_tokens, 240);
    assert_eq!(coordinator.processor().fetcher().session_count(), 1);
}

#[tokio::test]
async fn test_second_run_resumes_and_appends() {
    let server = MockServer::start().await;

    mount_page(&server, "1", listing_page(&["Kettle", "Toaster"])).await;
    mount_page(&server, "2", listing_page(&["Iron", "Mixer"])).await;
    mount_page(&server, "3", exhausted_page()).await;
    mount_extraction(&server, "Kettle", json!([product("Kettle"), product("Toaster")])).await;
    mount_extraction(&server, "Iron", json!([product("Iron"), product("Mixer")])).await;

    let dir = TempDir::new().unwrap();
    ResumeStore::new(dir.path().join("last_page.txt"))
        .write(1)
        .unwrap();

    let report = coordinator(&server, &dir, 0).run(false).await.unwrap();
    assert_eq!(report.first_page, 2);
    assert_eq!(report.records_saved, 2);

    // Page 1 was never requested on the resumed run
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .filter(|r| r.method == wiremock::http::Method::Get)
        .all(|r| !r.url.query().unwrap_or_default().contains("page=1")));

    // A later run starting over appends without a second header
    let report = coordinator(&server, &dir, 0).run(true).await.unwrap();
    assert_eq!(report.records_saved, 4);

    let rows = read_csv(&dir.path().join("extracted_details.csv"));
    assert_eq!(rows.iter().filter(|r| r[0] == "name").count(), 1);
    assert_eq!(rows.len(), 1 + 2 + 4);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pc/home-appliances/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "1", listing_page(&["Kettle"])).await;
    mount_page(&server, "2", exhausted_page()).await;
    mount_extraction(&server, "Kettle", json!([product("Kettle")])).await;

    let dir = TempDir::new().unwrap();
    let report = coordinator(&server, &dir, 2).run(false).await.unwrap();

    assert_eq!(report.final_state(), CrawlState::StoppedNoResults);
    assert_eq!(report.stats.fetch_retries, 1);
    assert_eq!(report.records_saved, 1);
}

#[tokio::test]
async fn test_missing_page_ends_crawl_without_output() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pc/home-appliances/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = coordinator(&server, &dir, 3).run(false).await.unwrap();

    assert_eq!(report.final_state(), CrawlState::StoppedEmptyPage);
    assert_eq!(report.records_saved, 0);
    assert!(!dir.path().join("extracted_details.csv").exists());
    assert!(!dir.path().join("last_page.txt").exists());
}

#[tokio::test]
async fn test_incomplete_and_duplicate_records_are_filtered() {
    let server = MockServer::start().await;

    mount_page(&server, "1", listing_page(&["Kettle", "Lamp"])).await;
    mount_page(&server, "2", exhausted_page()).await;

    let mut lamp = product("Lamp");
    lamp.as_object_mut().unwrap().remove("rating");
    let reply = format!(
        "```json\n{}\n```",
        json!([product("Kettle"), product("Kettle"), lamp])
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = coordinator(&server, &dir, 0).run(false).await.unwrap();

    assert_eq!(report.records_saved, 1);
    assert_eq!(report.stats.duplicates_dropped, 1);
    assert_eq!(report.stats.incomplete_dropped, 1);
}

#[tokio::test]
async fn test_extractor_outage_stops_after_retries() {
    let server = MockServer::start().await;

    mount_page(&server, "1", listing_page(&["Kettle"])).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream overloaded"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = coordinator(&server, &dir, 1).run(false).await.unwrap();

    assert_eq!(report.final_state(), CrawlState::StoppedEmptyPage);
    assert_eq!(report.stats.fetch_retries, 1);
    assert_eq!(report.records_saved, 0);
}

#[tokio::test]
async fn test_http_fetcher_selects_blocks() {
    let server = MockServer::start().await;
    mount_page(&server, "1", listing_page(&["Kettle", "Toaster"])).await;

    let fetcher = HttpFetcher::new(fetcher_config());
    let url = target(&server).page_url(1);

    match fetcher.fetch(&url, SELECTOR, "s").await {
        FetchOutcome::Content(content) => {
            assert_eq!(content.lines().count(), 2);
            assert!(content.contains("Kettle"));
            assert!(!content.contains("Menu"));
        }
        other => panic!("Expected content, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_fetcher_falls_back_to_page_text() {
    let server = MockServer::start().await;
    mount_page(&server, "9", exhausted_page()).await;

    let fetcher = HttpFetcher::new(fetcher_config());
    let url = target(&server).page_url(9);

    assert_eq!(
        fetcher.fetch(&url, SELECTOR, "s").await,
        FetchOutcome::Content("Menu\nNo Results Found".to_string())
    );
}

#[tokio::test]
async fn test_http_fetcher_classifies_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(fetcher_config());
    let target = target(&server);

    assert!(matches!(
        fetcher.fetch(&target.page_url(1), SELECTOR, "s").await,
        FetchOutcome::Failed {
            transient: true,
            ..
        }
    ));
    assert!(matches!(
        fetcher.fetch(&target.page_url(2), SELECTOR, "s").await,
        FetchOutcome::Failed {
            transient: false,
            ..
        }
    ));

    let unreachable = Url::parse("http://127.0.0.1:1/listing?page=1").unwrap();
    assert!(matches!(
        fetcher.fetch(&unreachable, SELECTOR, "s").await,
        FetchOutcome::Failed {
            transient: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_llm_extractor_chunks_long_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(&json!([product("Fan")]).to_string())),
        )
        .expect(3)
        .mount(&server)
        .await;

    let mut config = extractor_config(&server);
    config.chunk_size = 500;
    let extractor = LlmExtractor::new(config, "test-key").unwrap();

    let content = "<div class=\"sku\">Fan</div> ".repeat(50);
    let records = extractor
        .extract(&content, &RecordSchema::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(extractor.usage().requests, 3);
    assert_eq!(extractor.usage().prompt_tokens, 300);
}
