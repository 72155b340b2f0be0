//! Integration tests for the crawler
//!
//! These tests use wiremock to impersonate the provider's token endpoint,
//! feed listing and reply-tree endpoints, and run full crawls against it.

use serde_json::{json, Value};
use std::time::{Duration, Instant};
use undertow::config::{parse_config, Config, Credentials};
use undertow::crawler::run_crawl;
use undertow::UndertowError;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests that do not carry the given query parameter
struct MissingQueryParam(&'static str);

impl Match for MissingQueryParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, extra_crawl: &str, capacity: u32, interval_ms: u64) -> Config {
    parse_config(&format!(
        r#"
[crawl]
category = "all"
listing = "hot"
pages = 5
page-limit = 2
threshold = -100
reply-capacity = 64
{extra_crawl}

[rate-limit]
capacity = {capacity}
interval-ms = {interval_ms}

[api]
auth-url = "{base_url}/api/v1/access_token"
base-url = "{base_url}"
link-base-url = "https://links.example.com"
user-agent = "UndertowTest/1.0"
"#
    ))
    .expect("Failed to parse test config")
}

fn test_credentials() -> Credentials {
    Credentials::from_lookup(|name| Some(format!("{}-value", name.to_lowercase())))
        .expect("Failed to build credentials")
}

fn post(id: &str, subreddit: &str, anchor: bool) -> Value {
    let mut data = json!({
        "id": id,
        "score": 10,
        "num_comments": 3,
        "subreddit": subreddit,
        "permalink": format!("/r/{}/comments/{}/title_{}/", subreddit, id, id),
        "title": format!("Title {}", id),
        "created_utc": 1_700_000_000.0
    });
    if anchor {
        data["name"] = json!(format!("t3_{}", id));
    }
    json!({ "kind": "t3", "data": data })
}

fn listing(children: Vec<Value>) -> Value {
    json!({ "kind": "Listing", "data": { "after": null, "children": children } })
}

fn comment(id: &str, score: i64, replies: Vec<Value>) -> Value {
    let replies = if replies.is_empty() {
        json!("")
    } else {
        listing(replies)
    };
    json!({
        "kind": "t1",
        "data": {
            "id": id,
            "name": format!("t1_{}", id),
            "subreddit": "pics",
            "score": score,
            "body": format!("body of {}", id),
            "created_utc": 1_700_000_500.0,
            "replies": replies
        }
    })
}

fn more(ids: &[&str]) -> Value {
    json!({
        "kind": "more",
        "data": { "id": "_", "parent_id": "t3_x", "count": ids.len(), "children": ids }
    })
}

fn tree(item: Value, comments: Vec<Value>) -> Value {
    json!([listing(vec![item]), listing(comments)])
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(header("user-agent", "UndertowTest/1.0"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=undertow_username-value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "scope": "*"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_tree(server: &MockServer, subreddit: &str, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/comments/{}", subreddit, id)))
        .and(query_param("context", "0"))
        .and(query_param("sort", "old"))
        .and(header("authorization", "bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_follows_cursor_and_reports_sorted() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    // Page 1: no cursor
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(query_param("limit", "2"))
        .and(MissingQueryParam("after"))
        .and(header("authorization", "bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("a", "pics", true),
            post("b", "news", true),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Page 2: continues from the last item of page 1
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(query_param("after", "t3_b"))
        .and(query_param("count", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(listing(vec![post("c", "pics", true)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // Page 3: empty, ends pagination
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(query_param("after", "t3_c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_tree(
        &mock_server,
        "pics",
        "a",
        tree(
            post("a", "pics", true),
            vec![
                comment("a1", -150, vec![comment("a2", -50, vec![]), more(&["a9"])]),
                comment("a3", -200, vec![]),
            ],
        ),
    )
    .await;

    // Reply tree for b fails; the run carries on
    Mock::given(method("GET"))
        .and(path("/r/news/comments/b"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_tree(
        &mock_server,
        "pics",
        "c",
        tree(post("c", "pics", true), vec![comment("c1", -120, vec![])]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "", 60, 1000);
    let report = run_crawl(config, &test_credentials())
        .await
        .expect("Crawl failed");

    let scores: Vec<i64> = report.entries.iter().map(|e| e.score).collect();
    assert_eq!(scores, vec![-200, -150, -120]);

    let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a3", "a1", "c1"]);

    let owners: Vec<&str> = report
        .entries
        .iter()
        .map(|e| e.item.as_ref().expect("missing feed item").id.as_str())
        .collect();
    assert_eq!(owners, vec!["a", "a", "c"]);

    assert_eq!(report.stats.pages_requested, 3);
    assert_eq!(report.stats.feed_items, 3);
    assert_eq!(report.stats.trees_fetched, 2);
    assert_eq!(report.stats.nodes_flattened, 4);
    assert_eq!(report.stats.stubs_skipped, 1);
    assert_eq!(report.stats.failed_requests, 1);
    assert_eq!(report.stats.matches, 3);
    assert!(report.is_partial());
}

#[tokio::test]
async fn test_pagination_stops_without_anchor() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    // Two items and one undecodable child, the last item carrying no anchor
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("a", "pics", true),
            json!({ "kind": "t3", "data": { "id": "broken" } }),
            post("b", "pics", false),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_tree(
        &mock_server,
        "pics",
        "a",
        tree(post("a", "pics", true), vec![comment("a1", -101, vec![])]),
    )
    .await;
    mount_tree(
        &mock_server,
        "pics",
        "b",
        tree(post("b", "pics", false), vec![comment("b1", -100, vec![])]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "", 60, 1000);
    let report = run_crawl(config, &test_credentials())
        .await
        .expect("Crawl failed");

    assert_eq!(report.stats.pages_requested, 1);
    assert_eq!(report.stats.feed_items, 2);
    assert_eq!(report.stats.feed_items_skipped, 1);
    assert_eq!(report.stats.trees_fetched, 2);

    // -100 is not strictly below the threshold
    let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a1"]);
    assert!(!report.is_partial());
}

#[tokio::test]
async fn test_failed_page_ends_pagination() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), "", 60, 1000);
    let report = run_crawl(config, &test_credentials())
        .await
        .expect("A failed page must not fail the run");

    assert!(report.entries.is_empty());
    assert_eq!(report.stats.pages_requested, 1);
    assert_eq!(report.stats.failed_requests, 1);
}

#[tokio::test]
async fn test_malformed_tree_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(MissingQueryParam("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("a", "pics", true),
            post("b", "pics", true),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(query_param("after", "t3_b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r/pics/comments/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"a tree\"}"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_tree(
        &mock_server,
        "pics",
        "b",
        tree(post("b", "pics", true), vec![comment("b1", -300, vec![])]),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "", 60, 1000);
    let report = run_crawl(config, &test_credentials())
        .await
        .expect("Crawl failed");

    assert_eq!(report.stats.failed_requests, 1);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].id, "b1");
}

#[tokio::test]
async fn test_auth_failure_aborts_before_fetching() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), "", 60, 1000);
    let err = run_crawl(config, &test_credentials()).await.unwrap_err();

    assert!(matches!(err, UndertowError::Auth(_)), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_rejected_grant_is_an_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), "", 60, 1000);
    let err = run_crawl(config, &test_credentials()).await.unwrap_err();

    assert!(matches!(err, UndertowError::Auth(_)), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_fan_out_keeps_feed_order() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(MissingQueryParam("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("a", "pics", true),
            post("b", "pics", true),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(query_param("after", "t3_b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("c", "pics", true),
            post("d", "pics", true),
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .and(query_param("after", "t3_d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![])))
        .mount(&mock_server)
        .await;

    // The first tree answers last; equal scores must still come out in feed order
    for (index, id) in ["a", "b", "c", "d"].iter().enumerate() {
        let delay = Duration::from_millis(if index == 0 { 300 } else { 0 });
        Mock::given(method("GET"))
            .and(path(format!("/r/pics/comments/{}", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(delay)
                    .set_body_json(tree(
                        post(id, "pics", true),
                        vec![comment(&format!("{}1", id), -500, vec![])],
                    )),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri(), "tree-concurrency = 4", 60, 1000);
    let report = run_crawl(config, &test_credentials())
        .await
        .expect("Crawl failed");

    let ids: Vec<&str> = report.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "b1", "c1", "d1"]);
    assert_eq!(report.stats.trees_fetched, 4);
}

#[tokio::test]
async fn test_requests_past_capacity_wait_for_refill() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/r/all/hot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            post("a", "pics", false),
            post("b", "pics", false),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    for id in ["a", "b"] {
        mount_tree(
            &mock_server,
            "pics",
            id,
            tree(post(id, "pics", false), vec![comment("x", 1, vec![])]),
        )
        .await;
    }

    // Capacity 1: the page request drains the bucket, each tree waits a tick
    let config = create_test_config(&mock_server.uri(), "", 1, 200);
    let start = Instant::now();
    let report = run_crawl(config, &test_credentials())
        .await
        .expect("Crawl failed");
    let elapsed = start.elapsed();

    assert_eq!(report.stats.trees_fetched, 2);
    assert!(
        elapsed >= Duration::from_millis(380),
        "three requests at capacity 1 finished in {:?}",
        elapsed
    );
}
