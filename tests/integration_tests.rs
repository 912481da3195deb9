//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML config → HttpFeedSource + FeedScraper →
//! paced, retried, reauthenticated pagination over real HTTP.

use feedpace::auth::{LoginConfig, SessionAuthenticator};
use feedpace::error::RATE_LIMIT_RESET_HEADER;
use feedpace::feed::{FeedScraper, SearchParameters, UserRef};
use feedpace::http::{HttpFeedSource, SourceConfig};
use feedpace::pacing::NoPacing;
use feedpace::pagination::RunStatus;
use feedpace::rate_limit::RateLimitConfig;
use feedpace::{CancelToken, Error, FetchConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Retry settings fast enough for real-time tests
fn fast_rate_limit() -> RateLimitConfig {
    RateLimitConfig::default()
        .with_max_retries(2)
        .with_delays(0.01, 0.2)
        .with_jitter(false)
}

fn items(start: u64, count: u64) -> Vec<Value> {
    (start..start + count).map(|id| json!({ "id": id })).collect()
}

fn page(start: u64, count: u64, next: Option<&str>) -> Value {
    json!({
        "data": items(start, count),
        "meta": { "next_cursor": next }
    })
}

fn scraper_for(source: HttpFeedSource) -> FeedScraper<HttpFeedSource> {
    FeedScraper::builder(source)
        .rate_limit(fast_rate_limit())
        .pacing(Arc::new(NoPacing))
        .build()
        .unwrap()
}

// ============================================================================
// Timeline / Search
// ============================================================================

#[tokio::test]
async fn test_timeline_from_yaml_config() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/42/items"))
        .and(query_param("count", "20"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 20, Some("c1"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/42/items"))
        .and(query_param("count", "10"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(20, 10, Some("c2"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let yaml = format!(
        r#"
rate_limit:
  base_delay: 0.01
  max_delay: 0.2
  jitter: false
source:
  base_url: {}
"#,
        mock_server.uri()
    );
    let config = FetchConfig::from_yaml_str(&yaml).unwrap();
    config.validate().unwrap();

    let source = HttpFeedSource::new(config.require_source().unwrap().clone()).unwrap();
    let scraper = FeedScraper::builder(source)
        .rate_limit(config.rate_limit.clone())
        .pacing(Arc::new(NoPacing))
        .page_cap(config.page_cap)
        .build()
        .unwrap();

    let outcome = scraper.fetch_timeline("42", 30, None).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.items, items(0, 30));
}

#[tokio::test]
async fn test_timeline_by_screen_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/by/screen_name/rustlang"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/by/screen_name/rustlang"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "991"}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/991/items"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 5, Some("c1"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let user = UserRef::parse("@rustlang").unwrap();
    let outcome = scraper_for(source)
        .fetch_user_timeline(&user, 5, None)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.items, items(0, 5));
}

#[tokio::test]
async fn test_unknown_screen_name_fails_without_timeline_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/by/screen_name/ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/ghost/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 5, None)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let err = scraper_for(source)
        .fetch_user_timeline(&UserRef::parse("ghost").unwrap(), 5, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Client { status: 404, .. }), "{err:?}");
}

#[tokio::test]
async fn test_timeline_exhausted_when_source_runs_dry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/7/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 12, None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let outcome = scraper_for(source)
        .fetch_timeline("7", 50, None)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Exhausted);
    assert_eq!(outcome.len(), 12);
}

#[tokio::test]
async fn test_search_date_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust since:2024-03-01 until:2024-03-31"))
        .and(query_param("type", "Top"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 5, Some("s1"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let params = SearchParameters::new("rust")
        .with_date_range(
            "2024-03-01".parse().unwrap(),
            "2024-03-31".parse().unwrap(),
        )
        .with_count(5);

    let outcome = scraper_for(source).search(&params, None).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.len(), 5);
}

// ============================================================================
// Rate Limits / Failures
// ============================================================================

#[tokio::test]
async fn test_rate_limit_with_reset_header_then_success() {
    let mock_server = MockServer::start().await;
    let reset = chrono::Utc::now().timestamp() + 1;

    Mock::given(method("GET"))
        .and(path("/users/1/items"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header(RATE_LIMIT_RESET_HEADER, reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 20, Some("c1"))))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let outcome = scraper_for(source)
        .fetch_timeline("1", 20, None)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.len(), 20);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_exhausted_with_no_items() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1/items"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let scraper = FeedScraper::builder(source)
        .rate_limit(fast_rate_limit().with_max_retries(1))
        .pacing(Arc::new(NoPacing))
        .build()
        .unwrap();

    let err = scraper.fetch_timeline("1", 20, None).await.unwrap_err();

    assert!(err.is_rate_limit_exceeded(), "{err:?}");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_partial_results_on_mid_run_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/9/items"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 20, Some("c1"))))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/9/items"))
        .and(query_param("cursor", "c1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let outcome = scraper_for(source)
        .fetch_timeline("9", 60, None)
        .await
        .unwrap();

    assert!(outcome.is_partial());
    assert!(matches!(outcome.status, RunStatus::Partial { .. }));
    assert_eq!(outcome.items, items(0, 20));
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/404/items"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let err = scraper_for(source)
        .fetch_timeline("404", 20, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Client { status: 404, .. }), "{err:?}");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_reauthenticates_when_session_expires() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t1"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t2"})))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/5/items"))
        .and(header("Authorization", "Bearer t1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/5/items"))
        .and(header("Authorization", "Bearer t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 20, Some("c1"))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let login = LoginConfig::new(format!("{}/login", mock_server.uri()))
        .with_body_field("username", "alice");
    let auth = Arc::new(SessionAuthenticator::new(login).unwrap());
    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri()))
        .unwrap()
        .with_authenticator(Arc::clone(&auth));
    let scraper = FeedScraper::builder(source)
        .rate_limit(fast_rate_limit())
        .pacing(Arc::new(NoPacing))
        .authenticator(auth)
        .build()
        .unwrap();

    scraper.authenticate().await.unwrap();
    let outcome = scraper.fetch_timeline("5", 20, None).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.len(), 20);
}

#[tokio::test]
async fn test_rejected_login_fails_authenticate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Arc::new(
        SessionAuthenticator::new(LoginConfig::new(format!("{}/login", mock_server.uri())))
            .unwrap(),
    );
    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri()))
        .unwrap()
        .with_authenticator(Arc::clone(&auth));
    let scraper = FeedScraper::builder(source)
        .rate_limit(fast_rate_limit())
        .pacing(Arc::new(NoPacing))
        .authenticator(auth)
        .build()
        .unwrap();

    let err = scraper.authenticate().await.unwrap_err();
    assert!(matches!(err, Error::Client { status: 401, .. }), "{err:?}");
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_run_keeps_collected_items() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/3/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(0, 20, Some("c1")))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock_server)
        .await;

    let cancel = CancelToken::new();
    let pacing = feedpace::HumanPacing::new(feedpace::PacingConfig::default().uniform()).unwrap();
    let source = HttpFeedSource::new(SourceConfig::new(mock_server.uri())).unwrap();
    let scraper = FeedScraper::builder(source)
        .rate_limit(fast_rate_limit())
        .pacing(Arc::new(pacing))
        .cancel(cancel.clone())
        .build()
        .unwrap();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
    });

    let outcome = scraper.fetch_timeline("3", 100, None).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.len(), 20);
}
