// tests/confluence_client.rs
//! The Confluence client and space traversal against a mock HTTP server.

use conduit::commands::confluence::list_all;
use conduit::error_recovery::RetryPolicy;
use conduit::pipeline::Destination;
use conduit::{
    ApiToken, AppError, AtlassianErrorCode, AtlassianHttpClient, ConfluenceClient, DepthPolicy,
    PageDraft, PageId, PageRecord, PageUpdate, SiteUrl, SpaceKey, SpaceTraversal, Termination,
    TraversalCursor, WikiRepository,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{
    body_partial_json, header, method, path, path_regex, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMAIL: &str = "me@example.com";
const TOKEN: &str = "secret-token-1234";

fn client(server: &MockServer) -> ConfluenceClient {
    let site = SiteUrl::parse(&server.uri()).unwrap();
    ConfluenceClient::connect(&site, EMAIL, ApiToken::new(TOKEN).unwrap()).unwrap()
}

fn fast_retry_client(server: &MockServer) -> ConfluenceClient {
    let base = SiteUrl::parse(&server.uri()).unwrap().with_segment("wiki");
    let http = AtlassianHttpClient::new(base, EMAIL, ApiToken::new(TOKEN).unwrap())
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        });
    ConfluenceClient::new(http)
}

fn page_json(id: &str, title: &str, parent: Option<&str>) -> Value {
    let ancestors: Vec<Value> = parent.into_iter().map(|p| json!({ "id": p })).collect();
    json!({
        "id": id,
        "type": "page",
        "title": title,
        "space": { "key": "DOCS" },
        "version": { "number": 4, "when": "2024-02-10T08:15:00.000Z" },
        "body": { "storage": { "value": format!("<p>{title}</p>"), "representation": "storage" } },
        "ancestors": ancestors,
    })
}

fn listing(pages: Vec<Value>, start: usize, more: bool) -> Value {
    let size = pages.len();
    let mut links = json!({ "base": "https://example.atlassian.net/wiki" });
    if more {
        links["next"] = json!(format!("/rest/api/space/DOCS/content/page?start={}", start + size));
    }
    json!({ "results": pages, "start": start, "limit": size, "size": size, "_links": links })
}

fn docs() -> SpaceKey {
    SpaceKey::new("DOCS").unwrap()
}

#[tokio::test]
async fn fetch_page_sends_basic_auth_and_reads_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/123"))
        .and(query_param("expand", "body.storage,version,space,ancestors"))
        .and(header(
            "authorization",
            "Basic bWVAZXhhbXBsZS5jb206c2VjcmV0LXRva2VuLTEyMzQ=",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("123", "Runbook", Some("100"))))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .fetch_page(&PageId::parse("123").unwrap())
        .await
        .unwrap();

    assert_eq!(page.title(), "Runbook");
    assert_eq!(page.space_key(), &docs());
    assert_eq!(page.version(), 4);
    assert_eq!(page.parent_id().map(PageId::as_str), Some("100"));
    assert!(page.last_updated().is_some());
    assert_eq!(page.normalized_body(), "Runbook");
}

#[tokio::test]
async fn unauthorized_is_reported_verbatim_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/123"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "statusCode": 401,
            "message": "Client must be authenticated to access this resource."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_retry_client(&server)
        .fetch_page(&PageId::parse("123").unwrap())
        .await
        .unwrap_err();

    match err {
        AppError::RemoteService {
            code,
            message,
            status,
            ..
        } => {
            assert_eq!(code, AtlassianErrorCode::Unauthorized);
            assert_eq!(message, "Client must be authenticated to access this resource.");
            assert_eq!(status.as_u16(), 401);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn service_unavailable_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/123"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("123", "Runbook", None)))
        .expect(1)
        .mount(&server)
        .await;

    let page = fast_retry_client(&server)
        .fetch_page(&PageId::parse("123").unwrap())
        .await
        .unwrap();
    assert_eq!(page.id().as_str(), "123");
}

#[tokio::test]
async fn missing_title_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content"))
        .and(query_param("spaceKey", "DOCS"))
        .and(query_param("title", "Nope"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![], 0, false)))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_page_by_title(&docs(), "Nope")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn traversal_follows_next_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/space/DOCS/content/page"))
        .and(query_param("depth", "root"))
        .and(query_param("start", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![page_json("1", "One", None), page_json("2", "Two", None)],
            0,
            true,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/space/DOCS/content/page"))
        .and(query_param("start", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![page_json("3", "Three", None)],
            2,
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let repo = client(&server);
    let cursor = TraversalCursor::new(docs(), DepthPolicy::Root, None, 2).unwrap();
    let report = SpaceTraversal::new(&repo, cursor)
        .collect(&CancellationToken::new())
        .await;

    assert!(report.is_complete());
    assert_eq!(report.stats.batches_fetched, 2);
    let titles: Vec<&str> = report.records.iter().map(PageRecord::title).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
}

#[tokio::test]
async fn traversal_keeps_pages_fetched_before_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/space/DOCS/content/page"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![page_json("1", "One", None), page_json("2", "Two", None)],
            0,
            true,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/space/DOCS/content/page"))
        .and(query_param("start", "2"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Forbidden" })))
        .mount(&server)
        .await;

    let repo = client(&server);
    let cursor = TraversalCursor::new(docs(), DepthPolicy::Root, None, 2).unwrap();
    let report = SpaceTraversal::new(&repo, cursor)
        .collect(&CancellationToken::new())
        .await;

    assert_eq!(report.records.len(), 2);
    match report.termination {
        Termination::Failed(AppError::RemoteFetch { retrieved, source }) => {
            assert_eq!(retrieved, 2);
            assert_eq!(source.remote_code(), Some(&AtlassianErrorCode::Forbidden));
        }
        other => panic!("unexpected termination: {other:?}"),
    }
}

#[tokio::test]
async fn list_all_pages_the_flat_space_listing() {
    let server = MockServer::start().await;
    let titles = ["One", "Two", "Three", "Four", "Five"];
    for start in [0usize, 2, 4] {
        let pages: Vec<Value> = (start..(start + 2).min(titles.len()))
            .map(|i| page_json(&(i + 1).to_string(), titles[i], None))
            .collect();
        Mock::given(method("GET"))
            .and(path("/wiki/rest/api/space/DOCS/content/page"))
            .and(query_param("start", start.to_string()))
            .and(query_param("limit", "2"))
            .and(query_param_is_missing("depth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(
                pages,
                start,
                start + 2 < titles.len(),
            )))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/wiki/rest/api/content/\d+/child/page$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![], 0, false)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let output = dir.path().join("pages.txt");
    let destination = Destination {
        output: Some(output.clone()),
    };
    list_all(
        &client(&server),
        &docs(),
        2,
        false,
        &CancellationToken::new(),
        &destination,
    )
    .await
    .unwrap();

    let listed = std::fs::read_to_string(&output).unwrap();
    assert!(listed.starts_with("Pages in space DOCS (5):"));
    assert!(listed.contains("- Five (ID: 5)"));
}

#[tokio::test]
async fn descendants_are_walked_through_child_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/10/child/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![page_json("11", "Child", Some("10"))],
            0,
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/11/child/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![page_json("12", "Grandchild", Some("11"))],
            0,
            false,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/rest/api/content/12/child/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![], 0, false)))
        .mount(&server)
        .await;

    let repo = client(&server);
    let cursor = TraversalCursor::new(
        docs(),
        DepthPolicy::All,
        Some(PageId::parse("10").unwrap()),
        25,
    )
    .unwrap();
    let records = SpaceTraversal::new(&repo, cursor)
        .collect(&CancellationToken::new())
        .await
        .into_result()
        .unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(ids, vec!["11", "12"]);
}

#[tokio::test]
async fn create_page_nests_under_parent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wiki/rest/api/content"))
        .and(body_partial_json(json!({
            "type": "page",
            "title": "Notes",
            "space": { "key": "DOCS" },
            "ancestors": [{ "id": "100" }],
            "body": { "storage": { "value": "<p>hi</p>", "representation": "storage" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("555", "Notes", Some("100"))))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create_page(&PageDraft {
            space_key: docs(),
            title: "Notes".to_string(),
            parent_id: Some(PageId::parse("100").unwrap()),
            body: "<p>hi</p>".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(created.id().as_str(), "555");
}

#[tokio::test]
async fn update_page_sends_next_version() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/wiki/rest/api/content/123"))
        .and(body_partial_json(json!({ "version": { "number": 5 }, "title": "Runbook" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json("123", "Runbook", None)))
        .expect(1)
        .mount(&server)
        .await;

    let current = PageRecord::new(PageId::parse("123").unwrap(), "Runbook", docs(), 4, "<p>old</p>");
    let update = PageUpdate::replacing(&current, None, "<p>new</p>".to_string());
    client(&server).update_page(&update).await.unwrap();
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/wiki/rest/api/content/123"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "Version must be incremented on update. Current Version is: 6"
        })))
        .mount(&server)
        .await;

    let current = PageRecord::new(PageId::parse("123").unwrap(), "Runbook", docs(), 4, "");
    let update = PageUpdate::replacing(&current, None, String::new());
    let err = client(&server).update_page(&update).await.unwrap_err();
    assert_eq!(err.remote_code(), Some(&AtlassianErrorCode::Conflict));
    assert!(err.to_string().contains("Current Version is: 6"));
}
