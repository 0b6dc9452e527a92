//! Store adapters against a wiremock Admin API.

use serde_json::json;
use shopsync::credentials::Credentials;
use shopsync::error::SyncError;
use shopsync::resource::ResourceAdapter;
use shopsync::shopify::collections::CollectionMetadata;
use shopsync::shopify::pages::{Page, PageMetadata};
use shopsync::shopify::themes::AssetMetadata;
use shopsync::shopify::{AdminClient, Collections, Pages, ThemeAssets};
use shopsync::sync::{LocalFile, PullOptions, RetryPolicy, SyncEngine};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/admin/api/2024-01";

fn client(server: &MockServer) -> AdminClient {
    let creds = Credentials {
        site: "test-shop.myshopify.com".into(),
        access_token: "shpat_secret".into(),
    };
    AdminClient::with_base_url(&creds, format!("{}{}", server.uri(), API)).unwrap()
}

fn page(id: u64, handle: &str) -> Page {
    Page {
        id,
        handle: handle.into(),
        title: handle.into(),
        body_html: None,
        published_at: None,
        template_suffix: None,
        author: None,
    }
}

async fn mount_themes(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{}/themes.json", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "themes": [
                {"id": 11, "name": "Dawn", "role": "main"},
                {"id": 12, "name": "Dawn staging", "role": "unpublished"}
            ]
        })))
        .mount(server)
        .await;
}

// =============================================================================
// Client
// =============================================================================

#[tokio::test]
async fn test_list_follows_link_pagination() {
    let server = MockServer::start().await;
    let next = format!("{}{}/pages.json?limit=250&page_info=p2", server.uri(), API);

    Mock::given(method("GET"))
        .and(path(format!("{}/pages.json", API)))
        .and(header("X-Shopify-Access-Token", "shpat_secret"))
        .and(query_param("limit", "250"))
        .and(query_param_is_missing("page_info"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", format!("<{}>; rel=\"next\"", next).as_str())
                .set_body_json(json!({"pages": [{"id": 1, "handle": "about", "title": "About"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pages.json", API)))
        .and(query_param("page_info", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pages": [{"id": 2, "handle": "faq", "title": "FAQ", "published_at": "2024-03-01T10:00:00Z"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pages = Pages::new(client(&server)).list_remote().await.unwrap();
    let handles: Vec<_> = pages.iter().map(|p| p.handle.as_str()).collect();
    assert_eq!(handles, vec!["about", "faq"]);
    assert!(pages[1].published_at.is_some());
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/pages.json", API)))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key or access token"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/custom_collections.json", API)))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2.0"))
        .mount(&server)
        .await;

    let err = Pages::new(client(&server)).list_remote().await.unwrap_err();
    match err {
        SyncError::Auth { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("access token"));
        }
        other => panic!("expected auth error, got {:?}", other),
    }

    let err = Collections::new(client(&server)).list_remote().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(2)
    ));
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_page_upload_updates_existing() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("about-us.html");
    fs::write(&file, "<p>Hi</p>").unwrap();

    Mock::given(method("GET"))
        .and(path(format!("{}/pages.json", API)))
        .and(query_param("handle", "about-us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pages": [{"id": 42}]})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/pages/42.json", API)))
        .and(body_partial_json(json!({
            "page": {"id": 42, "handle": "about-us", "title": "About", "body_html": "<p>Hi</p>", "published": false}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": {"id": 42}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let local = LocalFile {
        handle: "about-us".to_string(),
        file_path: file,
        metadata: Some(PageMetadata {
            title: "About".into(),
            published: false,
            template_suffix: None,
            author: None,
        }),
    };
    Pages::new(client(&server)).upload_one(&local).await.unwrap();
}

#[tokio::test]
async fn test_page_upload_creates_missing_with_defaults() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("shipping-policy.html");
    fs::write(&file, "<h1>Shipping</h1>").unwrap();

    Mock::given(method("GET"))
        .and(path(format!("{}/pages.json", API)))
        .and(query_param("handle", "shipping-policy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pages": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/pages.json", API)))
        .and(body_partial_json(json!({
            "page": {"handle": "shipping-policy", "title": "Shipping Policy", "published": true}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"page": {"id": 7}})))
        .expect(1)
        .mount(&server)
        .await;

    let local: LocalFile<PageMetadata> = LocalFile {
        handle: "shipping-policy".to_string(),
        file_path: file,
        metadata: None,
    };
    Pages::new(client(&server)).upload_one(&local).await.unwrap();
}

#[tokio::test]
async fn test_page_delete_tolerates_missing() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/pages/9.json", API)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": "Not Found"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/pages/10.json", API)))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let pages = Pages::new(client(&server));
    pages.delete_one(&page(9, "gone")).await.unwrap();

    let err = pages.delete_one(&page(10, "locked")).await.unwrap_err();
    assert!(matches!(err, SyncError::Auth { status: 403, .. }));
}

// =============================================================================
// Collections
// =============================================================================

#[tokio::test]
async fn test_collection_upload_sends_sort_order() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("summer.html");
    fs::write(&file, "<p>Sun</p>").unwrap();

    Mock::given(method("GET"))
        .and(path(format!("{}/custom_collections.json", API)))
        .and(query_param("handle", "summer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"custom_collections": []})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/custom_collections.json", API)))
        .and(body_partial_json(json!({
            "custom_collection": {"handle": "summer", "title": "Summer", "sort_order": "best-selling"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"custom_collection": {"id": 3}})))
        .expect(1)
        .mount(&server)
        .await;

    let local = LocalFile {
        handle: "summer".to_string(),
        file_path: file,
        metadata: Some(CollectionMetadata {
            title: "Summer".into(),
            published: true,
            sort_order: Some("best-selling".into()),
            template_suffix: None,
        }),
    };
    Collections::new(client(&server)).upload_one(&local).await.unwrap();
}

// =============================================================================
// Themes
// =============================================================================

#[tokio::test]
async fn test_unknown_theme_lists_available() {
    let server = MockServer::start().await;
    mount_themes(&server).await;

    let Err(err) = ThemeAssets::resolve(client(&server), Some("Debut")).await else {
        panic!("expected an unknown theme error");
    };
    assert!(err.is_not_found());
    let msg = err.to_string();
    assert!(msg.contains("Dawn (main)"), "{}", msg);
    assert!(msg.contains("Dawn staging (unpublished)"), "{}", msg);
}

#[tokio::test]
async fn test_resolve_defaults_to_live_theme() {
    let server = MockServer::start().await;
    mount_themes(&server).await;

    let live = ThemeAssets::resolve(client(&server), None).await.unwrap();
    assert_eq!(live.theme().id, 11);
    let named = ThemeAssets::resolve(client(&server), Some("dawn STAGING")).await.unwrap();
    assert_eq!(named.theme().id, 12);
}

#[tokio::test]
async fn test_theme_pull_writes_text_and_binary_assets() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_themes(&server).await;
    let assets = format!("{}/themes/11/assets.json", API);

    Mock::given(method("GET"))
        .and(path(assets.as_str()))
        .and(query_param_is_missing("asset[key]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [
                {"key": "assets/logo.png", "content_type": "image/png", "checksum": "abc"},
                {"key": "templates/index.json", "content_type": "application/json"},
                {"key": "README.md"}
            ]
        })))
        .mount(&server)
        .await;
    // First fetch is throttled, the retry succeeds
    Mock::given(method("GET"))
        .and(path(assets.as_str()))
        .and(query_param("asset[key]", "templates/index.json"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(assets.as_str()))
        .and(query_param("asset[key]", "templates/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "asset": {"key": "templates/index.json", "value": "{\"sections\": {}}"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(assets.as_str()))
        .and(query_param("asset[key]", "assets/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            // "\x89PNG"
            "asset": {"key": "assets/logo.png", "attachment": "iVBORw=="}
        })))
        .mount(&server)
        .await;

    let adapter = ThemeAssets::resolve(client(&server), None).await.unwrap();
    let report = SyncEngine::new(adapter, RetryPolicy::fixed(2, Duration::ZERO))
        .pull(&PullOptions {
            output: temp.path().to_path_buf(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(!report.has_failures(), "{:?}", report.errors().collect::<Vec<_>>());
    assert_eq!(report.plan.transfer, vec!["assets/logo.png", "templates/index.json"]);

    let root = temp.path().join("themes");
    assert_eq!(
        fs::read(root.join("assets/logo.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
    assert_eq!(
        fs::read_to_string(root.join("templates/index.json")).unwrap(),
        "{\"sections\": {}}"
    );
    assert!(!root.join("README.md").exists());

    let meta: AssetMetadata =
        serde_json::from_str(&fs::read_to_string(root.join("assets/logo.png.meta")).unwrap()).unwrap();
    assert_eq!(meta.key, "assets/logo.png");
    assert_eq!(meta.theme_role, "main");
    assert_eq!(meta.checksum.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_theme_upload_encodes_binary_as_attachment() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_themes(&server).await;
    let file = temp.path().join("logo.png");
    fs::write(&file, [0x89, b'P', b'N', b'G']).unwrap();

    Mock::given(method("PUT"))
        .and(path(format!("{}/themes/11/assets.json", API)))
        .and(body_partial_json(json!({
            "asset": {"key": "assets/logo.png", "attachment": "iVBORw=="}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"asset": {"key": "assets/logo.png"}})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = ThemeAssets::resolve(client(&server), None).await.unwrap();
    let local: LocalFile<AssetMetadata> = LocalFile {
        handle: "assets/logo.png".to_string(),
        file_path: file,
        metadata: None,
    };
    adapter.upload_one(&local).await.unwrap();
}
