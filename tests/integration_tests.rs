//! Integration tests for the site server
//!
//! These tests build a complete site (data files, translations, templates,
//! static files and a catalog) in a temporary directory and drive it through
//! the request pipeline and through the axum router.

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LANGUAGE, CONTENT_TYPE, COOKIE, HOST, SET_COOKIE, USER_AGENT};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use flashpoint_site::catalog::{CatalogStats, JsonCatalog};
use flashpoint_site::config::Config;
use flashpoint_site::dispatch::{self, IncomingRequest, SiteResponse};
use flashpoint_site::scheduler;
use flashpoint_site::server::{self, AppState};
use flashpoint_site::site::Site;

// ==================== Test Helpers ====================

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).expect("Failed to create directory");
    std::fs::write(path, content).expect("Failed to write file");
}

const CATALOG: &str = r#"[
    {
        "id": "0a1b2c3d-0000-0000-0000-000000000001",
        "title": "Alpha Quest",
        "developer": "Ada",
        "platforms": ["Flash"],
        "tags": ["Adventure"],
        "library": "arcade",
        "originalDescription": "An adventure."
    },
    {
        "id": "1b2c3d4e-0000-0000-0000-000000000002",
        "title": "Beta Quest",
        "publisher": "Pub Co",
        "platforms": ["HTML5"],
        "tags": ["Extreme"],
        "library": "theatre"
    }
]"#;

/// Create a complete site in `dir` and return a config pointing at it
fn create_test_site(dir: &TempDir) -> Config {
    let root = dir.path();

    write(
        root,
        "data/pages.json",
        r#"{
            "/": { "namespace": "home", "styles": ["home.css"] },
            "/search": { "namespace": "search", "fragments": ["simple", "advanced", "result", "navigation"] },
            "/view": { "namespace": "view" },
            "/news": { "namespace": "news", "lenient": true }
        }"#,
    );
    write(
        root,
        "data/endpoints.json",
        r#"{ "/data/search.json": { "namespace": "searchinfo", "type": "application/json" } }"#,
    );
    write(
        root,
        "data/locales.json",
        r#"{ "en-US": { "name": "English" }, "fr-FR": { "name": "Français" } }"#,
    );
    write(root, "data/filter.json", r#"["Extreme"]"#);
    write(root, "data/catalog.json", CATALOG);

    for (lang, home, shell, notfound, search) in [
        (
            "en-US",
            r#"{ "Title": "Home", "Welcome": "Welcome", "Intro": "Go $1{search}" }"#,
            r#"{ "Nav": "Search" }"#,
            r#"{ "Title": "Not Found", "Message": "Nothing here" }"#,
            r#"{ "Title": "Search", "ResultCreator": "by $1", "ResultCount": "$1 results" }"#,
        ),
        (
            "fr-FR",
            r#"{ "Welcome": "Bienvenue" }"#,
            r#"{ "Nav": "Recherche" }"#,
            r#"{ "Title": "Introuvable", "Message": "Rien ici" }"#,
            r#"{ "ResultCreator": "par $1", "ResultCount": "$1 résultats" }"#,
        ),
    ] {
        write(root, &format!("locales/{lang}/home.json"), home);
        write(root, &format!("locales/{lang}/shell.json"), shell);
        write(root, &format!("locales/{lang}/notfound.json"), notfound);
        write(root, &format!("locales/{lang}/search.json"), search);
        write(root, &format!("locales/{lang}/view.json"), "{}");
    }
    write(root, "locales/en-US/news.json", r#"{ "Title": "News", "Headline": "Latest news" }"#);

    write(
        root,
        "templates/shell.html",
        "<html lang=\"{OG_LOCALE}\">\n<title>{TITLE}</title>\n\t{STYLES}\n<nav>{Nav}</nav>\n<main>\n\t{CONTENT}\n</main>\n</html>",
    );
    write(root, "templates/error.html", "<h1>{error}</h1>\n<p>{description}</p>");
    write(root, "templates/notfound.html", "<p>{Message}</p>");
    write(root, "templates/home.html", "<h1>{Welcome}</h1>\n<p>{Intro,<a href=\"/search\">}</p>");
    write(root, "templates/news.html", "<h1>{Headline}</h1>");
    write(root, "templates/view.html", "<h1>{viewTitle}</h1>\n<p>{viewDescription}</p>");
    write(root, "templates/search.html", "{searchInterface}\n{searchNavigation}");
    write(root, "templates/search_simple.html", "<input name=\"query\" value=\"{searchQuery}\">");
    write(root, "templates/search_advanced.html", "<form{anyChecked}>");
    write(root, "templates/search_result.html", "<li>{resultTitle} {resultCreator}</li>");
    write(
        root,
        "templates/search_navigation.html",
        "<p>{ResultCount,searchTotal}</p>\n<ul>\n\t{searchResults}\n</ul>",
    );

    write(root, "static/styles/home.css", "h1 { color: red; }");

    Config::default().rooted_at(root)
}

async fn load(config: Config) -> (Site, JsonCatalog) {
    let catalog = JsonCatalog::open(&config.catalog_file).expect("Failed to open catalog");
    let stats = CatalogStats::collect(&catalog).await.expect("Failed to collect stats");
    let site = Site::load(config, stats).expect("Failed to load site");
    (site, catalog)
}

fn request(url: &str) -> IncomingRequest {
    IncomingRequest {
        remote_ip: "192.168.1.20".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        url: url.to_string(),
        cookie_header: None,
    }
}

async fn get(config: Config, incoming: IncomingRequest) -> SiteResponse {
    let (site, catalog) = load(config).await;
    dispatch::handle(&site, &catalog, &incoming).await
}

fn header<'a>(response: &'a SiteResponse, name: axum::http::HeaderName) -> Option<&'a str> {
    response.headers.get(name).and_then(|value| value.to_str().ok())
}

// ==================== Page Tests ====================

#[tokio::test]
async fn test_home_page_renders_in_shell() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.text(),
        "<html lang=\"en_US\">\n<title>Home - Flashpoint Archive</title>\n\
         \t<link rel=\"stylesheet\" href=\"/styles/home.css\">\n<nav>Search</nav>\n<main>\n\
         \t<h1>Welcome</h1>\n\t<p>Go <a href=\"/search\">search</a></p>\n</main>\n</html>"
    );
    assert_eq!(header(&response, CONTENT_TYPE), Some("text/html; charset=UTF-8"));
    assert_eq!(header(&response, CONTENT_LANGUAGE), Some("en-US"));
    assert_eq!(header(&response, CACHE_CONTROL), Some("max-age=14400"));
}

#[tokio::test]
async fn test_page_without_styles_collapses_placeholder_line() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/news")).await;

    assert_eq!(
        response.text(),
        "<html lang=\"en_US\">\n<title>News - Flashpoint Archive</title>\n<nav>Search</nav>\n<main>\n\
         \t<h1>Latest news</h1>\n</main>\n</html>"
    );
}

#[tokio::test]
async fn test_lenient_page_matches_sub_paths() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/news/2024/launch/")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("<h1>Latest news</h1>"));
}

// ==================== Locale Tests ====================

#[tokio::test]
async fn test_lang_query_localizes_and_sets_cookie() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/?lang=fr-FR")).await;

    let body = response.text();
    assert!(body.contains("<h1>Bienvenue</h1>"));
    assert!(body.contains("<nav>Recherche</nav>"));
    // Missing French keys fall back to English
    assert!(body.contains("<title>Home - Flashpoint Archive</title>"));
    assert!(body.contains("Go <a href=\"/search\">search</a>"));
    assert_eq!(header(&response, CONTENT_LANGUAGE), Some("fr-FR"));
    assert_eq!(header(&response, SET_COOKIE), Some("lang=fr-FR; Path=/"));
}

#[tokio::test]
async fn test_lang_cookie_localizes_without_setting_cookie() {
    let temp_dir = TempDir::new().unwrap();
    let mut incoming = request("http://localhost/");
    incoming.cookie_header = Some("lang=fr-FR".to_string());

    let response = get(create_test_site(&temp_dir), incoming).await;

    assert!(response.text().contains("<h1>Bienvenue</h1>"));
    assert_eq!(header(&response, SET_COOKIE), None);
}

#[tokio::test]
async fn test_unknown_lang_uses_default() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/?lang=xx-XX")).await;

    assert!(response.text().contains("<h1>Welcome</h1>"));
    assert_eq!(header(&response, SET_COOKIE), None);
}

// ==================== Search Tests ====================

#[tokio::test]
async fn test_search_lists_results_and_hides_filtered_tags() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/search?query=quest")).await;

    let body = response.text();
    assert_eq!(response.status, StatusCode::OK);
    assert!(body.contains("<title>Search - Flashpoint Archive</title>"));
    assert!(body.contains("\t<input name=\"query\" value=\"quest\">\n\t<p>1 results</p>"));
    assert!(body.contains("\t<ul>\n\t\t<li>Alpha Quest by Ada</li>\n\t</ul>"));
    assert!(!body.contains("Beta Quest"));
}

#[tokio::test]
async fn test_search_nsfw_in_french() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(
        create_test_site(&temp_dir),
        request("http://localhost/search?query=quest&nsfw=true&lang=fr-FR"),
    )
    .await;

    let body = response.text();
    assert!(body.contains("<p>2 résultats</p>"));
    assert!(body.contains("<li>Alpha Quest par Ada</li>"));
    assert!(body.contains("<li>Beta Quest par Pub Co</li>"));
}

#[tokio::test]
async fn test_view_page_sets_title() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(
        create_test_site(&temp_dir),
        request("http://localhost/view?id=0a1b2c3d-0000-0000-0000-000000000001"),
    )
    .await;

    let body = response.text();
    assert_eq!(response.status, StatusCode::OK);
    assert!(body.contains("<title>Alpha Quest - Flashpoint Archive</title>"));
    assert!(body.contains("<h1>Alpha Quest</h1>\n\t<p>An adventure.</p>"));
}

// ==================== Error Tests ====================

#[tokio::test]
async fn test_not_found_renders_localized_in_shell() {
    let temp_dir = TempDir::new().unwrap();
    let mut incoming = request("http://localhost/missing/page");
    incoming.cookie_header = Some("lang=fr-FR".to_string());

    let response = get(create_test_site(&temp_dir), incoming).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.text();
    assert!(body.contains("<title>Introuvable - Flashpoint Archive</title>"));
    assert!(body.contains("<nav>Recherche</nav>"));
    assert!(body.contains("<p>Rien ici</p>"));
    assert_eq!(header(&response, CONTENT_LANGUAGE), Some("fr-FR"));
}

#[tokio::test]
async fn test_unknown_catalog_record_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/view?id=nope")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.text().contains("<p>Nothing here</p>"));
}

#[tokio::test]
async fn test_disallowed_host_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        access_hosts: vec!["flashpoint.example".to_string()],
        ..create_test_site(&temp_dir)
    };

    let response = get(config, request("http://localhost/")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text(),
        "<h1>400 Bad Request</h1>\n<p>The requested URL is invalid.</p>"
    );
}

#[tokio::test]
async fn test_blocked_user_agent_gets_minimal_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        blocked_uas: vec!["Mozilla".to_string()],
        ..create_test_site(&temp_dir)
    };

    let response = get(config, request("http://localhost/")).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.text(),
        "<h1>404 Not Found</h1>\n<p>The requested URL does not exist.</p>"
    );
}

// ==================== Endpoint And Static Tests ====================

#[tokio::test]
async fn test_search_info_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/data/search.json")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(header(&response, CONTENT_TYPE), Some("application/json"));
    let json: serde_json::Value = serde_json::from_slice(&response.body).expect("Should be JSON");
    assert_eq!(json["totalGames"], 2);
    assert_eq!(json["platforms"], serde_json::json!(["Flash", "HTML5"]));
}

#[tokio::test]
async fn test_static_file() {
    let temp_dir = TempDir::new().unwrap();
    let response = get(create_test_site(&temp_dir), request("http://localhost/styles/home.css")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "h1 { color: red; }");
    assert_eq!(header(&response, CONTENT_TYPE), Some("text/css"));
}

// ==================== Startup Tests ====================

#[tokio::test]
async fn test_missing_default_language_file_fails_startup() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_site(&temp_dir);
    std::fs::remove_file(temp_dir.path().join("locales/en-US/search.json")).unwrap();

    let result = Site::load(config, CatalogStats::empty());

    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_translation_in_other_language_is_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_site(&temp_dir);
    std::fs::remove_file(temp_dir.path().join("locales/fr-FR/view.json")).unwrap();

    assert!(Site::load(config, CatalogStats::empty()).is_ok());
}

#[tokio::test]
async fn test_shipped_site_loads_and_renders() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let (site, catalog) = load(Config::default().rooted_at(root)).await;

    let home = dispatch::handle(&site, &catalog, &request("http://localhost/")).await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(!home.text().contains("null"));

    let search = dispatch::handle(&site, &catalog, &request("http://localhost/search?query=alien")).await;
    assert!(search.text().contains("Alien Hominid"));
}

// ==================== HTTP Tests ====================

#[tokio::test]
async fn test_router_serves_pages_over_http() {
    let temp_dir = TempDir::new().unwrap();
    let (site, catalog) = load(create_test_site(&temp_dir)).await;
    let app = server::router(Arc::new(AppState::new(site, Arc::new(catalog))));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/?lang=fr-FR")
                .header(HOST, "localhost:8080")
                .header(USER_AGENT, "integration-test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[SET_COOKIE], "lang=fr-FR; Path=/");
    assert_eq!(response.headers()[CONTENT_LANGUAGE], "fr-FR");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("<h1>Bienvenue</h1>"));
    assert!(body.contains("<html lang=\"fr_FR\">"));
}

#[tokio::test]
async fn test_router_reads_lang_cookie_and_404s() {
    let temp_dir = TempDir::new().unwrap();
    let (site, catalog) = load(create_test_site(&temp_dir)).await;
    let app = server::router(Arc::new(AppState::new(site, Arc::new(catalog))));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .header(HOST, "localhost")
                .header(COOKIE, "lang=fr-FR")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("<p>Rien ici</p>"));
}

#[tokio::test]
async fn test_refresh_is_visible_to_new_requests() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_site(&temp_dir);
    let catalog_file = config.catalog_file.clone();
    let (site, catalog) = load(config).await;
    let state = Arc::new(AppState::new(site, Arc::new(catalog)));

    std::fs::write(&catalog_file, "[]").unwrap();
    scheduler::refresh_stats(&state).await.expect("Should refresh");

    let site = state.site();
    let response = dispatch::handle(&site, state.catalog(), &request("http://localhost/data/search.json")).await;
    let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(json["totalGames"], 0);
}
