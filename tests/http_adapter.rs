mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use common::TestSite;
use marginalia::{
    application::{error::ErrorReport, render::HARD_FALLBACK_HTML},
    infra::http::{HttpState, RequestContext, build_router},
};
use tower::ServiceExt;

async fn get(site: &TestSite, uri: &str) -> axum::response::Response {
    let app = build_router(HttpState {
        router: site.router().await,
    });
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    app.oneshot(request).await.expect("router should respond")
}

fn content_type(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

async fn text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn rendered_pages_are_html() {
    let site = TestSite::new();
    site.write("content/posts/hello.md", "Hello");

    let response = get(&site, "/blog/hello").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), Some("text/html"));
    assert!(response.extensions().get::<RequestContext>().is_some());
    assert_eq!(text(response).await, "<article><p>Hello</p>\n</article>");
}

#[tokio::test]
async fn root_serves_the_index_page() {
    let site = TestSite::new();
    site.write("content/index.md", "Home");

    let response = get(&site, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(response).await, "<main><p>Home</p>\n</main>");
}

#[tokio::test]
async fn assets_carry_their_mime_type() {
    let site = TestSite::new();
    site.write("assets/app.js", "console.log(1)");

    let response = get(&site, "/app.js").await;

    assert_eq!(response.status(), StatusCode::OK);
    let mime = content_type(&response).expect("content type").to_string();
    assert!(mime.contains("javascript"), "got {mime}");
    assert_eq!(text(response).await, "console.log(1)");
}

#[tokio::test]
async fn percent_encoded_paths_are_decoded() {
    let site = TestSite::new();
    site.write("content/posts/hello world.md", "Spaced");

    let response = get(&site, "/blog/hello%20world").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(response).await, "<article><p>Spaced</p>\n</article>");
}

#[tokio::test]
async fn hard_fallback_is_a_404_page() {
    let site = TestSite::new();

    let response = get(&site, "/blog/missing").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(content_type(&response), Some("text/html"));
    assert_eq!(text(response).await, HARD_FALLBACK_HTML);
}

#[tokio::test]
async fn undecodable_paths_end_in_the_not_found_flow() {
    let site = TestSite::new();

    let response = get(&site, "/blog/%FF").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(content_type(&response), Some("text/html"));
    assert!(response.extensions().get::<ErrorReport>().is_some());
    assert_eq!(text(response).await, HARD_FALLBACK_HTML);
}

#[tokio::test]
async fn undecodable_paths_use_the_rendered_404_page() {
    let site = TestSite::new();
    site.write("content/404.md", "Gone");

    let response = get(&site, "/blog/%FF").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(response).await, "<main><p>Gone</p>\n</main>");
}

#[tokio::test]
async fn asset_names_may_contain_double_dots() {
    let site = TestSite::new();
    site.write("assets/app..min.js", "let a;");

    let response = get(&site, "/app..min.js").await;

    assert_eq!(response.status(), StatusCode::OK);
    let mime = content_type(&response).expect("content type").to_string();
    assert!(mime.contains("javascript"), "got {mime}");
}

#[tokio::test]
async fn rendered_fallback_keeps_its_status() {
    let site = TestSite::new();
    site.write("content/404.md", "Gone");

    let response = get(&site, "/blog/missing").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(response).await, "<main><p>Gone</p>\n</main>");
}

#[tokio::test]
async fn non_get_requests_are_rejected() {
    let site = TestSite::new();
    let app = build_router(HttpState {
        router: site.router().await,
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/blog/hello")
        .body(Body::empty())
        .expect("request should build");

    let response = app.oneshot(request).await.expect("router should respond");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.extensions().get::<ErrorReport>().is_none());
}
