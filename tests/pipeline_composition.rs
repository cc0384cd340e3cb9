mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::TestSite;
use futures::future::join_all;

fn body(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn layout_wraps_body_when_present() {
    let site = TestSite::new();
    site.write("templates/post.html", "<p>hi</p>");
    site.write("templates/layouts/default.html", "<html>{{body}}</html>");
    site.write("content/posts/hello.md", "ignored");
    let router = site.router().await;

    let response = router.handle_request("blog/hello").await;

    assert_eq!(response.status, StatusCode::OK);
    insta::assert_snapshot!(body(&response.body), @"<html><p>hi</p></html>");
}

#[tokio::test]
async fn body_is_final_output_without_layout() {
    let site = TestSite::new();
    site.write("templates/post.html", "<p>hi</p>");
    site.write("content/posts/hello.md", "ignored");
    let router = site.router().await;

    let response = router.handle_request("blog/hello").await;

    insta::assert_snapshot!(body(&response.body), @"<p>hi</p>");
}

#[tokio::test]
async fn plugins_transform_and_extend_before_composition() {
    let site = TestSite::new()
        .plugin("reading_time", Some("words_per_minute = 2"))
        .plugin("external_links", None)
        .plugin("canonical", Some(r#"base_url = "https://example.com/""#));
    site.write(
        "templates/post.html",
        "<article data-minutes=\"{{ metadata.reading_time_minutes }}\">{{ content }}</article>",
    );
    site.write(
        "templates/layouts/default.html",
        "<link rel=\"canonical\" href=\"{{ metadata.canonical_url }}\"><title>{{ metadata.title }}</title>{{ body }}",
    );
    site.write(
        "content/posts/hello.md",
        "+++\ntitle = \"Hello\"\n+++\nRead [the book](https://doc.rust-lang.org/book/) now.\n",
    );
    let router = site.router().await;

    let response = router.handle_request("blog/hello").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        body(&response.body),
        concat!(
            r#"<link rel="canonical" href="https://example.com/blog/hello"><title>Hello</title>"#,
            r#"<article data-minutes="2"><p>Read "#,
            r#"<a href="https://doc.rust-lang.org/book/" rel="noopener noreferrer" target="_blank">the book</a>"#,
            " now.</p>\n</article>",
        )
    );
}

#[tokio::test]
async fn unloadable_plugins_are_skipped() {
    let site = TestSite::new()
        .plugin("no_such_plugin", None)
        .plugin("canonical", None)
        .plugin("sanitize", None);
    site.write("content/posts/hello.md", "Hi <script>alert(1)</script>");
    let router = site.router().await;

    let response = router.handle_request("blog/hello").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(body(&response.body), "<article><p>Hi </p>\n</article>");
}

#[tokio::test]
async fn partials_are_available_to_templates() {
    let site = TestSite::new();
    site.write("templates/partials/nav.html", "<nav>{{ site_title }}</nav>");
    site.write("templates/layouts/default.html", "{% include \"nav\" %}{{ body }}");
    site.write("content/about.md", "About");
    let router = site.router().await;

    let response = router.handle_request("about").await;

    assert_eq!(
        body(&response.body),
        "<nav>Test Site</nav><main><p>About</p>\n</main>"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_renders_share_one_cache_entry_per_path() {
    let site = TestSite::new();
    site.write("templates/layouts/default.html", "<html>{{ body }}</html>");
    site.write("content/posts/hello.md", "Hello");
    let router = site.router().await;

    let handles = (0..16).map(|_| {
        let router = Arc::clone(&router);
        tokio::spawn(async move { router.handle_request("blog/hello").await })
    });
    let responses = join_all(handles).await;

    for response in responses {
        let response = response.expect("task completes");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            body(&response.body),
            "<html><article><p>Hello</p>\n</article></html>"
        );
    }

    let compositor = router.controller().compositor();
    let cache = compositor.cache();
    assert_eq!(cache.len(), 2);
    assert!(cache.contains(&compositor.layout().template_path("post")));
    assert!(cache.contains(&compositor.layout().layout_path()));
}
