mod common;

use std::collections::HashMap;

use common::TestSite;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

#[tokio::test]
async fn render_paths_emit_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let site = TestSite::new();
    site.write("content/posts/hello.md", "Hello");
    let router = site.router().await;

    // miss, then hit
    router.handle_request("blog/hello").await;
    router.handle_request("blog/hello").await;
    // hard fallback: no 404 page yet
    router.handle_request("blog/missing").await;
    site.write("content/404.md", "Gone");
    // rendered fallback
    router.handle_request("blog/missing").await;

    let mut counters: HashMap<String, u64> = HashMap::new();
    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let DebugValue::Counter(count) = value else {
            continue;
        };
        let key = composite_key.key();
        let label = key
            .labels()
            .map(|label| format!("{}={}", label.key(), label.value()))
            .collect::<Vec<_>>()
            .join(",");
        let name = if label.is_empty() {
            key.name().to_string()
        } else {
            format!("{}{{{label}}}", key.name())
        };
        *counters.entry(name).or_default() += count;
    }

    assert_eq!(counters.get("marginalia_template_cache_miss_total"), Some(&2));
    assert_eq!(counters.get("marginalia_template_cache_hit_total"), Some(&1));
    assert_eq!(
        counters.get("marginalia_render_fallback_total{kind=hard}"),
        Some(&1)
    );
    assert_eq!(
        counters.get("marginalia_render_fallback_total{kind=rendered}"),
        Some(&1)
    );
}
