//! Request entry point: static assets first, then route-prefix dispatch to the
//! render controller.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use mime_guess::Mime;
use tracing::{debug, warn};

use crate::application::{
    error::RenderError,
    render::{RenderController, RenderOutcome},
};

/// Index page served for an empty request path.
pub const INDEX_PATH: &str = "index";
pub const CONTENT_SUFFIX: &str = ".md";
const HTML_CONTENT_TYPE: &str = "text/html";

/// A static file resolved under the assets root.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticAsset {
    pub contents: Bytes,
    pub mime: Mime,
}

/// Lookup for static files. `Ok(None)` means "not an asset" and lets content
/// rendering take over.
#[async_trait]
pub trait StaticAssets: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Option<StaticAsset>, RenderError>;
}

/// Transport-neutral response produced for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResponse {
    pub body: Bytes,
    pub content_type: String,
    pub status: StatusCode,
    /// Failure behind a hard fallback, kept for diagnostics.
    pub failure: Option<RenderError>,
}

impl RoutedResponse {
    fn asset(asset: StaticAsset) -> Self {
        Self {
            body: asset.contents,
            content_type: asset.mime.to_string(),
            status: StatusCode::OK,
            failure: None,
        }
    }

    fn rendered(outcome: RenderOutcome) -> Self {
        let status = outcome.status();
        let failure = match &outcome {
            RenderOutcome::HardFallback(err) => Some(err.clone()),
            _ => None,
        };
        Self {
            body: Bytes::from(outcome.into_html()),
            content_type: HTML_CONTENT_TYPE.to_string(),
            status,
            failure,
        }
    }
}

/// Where a content request was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTarget {
    /// File path relative to the selected source's storage root.
    pub path: String,
    pub content_type: String,
    pub route: String,
}

pub struct RequestRouter {
    assets: Arc<dyn StaticAssets>,
    controller: Arc<RenderController>,
}

impl RequestRouter {
    pub fn new(assets: Arc<dyn StaticAssets>, controller: Arc<RenderController>) -> Self {
        Self { assets, controller }
    }

    pub fn controller(&self) -> &Arc<RenderController> {
        &self.controller
    }

    /// Serve `path` as a static asset when one exists, otherwise render it.
    /// Always yields a 200 or 404 response.
    pub async fn handle_request(&self, path: &str) -> RoutedResponse {
        let normalized = normalize_path(path);

        match self.assets.fetch(&normalized).await {
            Ok(Some(asset)) => {
                debug!(
                    target = "marginalia::router",
                    path = %normalized,
                    mime = %asset.mime,
                    "Serving static asset"
                );
                return RoutedResponse::asset(asset);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    target = "marginalia::router",
                    path = %normalized,
                    error = %err,
                    "Static asset lookup failed; rendering content instead"
                );
            }
        }

        let target = self.resolve(&normalized);
        debug!(
            target = "marginalia::router",
            path = %target.path,
            content_type = %target.content_type,
            route = %target.route,
            "Rendering content"
        );
        let outcome = self
            .controller
            .render(&target.path, &target.content_type, &target.route)
            .await;
        RoutedResponse::rendered(outcome)
    }

    /// Pick the content source for an already normalised path: the first source in
    /// configuration order whose route prefixes it, else the default type.
    pub fn resolve(&self, normalized: &str) -> ContentTarget {
        let content_path = ensure_suffix(normalized, CONTENT_SUFFIX);
        let route = format!("/{normalized}");
        let sources = self.controller.loader().sources();

        match sources.first_match(normalized) {
            Some(source) => ContentTarget {
                path: content_path
                    .strip_prefix(source.route.as_str())
                    .unwrap_or(content_path.as_str())
                    .to_string(),
                content_type: source.content_type.clone(),
                route,
            },
            None => ContentTarget {
                path: content_path,
                content_type: self.controller.site().default_content_type.clone(),
                route,
            },
        }
    }
}

/// Strip one leading separator; an empty path becomes the index page.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        INDEX_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Append `suffix` unless the path already ends with it.
pub fn ensure_suffix(path: &str, suffix: &str) -> String {
    if path.ends_with(suffix) {
        path.to_string()
    } else {
        format!("{path}{suffix}")
    }
}
