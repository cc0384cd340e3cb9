use std::sync::Arc;

use axum::http::StatusCode;
use metrics::counter;
use tracing::{debug, error, warn};

use crate::{
    application::{
        error::RenderError,
        plugins::PluginPipeline,
        templates::TemplateCompositor,
    },
    config::SiteSettings,
    domain::content::{PluginContext, TemplateContext},
    infra::telemetry::RENDER_FALLBACK_TOTAL,
};

use super::{ContentLoader, ContentParser};

/// Content rendered in place of any page whose file is missing.
pub const NOT_FOUND_CONTENT_PATH: &str = "404.md";
/// Route reported to plugins and templates while rendering the 404 page.
pub const NOT_FOUND_ROUTE: &str = "/404";
/// Returned when neither the page nor the 404 page can be rendered.
pub const HARD_FALLBACK_HTML: &str =
    "<h1>404 - Page Not Found</h1><p>The requested page could not be found.</p>";

/// Site-wide values the controller threads into every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub title: String,
    pub url: String,
    pub default_content_type: String,
}

impl From<&SiteSettings> for SiteProfile {
    fn from(settings: &SiteSettings) -> Self {
        Self {
            title: settings.title.clone(),
            url: settings.url.clone(),
            default_content_type: settings.default_content_type.clone(),
        }
    }
}

/// Terminal state of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Success(String),
    /// The 404 page rendered in place of missing content.
    RenderedFallback(String),
    /// Nothing could be rendered; carries the failure that ended the attempt.
    HardFallback(RenderError),
}

impl RenderOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::RenderedFallback(_) | Self::HardFallback(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn into_html(self) -> String {
        match self {
            Self::Success(html) | Self::RenderedFallback(html) => html,
            Self::HardFallback(_) => HARD_FALLBACK_HTML.to_string(),
        }
    }
}

/// Runs load → parse → transform → extend → compose and owns the 404 fallback.
pub struct RenderController {
    loader: ContentLoader,
    parser: Arc<dyn ContentParser>,
    pipeline: Arc<PluginPipeline>,
    compositor: Arc<TemplateCompositor>,
    site: SiteProfile,
}

impl RenderController {
    pub fn new(
        loader: ContentLoader,
        parser: Arc<dyn ContentParser>,
        pipeline: Arc<PluginPipeline>,
        compositor: Arc<TemplateCompositor>,
        site: SiteProfile,
    ) -> Self {
        Self {
            loader,
            parser,
            pipeline,
            compositor,
            site,
        }
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    pub fn compositor(&self) -> &Arc<TemplateCompositor> {
        &self.compositor
    }

    /// Render `path` from the `content_type` source. Never fails: missing content
    /// is retried once against the 404 page and anything else ends in the hard
    /// fallback.
    pub async fn render(&self, path: &str, content_type: &str, route: &str) -> RenderOutcome {
        let err = match self.render_once(path, content_type, route).await {
            Ok(html) => return RenderOutcome::Success(html),
            Err(err) => err,
        };
        log_failure(&err, path, content_type, route);

        if !err.is_not_found() || path == NOT_FOUND_CONTENT_PATH {
            return hard_fallback(err);
        }

        let fallback_type = self.site.default_content_type.as_str();
        match self
            .render_once(NOT_FOUND_CONTENT_PATH, fallback_type, NOT_FOUND_ROUTE)
            .await
        {
            Ok(html) => {
                counter!(RENDER_FALLBACK_TOTAL, "kind" => "rendered").increment(1);
                debug!(
                    target = "marginalia::render::controller",
                    path,
                    content_type,
                    route,
                    "Served 404 page"
                );
                RenderOutcome::RenderedFallback(html)
            }
            Err(retry_err) => {
                log_failure(
                    &retry_err,
                    NOT_FOUND_CONTENT_PATH,
                    fallback_type,
                    NOT_FOUND_ROUTE,
                );
                hard_fallback(retry_err)
            }
        }
    }

    async fn render_once(
        &self,
        path: &str,
        content_type: &str,
        route: &str,
    ) -> Result<String, RenderError> {
        let raw = self.loader.get_content(path, content_type).await?;
        let parsed = self.parser.parse(&raw)?;

        let plugin_context = PluginContext {
            content_type: content_type.to_string(),
            route: route.to_string(),
            template_dir: self.compositor.layout().base_dir.clone(),
            content_sources: self.loader.sources().type_paths(),
            site_url: self.site.url.clone(),
        };
        let parsed = self.pipeline.apply(parsed, &plugin_context).await?;

        let template_context = TemplateContext {
            content: parsed.content,
            metadata: parsed.metadata,
            route: route.to_string(),
            site_title: self.site.title.clone(),
        };
        let template_context = self.pipeline.extend(template_context).await?;

        self.compositor
            .render(content_type, &template_context)
            .await
    }
}

fn hard_fallback(err: RenderError) -> RenderOutcome {
    counter!(RENDER_FALLBACK_TOTAL, "kind" => "hard").increment(1);
    RenderOutcome::HardFallback(err)
}

fn log_failure(err: &RenderError, path: &str, content_type: &str, route: &str) {
    if err.is_not_found() {
        warn!(
            target = "marginalia::render::controller",
            path,
            content_type,
            route,
            error = %err,
            "Content not found"
        );
    } else {
        error!(
            target = "marginalia::render::controller",
            path,
            content_type,
            route,
            kind = err.kind(),
            error = %err,
            "Render failed"
        );
    }
}
