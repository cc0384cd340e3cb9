//! Startup wiring: settings in, a ready request router out.

use std::sync::Arc;

use tracing::info;

use crate::{
    application::{
        error::RenderError,
        plugins::{PluginPipeline, PluginRegistry},
        render::{ContentLoader, ContentParser, RenderController, SiteProfile, default_parser},
        router::{RequestRouter, StaticAssets},
        templates::{CompiledTemplateCache, CompilerOptions, TemplateCompositor, TemplateLayout},
    },
    config::Settings,
};

/// Collaborators that differ between deployments and tests.
pub struct SiteParts {
    pub assets: Arc<dyn StaticAssets>,
    pub parser: Arc<dyn ContentParser>,
    pub registry: PluginRegistry,
}

impl SiteParts {
    /// Built-in plugins and the default markdown parser.
    pub fn new(assets: Arc<dyn StaticAssets>) -> Self {
        Self {
            assets,
            parser: default_parser(),
            registry: PluginRegistry::builtin(),
        }
    }
}

/// Assemble the rendering stack described by `settings`. Plugins that fail to
/// load are skipped; only template-layer I/O errors abort startup.
pub async fn build_site(settings: &Settings, parts: SiteParts) -> Result<RequestRouter, RenderError> {
    let SiteParts {
        assets,
        parser,
        registry,
    } = parts;

    let pipeline = PluginPipeline::from_settings(&registry, &settings.plugins);
    let compositor = TemplateCompositor::load(
        TemplateLayout::from(&settings.templates),
        CompilerOptions {
            autoescape: settings.templates.autoescape,
        },
        Arc::new(CompiledTemplateCache::new()),
    )
    .await?;

    info!(
        target = "marginalia::site",
        sources = settings.content.sources.len(),
        plugins = ?pipeline.names(),
        templates = %settings.templates.directory.display(),
        "Site assembled"
    );

    let controller = RenderController::new(
        ContentLoader::new(Arc::new(settings.content.sources.clone())),
        parser,
        Arc::new(pipeline),
        Arc::new(compositor),
        SiteProfile::from(&settings.site),
    );

    Ok(RequestRouter::new(assets, Arc::new(controller)))
}
