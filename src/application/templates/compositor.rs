use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use metrics::counter;
use tera::Context;
use tracing::debug;

use crate::{
    application::error::RenderError,
    config::TemplateSettings,
    domain::content::TemplateContext,
    infra::telemetry::{TEMPLATE_CACHE_HIT_TOTAL, TEMPLATE_CACHE_MISS_TOTAL},
};

use super::cache::{CompiledTemplate, CompiledTemplateCache, CompilerOptions};

const SOURCE: &str = "application::templates::compositor";

/// Where templates, layouts and partials live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    pub base_dir: PathBuf,
    pub extension: String,
    pub layouts_dir: PathBuf,
    pub default_layout: String,
    pub partials_dir: PathBuf,
}

impl TemplateLayout {
    /// `<base>/<name>.<ext>`
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.{}", self.extension))
    }

    /// `<base>/<layouts>/<default>.<ext>`
    pub fn layout_path(&self) -> PathBuf {
        self.base_dir
            .join(&self.layouts_dir)
            .join(format!("{}.{}", self.default_layout, self.extension))
    }

    pub fn partials_path(&self) -> PathBuf {
        self.base_dir.join(&self.partials_dir)
    }
}

impl From<&TemplateSettings> for TemplateLayout {
    fn from(settings: &TemplateSettings) -> Self {
        Self {
            base_dir: settings.directory.clone(),
            extension: settings.extension.clone(),
            layouts_dir: settings.layouts_dir.clone(),
            default_layout: settings.default_layout.clone(),
            partials_dir: settings.partials_dir.clone(),
        }
    }
}

/// Renders a body template and wraps it in the default layout when one exists.
pub struct TemplateCompositor {
    layout: TemplateLayout,
    options: CompilerOptions,
    partials: Vec<(String, String)>,
    cache: Arc<CompiledTemplateCache>,
}

impl TemplateCompositor {
    /// Build a compositor, reading every partial once up front.
    pub async fn load(
        layout: TemplateLayout,
        options: CompilerOptions,
        cache: Arc<CompiledTemplateCache>,
    ) -> Result<Self, RenderError> {
        let partials = load_partials(&layout.partials_path(), &layout.extension).await?;
        debug!(
            target = "marginalia::templates",
            partials = partials.len(),
            base_dir = %layout.base_dir.display(),
            "Template compositor ready"
        );
        Ok(Self::with_partials(layout, options, partials, cache))
    }

    pub fn with_partials(
        layout: TemplateLayout,
        options: CompilerOptions,
        partials: Vec<(String, String)>,
        cache: Arc<CompiledTemplateCache>,
    ) -> Self {
        Self {
            layout,
            options,
            partials,
            cache,
        }
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub fn cache(&self) -> &Arc<CompiledTemplateCache> {
        &self.cache
    }

    /// Render `template_name` with `context`, then compose it into the default
    /// layout (exposed to the layout as `body`) if the layout file exists.
    pub async fn render(
        &self,
        template_name: &str,
        context: &TemplateContext,
    ) -> Result<String, RenderError> {
        let template_path = self.layout.template_path(template_name);
        if !path_exists(&template_path).await? {
            return Err(RenderError::template_not_found(template_path));
        }

        let mut engine_context = Context::from_serialize(context).map_err(|err| {
            RenderError::internal(SOURCE, format!("template context rejected: {err}"))
        })?;

        let template = self.compiled(&template_path).await?;
        let body = template.render(&engine_context)?;

        let layout_path = self.layout.layout_path();
        if !path_exists(&layout_path).await? {
            return Ok(body);
        }

        let layout = self.compiled(&layout_path).await?;
        engine_context.insert("body", &body);
        layout.render(&engine_context)
    }

    /// Fetch the compiled template for `path`, compiling and caching it on a miss.
    pub async fn compiled(&self, path: &Path) -> Result<Arc<CompiledTemplate>, RenderError> {
        if let Some(template) = self.cache.get(path) {
            counter!(TEMPLATE_CACHE_HIT_TOTAL).increment(1);
            return Ok(template);
        }

        counter!(TEMPLATE_CACHE_MISS_TOTAL).increment(1);
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => RenderError::template_not_found(path),
                _ => RenderError::internal(
                    SOURCE,
                    format!("failed to read `{}`: {err}", path.display()),
                ),
            })?;

        let compiled = CompiledTemplate::compile(
            path.display().to_string(),
            &source,
            &self.partials,
            &self.options,
        )?;
        debug!(
            target = "marginalia::templates",
            path = %path.display(),
            "Compiled template"
        );
        Ok(self.cache.insert(path.to_path_buf(), compiled))
    }
}

async fn path_exists(path: &Path) -> Result<bool, RenderError> {
    tokio::fs::try_exists(path).await.map_err(|err| {
        RenderError::internal(
            SOURCE,
            format!("failed to stat `{}`: {err}", path.display()),
        )
    })
}

/// Read `<dir>/*.<ext>` as `(stem, source)` pairs sorted by stem. A missing
/// directory means no partials.
async fn load_partials(
    dir: &Path,
    extension: &str,
) -> Result<Vec<(String, String)>, RenderError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(RenderError::internal(
                SOURCE,
                format!("failed to list partials in `{}`: {err}", dir.display()),
            ));
        }
    };

    let mut partials = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                return Err(RenderError::internal(
                    SOURCE,
                    format!("failed to list partials in `{}`: {err}", dir.display()),
                ));
            }
        };

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let is_file = entry
            .file_type()
            .await
            .map(|kind| kind.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        let source = tokio::fs::read_to_string(&path).await.map_err(|err| {
            RenderError::internal(
                SOURCE,
                format!("failed to read partial `{}`: {err}", path.display()),
            )
        })?;
        partials.push((stem.to_string(), source));
    }

    partials.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(partials)
}
