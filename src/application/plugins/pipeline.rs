use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    application::{error::RenderError, render::ParsedContent},
    config::PluginSettings,
    domain::content::{PluginContext, TemplateContext, merge_metadata},
};

use super::{Plugin, PluginRegistry};

/// Ordered plugin chain. Hooks run strictly in registration order and the first
/// failing hook aborts the whole chain.
#[derive(Clone, Default)]
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    /// Instantiate configured plugins through the registry. A plugin that fails to
    /// load is logged and left out; the rest of the chain still runs.
    pub fn from_settings(registry: &PluginRegistry, settings: &[PluginSettings]) -> Self {
        let mut plugins = Vec::with_capacity(settings.len());
        for entry in settings {
            match registry.instantiate(&entry.name, &entry.options) {
                Ok(plugin) => {
                    debug!(
                        target = "marginalia::plugins",
                        plugin = %entry.name,
                        "Plugin loaded"
                    );
                    plugins.push(plugin);
                }
                Err(err) => {
                    warn!(
                        target = "marginalia::plugins",
                        plugin = %entry.name,
                        error = %err,
                        "Plugin skipped"
                    );
                }
            }
        }
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    /// Run every transform hook over the parsed content, merging returned metadata
    /// on top of what has accumulated so far.
    pub async fn apply(
        &self,
        parsed: ParsedContent,
        context: &PluginContext,
    ) -> Result<ParsedContent, RenderError> {
        let ParsedContent {
            mut content,
            mut metadata,
        } = parsed;

        for plugin in &self.plugins {
            let Some(hook) = plugin.transformer() else {
                continue;
            };

            let transformed = hook.transform(&content, context).await?;
            content = transformed.content;
            if let Some(extra) = transformed.metadata {
                merge_metadata(&mut metadata, extra);
            }
        }

        Ok(ParsedContent { content, metadata })
    }

    /// Fold the template context through every extension hook. Each hook's output
    /// fully replaces the working context.
    pub async fn extend(&self, context: TemplateContext) -> Result<TemplateContext, RenderError> {
        let mut current = context;
        for plugin in &self.plugins {
            if let Some(hook) = plugin.template_extender() {
                current = hook.extend_template(current).await?;
            }
        }
        Ok(current)
    }
}
