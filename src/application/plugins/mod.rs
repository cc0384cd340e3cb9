//! Plugin capabilities, the compile-time plugin registry and the built-in plugins.
//!
//! A plugin may expose a content transform, a template extension, both, or
//! neither. The pipeline consults each capability in registration order and
//! skips plugins that do not provide it.

mod canonical;
mod external_links;
mod pipeline;
mod reading_time;
mod sanitize;

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    application::error::RenderError,
    domain::content::{Metadata, PluginContext, TemplateContext},
};

pub use canonical::CanonicalUrlPlugin;
pub use external_links::ExternalLinksPlugin;
pub use pipeline::PluginPipeline;
pub use reading_time::ReadingTimePlugin;
pub use sanitize::SanitizePlugin;

/// Output of a transform hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformed {
    pub content: String,
    /// Keys to merge into the accumulated metadata; later plugins win.
    pub metadata: Option<Metadata>,
}

impl Transformed {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Rewrites rendered content and optionally contributes metadata.
#[async_trait]
pub trait ContentTransform: Send + Sync {
    async fn transform(
        &self,
        content: &str,
        context: &PluginContext,
    ) -> Result<Transformed, RenderError>;
}

/// Replaces the template context. Implementations return a complete context.
#[async_trait]
pub trait TemplateExtension: Send + Sync {
    async fn extend_template(
        &self,
        context: TemplateContext,
    ) -> Result<TemplateContext, RenderError>;
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn transformer(&self) -> Option<&dyn ContentTransform> {
        None
    }

    fn template_extender(&self) -> Option<&dyn TemplateExtension> {
        None
    }
}

/// Builds a plugin from its configured options.
pub type PluginFactory = fn(&Value) -> Result<Arc<dyn Plugin>, RenderError>;

/// Statically populated mapping from plugin name to factory.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: BTreeMap<&'static str, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every plugin shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(reading_time::NAME, reading_time::factory)
            .register(external_links::NAME, external_links::factory)
            .register(sanitize::NAME, sanitize::factory)
            .register(canonical::NAME, canonical::factory);
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: PluginFactory) -> &mut Self {
        self.factories.insert(name, factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn instantiate(&self, name: &str, options: &Value) -> Result<Arc<dyn Plugin>, RenderError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RenderError::plugin_load(name, "no plugin registered under this name"))?;
        factory(options)
    }
}

/// Decode plugin options, treating an absent value as the defaults.
pub(crate) fn parse_options<T>(plugin: &str, options: &Value) -> Result<T, RenderError>
where
    T: DeserializeOwned + Default,
{
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options.clone())
        .map_err(|err| RenderError::plugin_load(plugin, format!("invalid options: {err}")))
}
