use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::{application::error::RenderError, domain::content::TemplateContext};

use super::{Plugin, TemplateExtension, parse_options};

pub(super) const NAME: &str = "canonical";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {
    base_url: Option<String>,
}

pub(super) fn factory(options: &Value) -> Result<Arc<dyn Plugin>, RenderError> {
    let options: Options = parse_options(NAME, options)?;
    let base_url = options
        .base_url
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| RenderError::plugin_load(NAME, "`base_url` option is required"))?;
    Url::parse(base_url.trim())
        .map_err(|err| RenderError::plugin_load(NAME, format!("invalid base_url: {err}")))?;

    Ok(Arc::new(CanonicalUrlPlugin::new(base_url.trim())))
}

/// Adds `metadata.canonical_url` and defaults `metadata.title` to the site title.
#[derive(Debug, Clone)]
pub struct CanonicalUrlPlugin {
    base_url: String,
}

impl CanonicalUrlPlugin {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Plugin for CanonicalUrlPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn template_extender(&self) -> Option<&dyn TemplateExtension> {
        Some(self)
    }
}

#[async_trait]
impl TemplateExtension for CanonicalUrlPlugin {
    async fn extend_template(
        &self,
        mut context: TemplateContext,
    ) -> Result<TemplateContext, RenderError> {
        let canonical = format!("{}{}", self.base_url, context.route);
        context
            .metadata
            .insert("canonical_url".into(), json!(canonical));
        if !context.metadata.contains_key("title") {
            context
                .metadata
                .insert("title".into(), json!(context.site_title.clone()));
        }
        Ok(context)
    }
}
