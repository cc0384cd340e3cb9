use std::{cell::Cell, collections::BTreeSet, rc::Rc, sync::Arc};

use async_trait::async_trait;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use serde_json::{Value, json};
use url::Url;

use crate::{
    application::error::RenderError,
    domain::content::{Metadata, PluginContext},
};

use super::{ContentTransform, Plugin, Transformed};

pub(super) const NAME: &str = "external_links";
const SOURCE: &str = "application::plugins::external_links";

pub(super) fn factory(_options: &Value) -> Result<Arc<dyn Plugin>, RenderError> {
    Ok(Arc::new(ExternalLinksPlugin))
}

/// Marks off-site links with `rel="noopener noreferrer"` and `target="_blank"`.
/// Links under the configured site URL count as internal.
#[derive(Debug, Clone, Default)]
pub struct ExternalLinksPlugin;

impl Plugin for ExternalLinksPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn transformer(&self) -> Option<&dyn ContentTransform> {
        Some(self)
    }
}

#[async_trait]
impl ContentTransform for ExternalLinksPlugin {
    async fn transform(
        &self,
        content: &str,
        context: &PluginContext,
    ) -> Result<Transformed, RenderError> {
        let (html, external) = mark_external_links(content, &context.site_url)?;

        let mut metadata = Metadata::new();
        metadata.insert("external_links".into(), json!(external));
        Ok(Transformed::content(html).with_metadata(metadata))
    }
}

fn mark_external_links(html: &str, site_url: &str) -> Result<(String, u32), RenderError> {
    let count = Rc::new(Cell::new(0u32));
    let site = Url::parse(site_url).ok();

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", {
                let count = Rc::clone(&count);
                move |el| {
                    let Some(href) = el.get_attribute("href") else {
                        return Ok(());
                    };
                    if !is_external(&href, site.as_ref()) {
                        return Ok(());
                    }

                    count.set(count.get().saturating_add(1));
                    let rel = merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                    el.set_attribute("rel", &rel)?;
                    el.set_attribute("target", "_blank")?;
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::internal(SOURCE, err.to_string()))?;

    Ok((rewritten, count.get()))
}

/// Absolute http(s) links whose origin differs from the site's.
fn is_external(href: &str, site: Option<&Url>) -> bool {
    let Ok(link) = Url::parse(href) else {
        return false;
    };
    if !matches!(link.scheme(), "http" | "https") {
        return false;
    }
    match site {
        Some(site) => !same_origin(&link, site),
        None => true,
    }
}

fn same_origin(link: &Url, site: &Url) -> bool {
    link.scheme() == site.scheme()
        && link.host_str() == site.host_str()
        && link.port_or_known_default() == site.port_or_known_default()
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}
