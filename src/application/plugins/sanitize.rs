use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{application::error::RenderError, domain::content::PluginContext};

use super::{ContentTransform, Plugin, Transformed};

pub(super) const NAME: &str = "sanitize";

pub(super) fn factory(_options: &Value) -> Result<Arc<dyn Plugin>, RenderError> {
    Ok(Arc::new(SanitizePlugin::default()))
}

/// Strips scripts, event handlers and other unsafe markup with ammonia's
/// default allow-list.
#[derive(Default)]
pub struct SanitizePlugin {
    cleaner: ammonia::Builder<'static>,
}

impl Plugin for SanitizePlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn transformer(&self) -> Option<&dyn ContentTransform> {
        Some(self)
    }
}

#[async_trait]
impl ContentTransform for SanitizePlugin {
    async fn transform(
        &self,
        content: &str,
        _context: &PluginContext,
    ) -> Result<Transformed, RenderError> {
        Ok(Transformed::content(self.cleaner.clean(content).to_string()))
    }
}
