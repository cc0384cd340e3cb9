use std::{cell::RefCell, rc::Rc, sync::Arc};

use async_trait::async_trait;
use lol_html::{RewriteStrSettings, rewrite_str, text};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    application::error::RenderError,
    domain::content::{Metadata, PluginContext},
};

use super::{ContentTransform, Plugin, Transformed, parse_options};

pub(super) const NAME: &str = "reading_time";
const SOURCE: &str = "application::plugins::reading_time";
const DEFAULT_WORDS_PER_MINUTE: u32 = 225;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Options {
    words_per_minute: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
        }
    }
}

pub(super) fn factory(options: &Value) -> Result<Arc<dyn Plugin>, RenderError> {
    let options: Options = parse_options(NAME, options)?;
    if options.words_per_minute == 0 {
        return Err(RenderError::plugin_load(
            NAME,
            "words_per_minute must be greater than zero",
        ));
    }
    Ok(Arc::new(ReadingTimePlugin::new(options.words_per_minute)))
}

/// Counts visible words and records `word_count` and `reading_time_minutes`.
/// Content passes through untouched.
#[derive(Debug, Clone)]
pub struct ReadingTimePlugin {
    words_per_minute: u32,
}

impl ReadingTimePlugin {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
        }
    }

    fn minutes(&self, words: u32) -> u32 {
        if words == 0 {
            return 0;
        }
        words.div_ceil(self.words_per_minute).max(1)
    }
}

impl Plugin for ReadingTimePlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn transformer(&self) -> Option<&dyn ContentTransform> {
        Some(self)
    }
}

#[async_trait]
impl ContentTransform for ReadingTimePlugin {
    async fn transform(
        &self,
        content: &str,
        _context: &PluginContext,
    ) -> Result<Transformed, RenderError> {
        let words = count_words(content)?;

        let mut metadata = Metadata::new();
        metadata.insert("word_count".into(), json!(words));
        metadata.insert("reading_time_minutes".into(), json!(self.minutes(words)));

        Ok(Transformed::content(content).with_metadata(metadata))
    }
}

/// Words in text nodes only; markup and attribute values are ignored.
fn count_words(html: &str) -> Result<u32, RenderError> {
    let buffer = Rc::new(RefCell::new(String::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![text!("*", {
                let buffer = Rc::clone(&buffer);
                move |chunk| {
                    let mut buffer = buffer.borrow_mut();
                    buffer.push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        buffer.push(' ');
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::internal(SOURCE, err.to_string()))?;

    let words = buffer.borrow().split_whitespace().count();
    Ok(u32::try_from(words).unwrap_or(u32::MAX))
}
