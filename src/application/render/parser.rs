use std::sync::Arc;

use comrak::{markdown_to_html, options::Options};
use once_cell::sync::Lazy;
use serde_json::{Number, Value};

use crate::{application::error::RenderError, domain::content::Metadata};

const SOURCE: &str = "application::render::parser";
const FRONT_MATTER_FENCE: &str = "+++";

/// Rendered HTML plus the metadata collected while parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedContent {
    pub content: String,
    pub metadata: Metadata,
}

/// Turns raw content into HTML and initial metadata.
pub trait ContentParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedContent, RenderError>;
}

/// GitHub-flavoured markdown with optional `+++` TOML front matter.
pub struct ComrakParser {
    options: Options<'static>,
}

impl ComrakParser {
    fn new() -> Self {
        let mut options = Options::default();
        let ext = &mut options.extension;
        ext.strikethrough = true;
        ext.table = true;
        ext.autolink = true;
        ext.tasklist = true;
        ext.footnotes = true;

        options.render.r#unsafe = true;
        Self { options }
    }
}

impl Default for ComrakParser {
    fn default() -> Self {
        Self::new()
    }
}

static PARSER: Lazy<Arc<ComrakParser>> = Lazy::new(|| Arc::new(ComrakParser::new()));

/// Shared parser instance, built on first use.
pub fn default_parser() -> Arc<ComrakParser> {
    Arc::clone(&PARSER)
}

impl ContentParser for ComrakParser {
    fn parse(&self, raw: &str) -> Result<ParsedContent, RenderError> {
        let (front_matter, body) = split_front_matter(raw);
        let metadata = match front_matter {
            Some(source) => parse_front_matter(source)?,
            None => Metadata::new(),
        };

        Ok(ParsedContent {
            content: markdown_to_html(body, &self.options),
            metadata,
        })
    }
}

/// Split a leading `+++` fenced block from the body. Without a closing fence the
/// whole input is treated as body.
fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = raw
        .strip_prefix(FRONT_MATTER_FENCE)
        .and_then(|rest| rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')))
    else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FRONT_MATTER_FENCE {
            let front_matter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(front_matter), body);
        }
        offset += line.len();
    }

    (None, raw)
}

fn parse_front_matter(source: &str) -> Result<Metadata, RenderError> {
    let table: toml::Table = toml::from_str(source)
        .map_err(|err| RenderError::internal(SOURCE, format!("invalid front matter: {err}")))?;

    Ok(table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect())
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text),
        toml::Value::Integer(number) => Value::Number(number.into()),
        toml::Value::Float(number) => Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(flag) => Value::Bool(flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
