//! Content sources and the per-render values threaded through the pipeline.

use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DomainError;

/// Open key/value bag accumulated by parsing and by plugins.
pub type Metadata = Map<String, Value>;

/// Shallow merge: keys from `incoming` replace keys already present in `target`.
pub fn merge_metadata(target: &mut Metadata, incoming: Metadata) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

/// A named, routed storage bucket for one kind of markdown content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSource {
    #[serde(rename = "type")]
    pub content_type: String,
    /// Storage root for files of this type.
    pub path: PathBuf,
    /// URL prefix selecting this source.
    pub route: String,
}

impl ContentSource {
    pub fn new(
        content_type: impl Into<String>,
        path: impl Into<PathBuf>,
        route: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            path: path.into(),
            route: route.into(),
        }
    }

    /// Whether this source's route is a prefix of the given request path.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(self.route.as_str())
    }
}

/// Ordered list of content sources. Each content type appears at most once and the
/// configured order is the dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSources {
    sources: Vec<ContentSource>,
}

impl ContentSources {
    pub fn new(sources: Vec<ContentSource>) -> Result<Self, DomainError> {
        for (idx, source) in sources.iter().enumerate() {
            if source.content_type.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "content source #{idx} has an empty type"
                )));
            }
            if sources[..idx]
                .iter()
                .any(|earlier| earlier.content_type == source.content_type)
            {
                return Err(DomainError::duplicate_content_type(&source.content_type));
            }
        }
        Ok(Self { sources })
    }

    pub fn find_by_type(&self, content_type: &str) -> Option<&ContentSource> {
        self.sources
            .iter()
            .find(|source| source.content_type == content_type)
    }

    /// First source, in configuration order, whose route prefixes `path`.
    pub fn first_match(&self, path: &str) -> Option<&ContentSource> {
        self.sources.iter().find(|source| source.matches(path))
    }

    /// Mapping of content type to storage root, as exposed to plugins.
    pub fn type_paths(&self) -> BTreeMap<String, PathBuf> {
        self.sources
            .iter()
            .map(|source| (source.content_type.clone(), source.path.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentSource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Read-only snapshot handed to every transform hook. Built once per render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginContext {
    pub content_type: String,
    pub route: String,
    pub template_dir: PathBuf,
    pub content_sources: BTreeMap<String, PathBuf>,
    pub site_url: String,
}

/// Value folded through the `extend_template` chain and finally handed to the
/// template engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateContext {
    pub content: String,
    pub metadata: Metadata,
    pub route: String,
    pub site_title: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sources() -> ContentSources {
        ContentSources::new(vec![
            ContentSource::new("post", "content/posts", "blog/"),
            ContentSource::new("draft", "content/drafts", "blog/drafts/"),
            ContentSource::new("page", "content", ""),
        ])
        .expect("valid sources")
    }

    #[test]
    fn later_metadata_keys_win() {
        let mut base = Metadata::new();
        base.insert("x".into(), json!(1));
        base.insert("keep".into(), json!("a"));

        let mut incoming = Metadata::new();
        incoming.insert("x".into(), json!(2));

        merge_metadata(&mut base, incoming);

        assert_eq!(base.get("x"), Some(&json!(2)));
        assert_eq!(base.get("keep"), Some(&json!("a")));
    }

    #[test]
    fn first_configured_route_wins_over_longer_match() {
        let sources = sources();
        let matched = sources.first_match("blog/drafts/wip").expect("match");
        assert_eq!(matched.content_type, "post");
    }

    #[test]
    fn empty_route_matches_everything() {
        let sources = sources();
        let matched = sources.first_match("about").expect("match");
        assert_eq!(matched.content_type, "page");
    }

    #[test]
    fn duplicate_types_are_rejected() {
        let err = ContentSources::new(vec![
            ContentSource::new("post", "a", "a/"),
            ContentSource::new("post", "b", "b/"),
        ])
        .expect_err("duplicate type");
        assert_eq!(err, DomainError::duplicate_content_type("post"));
    }

    #[test]
    fn type_paths_expose_every_source() {
        let paths = sources().type_paths();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths.get("post"), Some(&PathBuf::from("content/posts")));
    }
}
