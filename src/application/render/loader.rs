use std::{
    io::ErrorKind,
    path::{Component, Path},
    sync::Arc,
};

use tracing::debug;

use crate::{application::error::RenderError, domain::content::ContentSources};

const SOURCE: &str = "application::render::loader";

/// Reads raw content files from the storage root of a content source.
#[derive(Debug, Clone)]
pub struct ContentLoader {
    sources: Arc<ContentSources>,
}

impl ContentLoader {
    pub fn new(sources: Arc<ContentSources>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &ContentSources {
        &self.sources
    }

    /// Read `<source.path>/<path>` for the source registered under `content_type`.
    pub async fn get_content(&self, path: &str, content_type: &str) -> Result<String, RenderError> {
        let source = self.sources.find_by_type(content_type).ok_or_else(|| {
            RenderError::configuration(format!("unknown content type `{content_type}`"))
        })?;

        let relative = Path::new(path);
        let full_path = source.path.join(relative);
        if !is_contained(relative) {
            return Err(RenderError::not_found(full_path));
        }

        debug!(
            target = "marginalia::render::loader",
            path = %full_path.display(),
            content_type,
            "Reading content"
        );

        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => RenderError::not_found(&full_path),
                _ => RenderError::internal(
                    SOURCE,
                    format!("failed to read `{}`: {err}", full_path.display()),
                ),
            })
    }
}

/// Relative paths that cannot climb out of the storage root.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::content::ContentSource;

    fn loader() -> (TempDir, ContentLoader) {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("posts")).expect("posts dir");
        std::fs::write(dir.path().join("posts/hello.md"), "# Hello").expect("write post");

        let sources = ContentSources::new(vec![
            ContentSource::new("post", dir.path().join("posts"), "blog/"),
            ContentSource::new("page", dir.path().to_path_buf(), ""),
        ])
        .expect("sources");
        (dir, ContentLoader::new(Arc::new(sources)))
    }

    #[tokio::test]
    async fn reads_from_the_typed_source() {
        let (_dir, loader) = loader();
        let raw = loader.get_content("hello.md", "post").await.expect("reads");
        assert_eq!(raw, "# Hello");
    }

    #[tokio::test]
    async fn unknown_type_is_a_configuration_error() {
        let (_dir, loader) = loader();
        let err = loader
            .get_content("hello.md", "draft")
            .await
            .expect_err("unknown type");
        assert!(matches!(err, RenderError::Configuration { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (dir, loader) = loader();
        let err = loader
            .get_content("missing.md", "post")
            .await
            .expect_err("missing");
        assert_eq!(
            err,
            RenderError::not_found(dir.path().join("posts").join("missing.md"))
        );
    }

    #[tokio::test]
    async fn parent_components_are_refused() {
        let (_dir, loader) = loader();
        let err = loader
            .get_content("../posts/hello.md", "post")
            .await
            .expect_err("escapes root");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn directory_read_is_internal() {
        let (_dir, loader) = loader();
        let err = loader
            .get_content("posts", "page")
            .await
            .expect_err("directory");
        assert!(matches!(err, RenderError::Internal { .. }));
    }
}
