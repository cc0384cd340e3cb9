//! Static asset lookup on the local filesystem.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::application::{
    error::RenderError,
    router::{StaticAsset, StaticAssets},
};

const SOURCE: &str = "infra::assets";

/// Serves regular files below a root directory.
#[derive(Debug, Clone)]
pub struct DiskAssetStore {
    root: PathBuf,
}

impl DiskAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidate(&self, path: &str) -> Option<PathBuf> {
        let candidate = path.trim_start_matches('/');
        if candidate.is_empty()
            || candidate.ends_with('/')
            || !is_contained(Path::new(candidate))
        {
            // Never serve directories or anything outside the root.
            return None;
        }
        Some(self.root.join(candidate))
    }
}

#[async_trait]
impl StaticAssets for DiskAssetStore {
    async fn fetch(&self, path: &str) -> Result<Option<StaticAsset>, RenderError> {
        let Some(full_path) = self.candidate(path) else {
            return Ok(None);
        };

        match tokio::fs::metadata(&full_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(err) if is_absent(err.kind()) => return Ok(None),
            Err(err) => {
                return Err(RenderError::internal(
                    SOURCE,
                    format!("failed to stat `{}`: {err}", full_path.display()),
                ));
            }
        }

        let contents = tokio::fs::read(&full_path).await.map_err(|err| {
            RenderError::internal(
                SOURCE,
                format!("failed to read `{}`: {err}", full_path.display()),
            )
        })?;

        let mime = mime_guess::from_path(&full_path).first_or_octet_stream();
        Ok(Some(StaticAsset {
            contents: Bytes::from(contents),
            mime,
        }))
    }
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn is_absent(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::NotFound | ErrorKind::NotADirectory)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, DiskAssetStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("css")).expect("css dir");
        std::fs::write(dir.path().join("css/site.css"), "body{}").expect("write css");
        std::fs::write(dir.path().join("blob"), [0u8, 1, 2]).expect("write blob");
        let store = DiskAssetStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn serves_files_with_inferred_mime() {
        let (_dir, store) = store();
        let asset = store
            .fetch("css/site.css")
            .await
            .expect("lookup")
            .expect("asset");
        assert_eq!(asset.contents, Bytes::from_static(b"body{}"));
        assert_eq!(asset.mime.essence_str(), "text/css");
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let (_dir, store) = store();
        let asset = store.fetch("blob").await.expect("lookup").expect("asset");
        assert_eq!(asset.mime, mime_guess::mime::APPLICATION_OCTET_STREAM);
    }

    #[tokio::test]
    async fn absent_files_and_directories_are_not_assets() {
        let (_dir, store) = store();
        assert!(store.fetch("index").await.expect("lookup").is_none());
        assert!(store.fetch("css").await.expect("lookup").is_none());
        assert!(store.fetch("css/").await.expect("lookup").is_none());
        assert!(store.fetch("css/site.css/x").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn traversal_is_refused() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("secret"), "x").expect("write");
        let nested = DiskAssetStore::new(dir.path().join("css"));
        assert!(nested.fetch("../secret").await.expect("lookup").is_none());
        assert!(store.fetch("").await.expect("lookup").is_none());
        assert!(store.fetch("css/../blob").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn double_dots_inside_a_file_name_are_allowed() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("app..min.js"), "let a;").expect("write js");

        let asset = store
            .fetch("app..min.js")
            .await
            .expect("lookup")
            .expect("asset");

        assert_eq!(asset.contents, Bytes::from_static(b"let a;"));
        assert!(asset.mime.essence_str().contains("javascript"));
    }
}
