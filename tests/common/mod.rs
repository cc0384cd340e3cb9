#![allow(dead_code)]

use std::{path::Path, sync::Arc};

use marginalia::{
    application::{
        router::RequestRouter,
        site::{SiteParts, build_site},
    },
    config::{self, CliArgs},
    infra::assets::DiskAssetStore,
};
use tempfile::TempDir;

/// A throwaway site on disk: `content/`, `content/posts/`, `templates/`, `assets/`.
pub struct TestSite {
    dir: TempDir,
    plugins: String,
    sources: String,
}

impl TestSite {
    pub fn new() -> Self {
        let site = Self {
            dir: tempfile::tempdir().expect("tempdir"),
            plugins: String::new(),
            sources: String::new(),
        };
        site.write("templates/page.html", "<main>{{ content }}</main>");
        site.write("templates/post.html", "<article>{{ content }}</article>");
        std::fs::create_dir_all(site.path("assets")).expect("assets dir");
        site
    }

    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(path, contents).expect("write file");
    }

    /// Append a `[[content.sources]]` entry. Without any, the site gets a `post`
    /// source at `blog/` followed by a catch-all `page` source.
    pub fn source(mut self, content_type: &str, relative: &str, route: &str) -> Self {
        self.sources.push_str(&format!(
            "[[content.sources]]\ntype = \"{content_type}\"\npath = {}\nroute = \"{route}\"\n\n",
            toml_path(&self.path(relative))
        ));
        self
    }

    /// Append a `[[plugins]]` entry; `options` is an inline TOML table body.
    pub fn plugin(mut self, name: &str, options: Option<&str>) -> Self {
        self.plugins
            .push_str(&format!("[[plugins]]\nname = \"{name}\"\n"));
        if let Some(options) = options {
            self.plugins.push_str(&format!("options = {{ {options} }}\n"));
        }
        self.plugins.push('\n');
        self
    }

    pub async fn router(&self) -> Arc<RequestRouter> {
        let sources = if self.sources.is_empty() {
            format!(
                "[[content.sources]]\ntype = \"post\"\npath = {}\nroute = \"blog/\"\n\n\
                 [[content.sources]]\ntype = \"page\"\npath = {}\nroute = \"\"\n\n",
                toml_path(&self.path("content/posts")),
                toml_path(&self.path("content")),
            )
        } else {
            self.sources.clone()
        };

        let config = format!(
            "[site]\ntitle = \"Test Site\"\ndefault_content_type = \"page\"\n\n\
             [templates]\ndirectory = {}\n\n\
             [assets]\ndirectory = {}\n\n{sources}{}",
            toml_path(&self.path("templates")),
            toml_path(&self.path("assets")),
            self.plugins,
        );
        self.write("marginalia-test.toml", &config);

        let cli = CliArgs {
            config_file: Some(self.path("marginalia-test.toml")),
            command: None,
        };
        let settings = config::load(&cli).expect("settings load");
        let assets = Arc::new(DiskAssetStore::new(settings.assets.directory.clone()));
        let router = build_site(&settings, SiteParts::new(assets))
            .await
            .expect("site builds");
        Arc::new(router)
    }
}

fn toml_path(path: &Path) -> String {
    format!("{:?}", path.display().to_string())
}
