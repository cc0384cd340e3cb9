//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::content::{ContentSource, ContentSources};

pub use cli::{CliArgs, Command, RenderArgs, ServeArgs, ServeOverrides, SiteOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "marginalia";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SITE_TITLE: &str = "Marginalia";
const DEFAULT_CONTENT_TYPE: &str = "page";
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_TEMPLATE_DIR: &str = "templates";
const DEFAULT_TEMPLATE_EXTENSION: &str = "html";
const DEFAULT_LAYOUTS_DIR: &str = "layouts";
const DEFAULT_LAYOUT_NAME: &str = "default";
const DEFAULT_PARTIALS_DIR: &str = "partials";
const DEFAULT_ASSETS_DIR: &str = "assets";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub site: SiteSettings,
    pub content: ContentSettings,
    pub templates: TemplateSettings,
    pub assets: AssetSettings,
    pub plugins: Vec<PluginSettings>,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    /// Normalised public URL with a trailing slash, or empty when unset.
    pub url: String,
    pub default_content_type: String,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub sources: ContentSources,
}

#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub directory: PathBuf,
    pub extension: String,
    pub layouts_dir: PathBuf,
    pub default_layout: String,
    pub partials_dir: PathBuf,
    pub autoescape: bool,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub directory: PathBuf,
}

/// A plugin to instantiate at startup, in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSettings {
    pub name: String,
    pub options: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MARGINALIA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_site_overrides(&args.site),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    site: RawSiteSettings,
    content: RawContentSettings,
    templates: RawTemplateSettings,
    assets: RawAssetSettings,
    plugins: Vec<RawPluginSettings>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }

        self.apply_site_overrides(&overrides.site);
    }

    fn apply_site_overrides(&mut self, overrides: &SiteOverrides) {
        if let Some(url) = overrides.site_url.as_ref() {
            self.site.url = Some(url.clone());
        }
        if let Some(title) = overrides.site_title.as_ref() {
            self.site.title = Some(title.clone());
        }
        if let Some(dir) = overrides.templates_dir.as_ref() {
            self.templates.directory = Some(dir.clone());
        }
        if let Some(dir) = overrides.assets_dir.as_ref() {
            self.assets.directory = Some(dir.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            site,
            content,
            templates,
            assets,
            plugins,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let site = build_site_settings(site, &content)?;
        let templates = build_template_settings(templates)?;
        let assets = build_asset_settings(assets);
        let plugins = build_plugin_settings(plugins)?;

        Ok(Self {
            server,
            logging,
            site,
            content,
            templates,
            assets,
            plugins,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let raw_sources = content.sources.unwrap_or_else(|| {
        vec![RawContentSource {
            content_type: Some(DEFAULT_CONTENT_TYPE.to_string()),
            path: Some(PathBuf::from(DEFAULT_CONTENT_DIR)),
            route: Some(String::new()),
        }]
    });

    if raw_sources.is_empty() {
        return Err(LoadError::invalid(
            "content.sources",
            "at least one content source is required",
        ));
    }

    let mut sources = Vec::with_capacity(raw_sources.len());
    for raw in raw_sources {
        let content_type = raw
            .content_type
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| LoadError::invalid("content.sources.type", "type must not be empty"))?;
        let path = raw
            .path
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| {
                LoadError::invalid(
                    "content.sources.path",
                    format!("source `{content_type}` requires a path"),
                )
            })?;
        let route = raw.route.unwrap_or_default();
        sources.push(ContentSource::new(content_type, path, route));
    }

    let sources = ContentSources::new(sources)
        .map_err(|err| LoadError::invalid("content.sources", err.to_string()))?;

    Ok(ContentSettings { sources })
}

fn build_site_settings(
    site: RawSiteSettings,
    content: &ContentSettings,
) -> Result<SiteSettings, LoadError> {
    let title = site
        .title
        .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    let url = normalize_site_url(site.url.as_deref().unwrap_or_default());
    if !url.is_empty() {
        Url::parse(&url)
            .map_err(|err| LoadError::invalid("site.url", format!("invalid url: {err}")))?;
    }

    let default_content_type = site
        .default_content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    if content.sources.find_by_type(&default_content_type).is_none() {
        return Err(LoadError::invalid(
            "site.default_content_type",
            format!("`{default_content_type}` does not name a configured content source"),
        ));
    }

    Ok(SiteSettings {
        title,
        url,
        default_content_type,
    })
}

fn build_template_settings(
    templates: RawTemplateSettings,
) -> Result<TemplateSettings, LoadError> {
    let directory = templates
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "templates.directory",
            "path must not be empty",
        ));
    }

    let extension = templates
        .extension
        .unwrap_or_else(|| DEFAULT_TEMPLATE_EXTENSION.to_string())
        .trim_start_matches('.')
        .to_string();
    if extension.is_empty() {
        return Err(LoadError::invalid(
            "templates.extension",
            "extension must not be empty",
        ));
    }

    let default_layout = templates
        .default_layout
        .unwrap_or_else(|| DEFAULT_LAYOUT_NAME.to_string());
    if default_layout.trim().is_empty() {
        return Err(LoadError::invalid(
            "templates.default_layout",
            "layout name must not be empty",
        ));
    }

    Ok(TemplateSettings {
        directory,
        extension,
        layouts_dir: templates
            .layouts_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LAYOUTS_DIR)),
        default_layout,
        partials_dir: templates
            .partials_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PARTIALS_DIR)),
        autoescape: templates.autoescape.unwrap_or(false),
    })
}

fn build_asset_settings(assets: RawAssetSettings) -> AssetSettings {
    AssetSettings {
        directory: assets
            .directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR)),
    }
}

fn build_plugin_settings(
    plugins: Vec<RawPluginSettings>,
) -> Result<Vec<PluginSettings>, LoadError> {
    plugins
        .into_iter()
        .map(|raw| {
            let name = raw
                .name
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| LoadError::invalid("plugins.name", "name must not be empty"))?;
            Ok(PluginSettings {
                name,
                options: raw.options.unwrap_or(serde_json::Value::Null),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    url: Option<String>,
    default_content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    sources: Option<Vec<RawContentSource>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSource {
    #[serde(rename = "type")]
    content_type: Option<String>,
    path: Option<PathBuf>,
    route: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTemplateSettings {
    directory: Option<PathBuf>,
    extension: Option<String>,
    layouts_dir: Option<PathBuf>,
    default_layout: Option<String>,
    partials_dir: Option<PathBuf>,
    autoescape: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPluginSettings {
    name: Option<String>,
    options: Option<serde_json::Value>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn normalize_site_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_trailing = trimmed.trim_end_matches('/');
    format!("{without_trailing}/")
}
