use std::{error::Error as StdError, path::PathBuf};

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Diagnostic chain attached to HTTP responses so the logging middleware can
/// report why a request did not succeed.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failures raised while rendering a page. The fallback state machine in the
/// render controller branches on these tags; nothing else recovers from them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("content `{}` not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("template `{}` not found", .path.display())]
    TemplateNotFound { path: PathBuf },
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("plugin `{plugin}` could not be loaded: {message}")]
    PluginLoad { plugin: String, message: String },
    #[error("{origin}: {message}")]
    Internal {
        origin: &'static str,
        message: String,
    },
}

impl RenderError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn template_not_found(path: impl Into<PathBuf>) -> Self {
        Self::TemplateNotFound { path: path.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn plugin_load(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PluginLoad {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    pub fn internal(origin: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            origin,
            message: message.into(),
        }
    }

    /// Missing content is the only failure that earns a retry against the 404 page.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::TemplateNotFound { .. } => "template_not_found",
            Self::Configuration { .. } => "configuration",
            Self::PluginLoad { .. } => "plugin_load",
            Self::Internal { .. } => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
