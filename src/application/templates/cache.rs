use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use tera::{Context, Tera};

use crate::application::error::RenderError;

const SOURCE: &str = "application::templates::cache";

/// A template (or layout) compiled together with every registered partial.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    engine: Tera,
    name: String,
}

impl CompiledTemplate {
    /// Compile `source` under `name`. Partials are registered first so the
    /// template can `{% include %}` them by stem.
    pub fn compile(
        name: impl Into<String>,
        source: &str,
        partials: &[(String, String)],
        options: &CompilerOptions,
    ) -> Result<Self, RenderError> {
        let name = name.into();
        let mut engine = Tera::default();
        if options.autoescape {
            // An empty suffix matches every template name.
            engine.autoescape_on(vec![""]);
        } else {
            engine.autoescape_on(Vec::new());
        }

        let templates = partials
            .iter()
            .map(|(stem, body)| (stem.as_str(), body.as_str()))
            .chain(std::iter::once((name.as_str(), source)));
        engine
            .add_raw_templates(templates)
            .map_err(|err| compile_failure(&name, &err))?;

        Ok(Self { engine, name })
    }

    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        self.engine
            .render(&self.name, context)
            .map_err(|err| render_failure(&self.name, &err))
    }
}

/// Per-site knobs handed to the template engine at compile time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    /// HTML-escape every `{{ }}` interpolation.
    pub autoescape: bool,
}

/// Compiled templates keyed by resolved path.
///
/// Entries are never invalidated. Compilation is a pure function of the file
/// contents, so two requests racing to compile the same path both insert an
/// equivalent value and the later write simply replaces the earlier one.
#[derive(Debug, Default)]
pub struct CompiledTemplateCache {
    entries: DashMap<PathBuf, Arc<CompiledTemplate>>,
}

impl CompiledTemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<CompiledTemplate>> {
        self.entries.get(path).map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert(&self, path: PathBuf, template: CompiledTemplate) -> Arc<CompiledTemplate> {
        let template = Arc::new(template);
        self.entries.insert(path, Arc::clone(&template));
        template
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compile_failure(name: &str, err: &tera::Error) -> RenderError {
    RenderError::internal(
        SOURCE,
        format!("failed to compile `{name}`: {}", describe(err)),
    )
}

fn render_failure(name: &str, err: &tera::Error) -> RenderError {
    RenderError::internal(
        SOURCE,
        format!("failed to render `{name}`: {}", describe(err)),
    )
}

/// Tera keeps the useful detail in the source chain.
fn describe(err: &tera::Error) -> String {
    let mut messages = vec![err.to_string()];
    let mut current = std::error::Error::source(err);
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages.join(": ")
}
