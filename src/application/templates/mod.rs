//! Template compilation, caching and layout composition.

mod cache;
mod compositor;

pub use cache::{CompiledTemplate, CompiledTemplateCache, CompilerOptions};
pub use compositor::{TemplateCompositor, TemplateLayout};
