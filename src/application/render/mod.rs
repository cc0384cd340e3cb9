//! Per-request rendering: read raw content, parse it, run the plugin chain and
//! compose the result through the template layer.
//!
//! The controller is the only place failures are recovered. Everything beneath
//! it propagates [`RenderError`](crate::application::error::RenderError) as-is.

mod controller;
mod loader;
mod parser;

pub use controller::{
    HARD_FALLBACK_HTML, NOT_FOUND_CONTENT_PATH, NOT_FOUND_ROUTE, RenderController, RenderOutcome,
    SiteProfile,
};
pub use loader::ContentLoader;
pub use parser::{ComrakParser, ContentParser, ParsedContent, default_parser};
