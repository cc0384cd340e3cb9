//! Application services layer.

pub mod error;
pub mod plugins;
pub mod render;
pub mod router;
pub mod site;
pub mod templates;
