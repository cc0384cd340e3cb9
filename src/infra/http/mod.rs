//! HTTP adapter exposing the request router.

mod middleware;
mod public;

pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
