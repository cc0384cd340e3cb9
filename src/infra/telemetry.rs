use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const TEMPLATE_CACHE_HIT_TOTAL: &str = "marginalia_template_cache_hit_total";
pub const TEMPLATE_CACHE_MISS_TOTAL: &str = "marginalia_template_cache_miss_total";
pub const RENDER_FALLBACK_TOTAL: &str = "marginalia_render_fallback_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            TEMPLATE_CACHE_HIT_TOTAL,
            Unit::Count,
            "Compiled template lookups served from the cache."
        );
        describe_counter!(
            TEMPLATE_CACHE_MISS_TOTAL,
            Unit::Count,
            "Compiled template lookups that required compilation."
        );
        describe_counter!(
            RENDER_FALLBACK_TOTAL,
            Unit::Count,
            "Renders that ended in a 404 fallback, labelled by fallback kind."
        );
    });
}
