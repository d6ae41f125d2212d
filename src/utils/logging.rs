//! Tracing setup

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::DEFAULT_LOG_FILTER;

static TRACING_INIT: Once = Once::new();

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `directive`; an unparsable directive falls back to
/// [`DEFAULT_LOG_FILTER`]. Later calls are no-ops, and an already installed
/// global subscriber is left in place.
pub fn init_tracing(directive: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directive))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
