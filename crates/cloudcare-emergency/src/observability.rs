//! Log output for the emergency service.
//!
//! The subscriber is installed once at startup at `info`; the level from the
//! configuration file is swapped in through a reload handle once it is known.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

const STARTUP_LEVEL: &str = "info";

/// Filter directives to use for `level`. A non-empty `RUST_LOG` wins.
fn directives(level: &str, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        Some(env) if !env.is_empty() => env.to_string(),
        _ => level.to_ascii_lowercase(),
    }
}

fn filter_for(level: &str) -> EnvFilter {
    let rust_log = std::env::var("RUST_LOG").ok();
    let wanted = directives(level, rust_log.as_deref());
    EnvFilter::try_new(&wanted).unwrap_or_else(|e| {
        eprintln!("Ignoring log filter {wanted:?}: {e}");
        EnvFilter::new(STARTUP_LEVEL)
    })
}

pub fn init_tracing() {
    let (filter, handle) = reload::Layer::new(filter_for(STARTUP_LEVEL));
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switch to the configured level. `RUST_LOG` keeps precedence.
pub fn apply_logging_level(level: &str) {
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    if let Err(e) = handle.reload(filter_for(level)) {
        tracing::warn!(error = %e, level, "Could not apply logging level");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_without_rust_log() {
        assert_eq!(directives("DEBUG", None), "debug");
        assert_eq!(directives("warn", Some("  ")), "warn");
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        assert_eq!(
            directives("info", Some("cloudcare_core=trace")),
            "cloudcare_core=trace"
        );
    }
}
