//! Logging initialization for the `lumen` binary
//!
//! Human-readable or JSON output on stderr, so transformed data written to stdout is never
//! interleaved with log lines. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    let env_filter = build_env_filter(level);
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(level, json, "Logging initialized");
    Ok(())
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lumen={},lumen_ottl={}", level, level)))
}
