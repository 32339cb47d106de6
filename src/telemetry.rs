use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::configuration::{Environment, LogSettings};

/// Build the level filter: `RUST_LOG` wins, then the configured level.
/// The test environment is silent unless `RUST_LOG` asks otherwise.
pub fn env_filter(log: &LogSettings, environment: Environment) -> EnvFilter {
    let fallback = match environment {
        Environment::Test => "off",
        _ => log.level.as_str(),
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize structured logging once, at process start.
///
/// Production emits JSON lines on stdout; other environments get the
/// human-readable formatter.
pub fn init_telemetry(log: &LogSettings, environment: Environment) {
    let filter = env_filter(log, environment);

    if environment.is_production() {
        let formatting_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .json();
        tracing_subscriber::registry()
            .with(filter)
            .with(formatting_layer)
            .init();
    } else {
        let formatting_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false);
        tracing_subscriber::registry()
            .with(filter)
            .with(formatting_layer)
            .init();
    }
}
