use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Suppress all tracing output by default (overrideable by `RUST_LOG`).
    #[default]
    Default,
    /// Show debug messages by default (overrideable by `RUST_LOG`).
    Verbose,
}

/// Configure `tracing` for the given [`Level`], taking into account the
/// `RUST_LOG` environment variable.
///
/// Log output goes to stderr so it never mixes with the per-file report on
/// stdout.
pub fn setup_logging(level: Level) {
    let filter = match level {
        Level::Default => EnvFilter::builder()
            .with_default_directive(LevelFilter::OFF.into())
            .from_env_lossy(),
        Level::Verbose => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("trimzip=debug")),
    };

    let with_target = level == Level::Verbose;
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(with_target)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
