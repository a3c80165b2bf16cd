use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self, format::DefaultFields, format::Format};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "skill_progress=info";
const VERBOSE_DIRECTIVE: &str = "skill_progress=debug,info";

/// `RUST_LOG` wins over the built-in directive.
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

// stdout carries the report, logs go to stderr
fn stderr_layer<S>() -> fmt::Layer<S, DefaultFields, Format, fn() -> io::Stderr>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(io::stderr as fn() -> io::Stderr)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

pub fn init_cli_logger(verbose: bool) {
    let directive = if verbose { VERBOSE_DIRECTIVE } else { DEFAULT_DIRECTIVE };

    tracing_subscriber::registry()
        .with(env_filter(directive))
        .with(stderr_layer().with_target(false).compact())
        .init();
}

/// Machine-readable output for log collectors; keeps targets so the engine
/// and adapter events can be told apart.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_DIRECTIVE))
        .with(stderr_layer().with_target(true).json())
        .init();
}
