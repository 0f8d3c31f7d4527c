//! Support for tracing execution of a program.

use tracing_subscriber::{fmt::Subscriber, prelude::*, EnvFilter};

/// What we log when `RUST_LOG` isn't set. Anything the user needs to see goes
/// through a `Presenter` instead.
const DEFAULT_FILTER: &str = "warn";

/// Set up the `tracing` library to log to standard error, filtered by
/// `RUST_LOG`.
pub fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish()
        .init();
}
