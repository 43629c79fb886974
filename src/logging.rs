//! Logger bootstrap for hosts and the CLI.

/// Default filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "fogmap=info";

/// Install `env_logger` as the `log` backend.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
