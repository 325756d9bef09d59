//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honors `RUST_LOG` and falls back to `info` when it is unset; calling it
/// more than once is harmless.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Initialize logging for unit tests so output is captured per test
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
