//! # wavelink-logging
//!
//! `tracing` subscriber setup for applications embedding the wavelink
//! client engine. The engine itself only emits `tracing` events; wiring
//! them to an output is the embedder's choice, and this crate provides
//! the default.

#![deny(unsafe_code)]

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Minimum log level to display when `RUST_LOG` is unset
///   (e.g. `"warn"` or `"wavelink_socket=debug"`).
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}
