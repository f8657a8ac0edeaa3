//! Diagnostic logging
//!
//! Tracing output goes to stderr so it never mixes with the progress lines
//! printed on stdout. `RUST_LOG` takes precedence over the verbosity flag.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,gitops_promote=debug,promote=debug"
    } else {
        "warn,gitops_promote=info,promote=info"
    }
}

/// Install the global subscriber
///
/// Only the first call takes effect.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .ok();
}
