//! log output.
//!
//! logs are written to stderr, leaving stdout to the `--watch` meter. the level is picked by
//! the number of `-v` flags, and `RUST_LOG` takes precedence when it is set.

use {
    std::io,
    tracing_subscriber::{
        EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    },
};

/// installs the global log subscriber.
pub fn init(verbosity: u8) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
}

/// trigger events and errors are always logged; observations at `-v`, raw counters at `-vv`.
fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    format!("warn,{}={level}", env!("CARGO_CRATE_NAME"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity() {
        assert_eq!(default_directives(0), "warn,cpu_sysrq=info");
        assert_eq!(default_directives(1), "warn,cpu_sysrq=debug");
        assert_eq!(default_directives(2), "warn,cpu_sysrq=trace");
        assert_eq!(default_directives(9), "warn,cpu_sysrq=trace");
    }

    #[test]
    fn directives_parse() {
        for verbosity in 0..3 {
            assert!(EnvFilter::try_new(default_directives(verbosity)).is_ok());
        }
    }
}
