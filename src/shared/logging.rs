use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "awc=info";

/// `RUST_LOG` when it is set and parses, otherwise [`DEFAULT_LOG_FILTER`].
pub fn cli_log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the stderr subscriber used by the binary. Compiled output goes to
/// stdout, so diagnostics must never share that stream.
pub fn init_cli_logging() {
    let _ = tracing_subscriber::registry()
        .with(cli_log_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_valid() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn malformed_directives_are_rejected_instead_of_silencing_output() {
        assert!(EnvFilter::try_new("awc=loud").is_err());
    }
}
