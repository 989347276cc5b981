//! Tracing subscriber set-up

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is unset. Covers the server crate and the
/// `check_overdue` binary at the configured level.
fn default_directive(level: &str) -> String {
    format!("libris_server={level},check_overdue={level},tower_http=debug")
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. When a log directory is
/// configured, output goes to a daily-rolling file and the returned guard
/// must be kept alive for the lifetime of the process.
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        default_directive(&config.level).into()
    });

    let (writer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "libris.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(config.directory.is_none())
                    .with_writer(writer),
            )
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_both_binaries() {
        let directive = default_directive("warn");
        assert!(directive.contains("libris_server=warn"));
        assert!(directive.contains("check_overdue=warn"));
        assert!(directive.parse::<EnvFilter>().is_ok());
    }
}
