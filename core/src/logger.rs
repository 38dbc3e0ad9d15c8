//----------------------------------------------------------------------------------------- std lib
use std::io::Write;
use std::time::Instant;
//--------------------------------------------------------------------------------- other libraries
use log::info;
use once_cell::sync::Lazy;
use tracing_subscriber::{Layer as _, fmt::format::FmtSpan, layer::SubscriberExt as _};

// This will get initialized below.
/// Returns the init [`Instant`]
pub static INIT_INSTANT: Lazy<Instant> = Lazy::new(Instant::now);

/// Returns the seconds since [`INIT_INSTANT`].
#[cfg(not(tarpaulin_include))]
pub fn uptime() -> u64 {
    INIT_INSTANT.elapsed().as_secs()
}

/// The filter used when `RUST_LOG` isn't set:
/// everything off, except for songswap and its sub-crates.
fn default_filter(filter: log::LevelFilter) -> String {
    format!("off,songswap={filter}")
}

//---------------------------------------------------------------------------------------------------- Logger init function
#[allow(clippy::module_name_repetitions)]
/// Initializes the logger.
///
/// This enables console logging on all the internals of `songswap`.
///
/// Functionality is provided by [`log`].
///
/// The levels are:
/// - ERROR
/// - WARN
/// - INFO
/// - DEBUG
/// - TRACE
///
/// # Panics
/// This must only be called _once_.
#[cfg(not(tarpaulin_include))]
pub fn init_logger(filter: log::LevelFilter) {
    use crate::format_duration;
    // Initialize timer.
    let now = Lazy::force(&INIT_INSTANT);

    // `RUST_LOG` wins over the flag when it is set.
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let filters = if env.is_empty() {
        default_filter(filter)
    } else {
        env.clone()
    };

    env_logger::Builder::new()
        .format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            let level = match record.level() {
                log::Level::Debug => "D",
                log::Level::Trace => "T",
                log::Level::Info => "I",
                log::Level::Warn => "W",
                log::Level::Error => "E",
            };
            writeln!(
                buf,
                // Longest PATH in the repo: `client/src/state/submission.rs` - `30` characters
                // Longest file in the repo: `client/src/state/session.rs`    - `4` digits
                "| {style}{}{style:#} | {} | {: >30} @ {: <4} | {}",
                level,
                format_duration(&now.elapsed()),
                record.file_static().unwrap_or("???"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .write_style(env_logger::WriteStyle::Auto)
        .parse_filters(&filters)
        .init();

    if env.is_empty() {
        info!("Log Level (Flag) ... {}", filter);
    } else {
        info!("Log Level (RUST_LOG) ... {}", env);
    }
}

/// Initializes the tracing layer.
///
/// Spans around service calls are reported when they close, so at `debug` and above
/// every request shows up with its timing.
///
/// # Panics
///
/// panics if the tracing filter cannot be parsed.
#[must_use]
pub fn init_tracing(filter: log::LevelFilter) -> impl tracing::Subscriber {
    let subscriber = tracing_subscriber::registry();

    #[cfg(not(feature = "verbose_tracing"))]
    let filter = tracing_subscriber::EnvFilter::builder()
        .parse(default_filter(filter))
        .unwrap();
    #[cfg(feature = "verbose_tracing")]
    let filter = tracing_subscriber::EnvFilter::builder()
        .parse(format!("{filter},hyper=off,h2=off"))
        .unwrap();

    subscriber.with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false)
            .with_filter(filter),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_str_eq;

    #[test]
    fn test_default_filter() {
        assert_str_eq!(default_filter(log::LevelFilter::Debug), "off,songswap=DEBUG");
    }
}
