use clap::ValueEnum;
use std::io::IsTerminal;
use tracing::subscriber::set_global_default;
use tracing::{Level, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::filter::combinator::Or;
use tracing_subscriber::filter::{EnvFilter, FilterExt, Targets};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Registry, fmt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// Bunyan JSON records
    Json,
}

/// Target prefix of this crate's own events.
const CRATE_TARGET: &str = "discord_notifier";

/// `RUST_LOG` (or `default_filter`) for everything, but this crate's warnings
/// and errors always pass so fatal diagnostics reach stderr.
fn log_filter<S>(default_filter: &str) -> Or<EnvFilter, Targets, S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    env_filter.or(Targets::new().with_target(CRATE_TARGET, Level::WARN))
}

/// Builds the subscriber. All output goes to stderr so stdout stays free for
/// the dry-run summary.
pub fn get_subscriber(
    name: String,
    env_filter: String,
    format: LogFormat,
) -> Box<dyn Subscriber + Send + Sync> {
    match format {
        LogFormat::Text => Box::new(
            Registry::default().with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_target(false)
                    .without_time()
                    .with_filter(log_filter(&env_filter)),
            ),
        ),
        LogFormat::Json => Box::new(
            Registry::default().with(JsonStorageLayer).with(
                BunyanFormattingLayer::new(name, std::io::stderr)
                    .with_filter(log_filter(&env_filter)),
            ),
        ),
    }
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    match LogTracer::init() {
        Ok(_) => (),
        Err(e) => eprintln!("Failed to set logger: {}", e),
    };
    if let Err(e) = set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {}", e);
    }
}
