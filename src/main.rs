use clap::Parser;
use discord_notifier::cli::{Cli, run};
use discord_notifier::notifications::Notifier;
use discord_notifier::telemetry::{get_subscriber, init_subscriber};
use std::process::ExitCode;
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = get_subscriber("discord-notifier".into(), "info".into(), cli.log_format);
    init_subscriber(subscriber);

    let span = info_span!("notify", request_id = %Uuid::new_v4());
    let outcome = run(&cli, |config| Notifier::new(config.webhook_url.clone()))
        .instrument(span)
        .await;

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
