use crate::configuration::{EffectiveConfig, Overrides, ResolvedConfig, load_config, resolve};
use crate::notifications::NotificationRequest;
use crate::telemetry::LogFormat;
use crate::traits::MessageSender;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

pub const WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";

const NOT_SET: &str = "(not set)";

#[derive(Debug, Clone, Parser)]
#[command(name = "discord-notifier", version, about = "Send a notification to a Discord webhook")]
pub struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Webhook URL, overrides "webhook_url" from the config file
    #[arg(short, long, env = WEBHOOK_URL_ENV)]
    pub webhook_url: Option<String>,

    /// Message to send
    #[arg(short, long)]
    pub message: String,

    /// Display name, overrides "default_username" from the config file
    #[arg(short, long)]
    pub username: Option<String>,

    /// Avatar URL, overrides "default_avatar_url" from the config file
    #[arg(short, long)]
    pub avatar_url: Option<String>,

    /// Files to attach
    #[arg(short = 'f', long, num_args = 1..)]
    pub attachments: Vec<PathBuf>,

    /// Print the resolved settings and exit without sending
    #[arg(short, long)]
    pub dry_run: bool,

    /// Format of the diagnostics written to stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            webhook_url: self.webhook_url.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Summary printed by `--dry-run`.
pub fn render_dry_run(cli: &Cli, resolved: &ResolvedConfig) -> String {
    let attachments = if cli.attachments.is_empty() {
        "(none)".to_string()
    } else {
        cli.attachments.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    };

    [
        "Dry run: nothing will be sent".to_string(),
        format!("Config file: {}", cli.config.display()),
        format!("Webhook URL: {}", resolved.webhook_url.as_deref().unwrap_or(NOT_SET)),
        format!("Message: {}", cli.message),
        format!("Username: {}", resolved.default_username.as_deref().unwrap_or(NOT_SET)),
        format!("Avatar URL: {}", resolved.default_avatar_url.as_deref().unwrap_or(NOT_SET)),
        format!("Attachments: {}", attachments),
    ]
    .join("\n")
}

/// Resolves settings and sends the message.
///
/// Returns `Ok(false)` when the send failed, and an error for anything that
/// stops the run before sending (bad config, no webhook URL).
pub async fn run<F, S>(cli: &Cli, make_sender: F) -> Result<bool>
where
    F: FnOnce(&EffectiveConfig) -> S,
    S: MessageSender,
{
    let config = load_config(&cli.config)?;
    let resolved = resolve(&cli.overrides(), &config);
    debug!("Resolved settings: {:?}", resolved);

    if cli.dry_run {
        println!("{}", render_dry_run(cli, &resolved));
        return Ok(true);
    }

    let effective = EffectiveConfig::try_from(resolved)?;
    let request = NotificationRequest::new(cli.message.clone())
        .with_username(effective.default_username.clone())
        .with_avatar_url(effective.default_avatar_url.clone())
        .with_attachments(cli.attachments.clone());

    info!("Sending notification with {} attachment(s)", request.attachments.len());
    let sender = make_sender(&effective);
    Ok(sender.send_message(&request).await)
}
