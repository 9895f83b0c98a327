use anyhow::{Context, Result};
use clap::Args;
use lettre::message::{header::ContentType, Mailbox};
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use crate::notify::message::NotificationMessage;

/// SMTP relay used for completion emails
#[derive(Args, Clone, Debug)]
pub struct SmtpConfig {
    /// SMTP relay host
    #[arg(long, env = "SUBMIT_SMTP_HOST", default_value = "localhost")]
    pub smtp_host: String,

    /// SMTP relay port
    #[arg(long, env = "SUBMIT_SMTP_PORT", default_value_t = 25)]
    pub smtp_port: u16,
}

/// Send `message` to its recipient, who is also the sender
pub fn send(message: &NotificationMessage, config: &SmtpConfig) -> Result<()> {
    let mailbox: Mailbox = message.recipient.parse()
        .with_context(|| format!("Invalid email address `{}'", message.recipient))?;
    let email = Message::builder()
        .from(mailbox.clone())
        .to(mailbox)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(message.body.clone())
        .context("Can't build notification email")?;

    let mailer = SmtpTransport::builder_dangerous(config.smtp_host.as_str())
        .port(config.smtp_port)
        .build();
    mailer.send(&email)
        .with_context(|| format!("Can't send notification through {}:{}", config.smtp_host, config.smtp_port))?;

    info!("Notification sent to {}: {}", message.recipient, message.subject);
    Ok(())
}
