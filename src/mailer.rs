use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;

use crate::error::{Error, Result};
use crate::settings::SmtpSettings;

/// Splits a comma-separated address list, dropping blanks.
pub fn parse_recipients(recipients: &str) -> Vec<String> {
    recipients
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|err| Error::Mail(format!("invalid address '{address}': {err}")))
}

/// Builds a plain-text message to `to`, copying `cc`.
pub fn build_message(
    sender: &str,
    to: &[String],
    cc: &[String],
    subject: &str,
    body: &str,
) -> Result<Message> {
    if to.is_empty() {
        return Err(Error::Mail("no recipients".to_string()));
    }

    let mut builder = Message::builder()
        .from(mailbox(sender)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN);
    for address in to {
        builder = builder.to(mailbox(address)?);
    }
    for address in cc {
        builder = builder.cc(mailbox(address)?);
    }

    builder
        .body(body.to_string())
        .map_err(|err| Error::Mail(err.to_string()))
}

/// Sends the daily report over an authenticated STARTTLS relay.
pub struct Mailer {
    transport: SmtpTransport,
    sender: String,
    recipients: Vec<String>,
    cc: Vec<String>,
}

impl Mailer {
    /// Connects with the configured sender and the `SMTP_PASSWORD` environment variable.
    pub fn from_settings(smtp: &SmtpSettings) -> Result<Self> {
        if smtp.sender.trim().is_empty() {
            return Err(Error::NotConfigured("smtp.sender"));
        }
        let password = env::var("SMTP_PASSWORD").map_err(|_| Error::NotConfigured("SMTP_PASSWORD"))?;

        let transport = SmtpTransport::starttls_relay(&smtp.host)
            .map_err(|err| Error::Mail(err.to_string()))?
            .credentials(Credentials::new(smtp.sender.clone(), password))
            .build();

        Ok(Self {
            transport,
            sender: smtp.sender.clone(),
            recipients: parse_recipients(&smtp.recipients),
            cc: parse_recipients(&smtp.cc),
        })
    }

    /// Sends to the configured recipients, or to `to` when given.
    pub fn send(&self, to: Option<&[String]>, subject: &str, body: &str) -> Result<()> {
        let to = to.unwrap_or(self.recipients.as_slice());
        let message = build_message(&self.sender, to, &self.cc, subject, body)?;

        self.transport
            .send(&message)
            .map_err(|err| Error::Mail(err.to_string()))?;

        tracing::info!(recipients = to.len(), cc = self.cc.len(), subject, "sent email");
        Ok(())
    }
}
