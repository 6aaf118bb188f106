//! Posts the daily report to a Discord channel webhook.

use reqwest::blocking::multipart::{Form, Part};
use serde_json::json;

use crate::error::{Error, Result};

/// Discord rejects messages longer than this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

const SERVICE: &str = "Discord";

/// Cuts `content` to Discord's limit, ending in an ellipsis when anything was dropped.
pub fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(MAX_CONTENT_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

pub struct DiscordWebhook {
    http: reqwest::blocking::Client,
    url: Option<String>,
}

impl DiscordWebhook {
    pub fn new(http: reqwest::blocking::Client, url: Option<String>) -> Self {
        let url = url.filter(|url| !url.trim().is_empty());
        Self { http, url }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Sends `message` with the rendered table attached as `file_name`.
    pub fn send_report(&self, message: &str, png: Vec<u8>, file_name: &str) -> Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or(Error::NotConfigured("Discord webhook URL"))?;

        let payload = json!({ "content": truncate_content(message) });
        let image = Part::bytes(png)
            .file_name(file_name.to_string())
            .mime_str("image/png")?;
        let form = Form::new()
            .text("payload_json", payload.to_string())
            .part("files[0]", image);

        let response = self.http.post(url).multipart(form).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .unwrap_or_else(|_| "Failed to read response body".to_string());
            return Err(Error::Remote {
                service: SERVICE,
                message: format!("HTTP {status}: {body}"),
            });
        }

        tracing::info!(file_name, "sent report to Discord");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_untouched() {
        assert_eq!(truncate_content("안녕하세요"), "안녕하세요");
        let exact = "가".repeat(MAX_CONTENT_CHARS);
        assert_eq!(truncate_content(&exact), exact);
    }

    #[test]
    fn long_messages_are_cut_by_characters() {
        let long = "가".repeat(MAX_CONTENT_CHARS + 10);
        let cut = truncate_content(&long);
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn missing_webhook_is_reported() {
        let webhook = DiscordWebhook::new(reqwest::blocking::Client::new(), None);
        assert!(!webhook.is_configured());
        assert!(matches!(
            webhook.send_report("hi", Vec::new(), "report.png"),
            Err(Error::NotConfigured(_))
        ));
    }
}
