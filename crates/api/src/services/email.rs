//! Outgoing mail transports.
//!
//! - `console`: logs the message (development)
//! - `smtp`: lettre async SMTP transport
//! - `sendgrid`: SendGrid v3 HTTP API

use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    /// Overrides the configured sender address.
    pub from: Option<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

impl EmailMessage {
    /// Builds a message from a stored body, which may be HTML or plain text.
    pub fn from_stored(to: &str, from: &str, subject: &str, body: &str) -> Self {
        let is_html = body.trim_start().starts_with('<');
        Self {
            to: to.to_string(),
            to_name: None,
            from: Some(from.to_string()).filter(|f| !f.is_empty()),
            reply_to: None,
            subject: subject.to_string(),
            body_text: if is_html { html_to_text(body) } else { body.to_string() },
            body_html: is_html.then(|| body.to_string()),
        }
    }
}

/// Crude tag stripper for the plain text alternative of HTML bodies.
pub fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut tag = String::new();

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag.trim_start_matches('/').split_whitespace().next().unwrap_or("");
                if matches!(name, "p" | "br" | "br/" | "div" | "li" | "h1" | "h2" | "h3" | "tr") {
                    text.push('\n');
                }
            }
            _ if in_tag => tag.push(ch),
            _ => text.push(ch),
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    smtp: Option<AsyncSmtpTransport<Tokio1Executor>>,
    http: reqwest::Client,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("enabled", &self.config.enabled)
            .field("provider", &self.config.provider)
            .finish()
    }
}

impl EmailService {
    /// Builds the service. An unusable SMTP host is reported when sending, not here.
    pub fn new(config: EmailConfig) -> Self {
        let smtp = if config.provider == "smtp" && !config.smtp_host.is_empty() {
            match build_smtp_transport(&config) {
                Ok(transport) => Some(transport),
                Err(e) => {
                    error!(error = %e, host = %config.smtp_host, "Failed to build SMTP transport");
                    None
                }
            }
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            smtp,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn sender_email(&self) -> &str {
        &self.config.sender_email
    }

    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message),
            "smtp" => self.send_smtp(message).await,
            "sendgrid" => self.send_sendgrid(message).await,
            provider => Err(EmailError::NotConfigured(format!("unknown provider '{}'", provider))),
        }
    }

    fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %message.from.as_deref().unwrap_or(&self.config.sender_email),
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body");
        Ok(())
    }

    async fn send_smtp(&self, message: EmailMessage) -> Result<(), EmailError> {
        let transport = self
            .smtp
            .as_ref()
            .ok_or_else(|| EmailError::NotConfigured("smtp_host is not set".into()))?;

        let email = self.build_lettre_message(&message)?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        info!(to = %message.to, subject = %message.subject, "Email sent via SMTP");
        Ok(())
    }

    fn build_lettre_message(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        let from_address = message.from.as_deref().unwrap_or(&self.config.sender_email);
        let from = Mailbox::new(
            Some(self.config.sender_name.clone()),
            from_address
                .parse()
                .map_err(|_| EmailError::InvalidAddress(from_address.to_string()))?,
        );
        let to = Mailbox::new(
            message.to_name.clone(),
            message
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(message.to.clone()))?,
        );

        let mut builder = Message::builder().from(from).to(to).subject(message.subject.clone());
        if let Some(reply_to) = &message.reply_to {
            builder = builder.reply_to(
                reply_to
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(reply_to.clone()))?,
            );
        }

        let built = match &message.body_html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                message.body_text.clone(),
                html.clone(),
            )),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(message.body_text.clone()),
        };
        built.map_err(|e| EmailError::SendFailed(e.to_string()))
    }

    async fn send_sendgrid(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured("sendgrid_api_key is not set".into()));
        }

        let body = self.sendgrid_payload(&message);

        let response = self
            .http
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }

    fn sendgrid_payload(&self, message: &EmailMessage) -> serde_json::Value {
        let mut to = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            to["name"] = serde_json::json!(name);
        }

        let mut content = vec![serde_json::json!({
            "type": "text/plain",
            "value": message.body_text
        })];
        if let Some(html) = &message.body_html {
            content.push(serde_json::json!({ "type": "text/html", "value": html }));
        }

        let mut body = serde_json::json!({
            "personalizations": [{ "to": [to] }],
            "from": {
                "email": message.from.as_deref().unwrap_or(&self.config.sender_email),
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": content
        });
        if let Some(reply_to) = &message.reply_to {
            body["reply_to"] = serde_json::json!({ "email": reply_to });
        }
        body
    }
}

fn build_smtp_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
    let builder = if config.smtp_use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| EmailError::NotConfigured(e.to_string()))?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
    };

    let mut builder = builder.port(config.smtp_port);
    if !config.smtp_username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ));
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            sender_email: "cms@example.com".to_string(),
            sender_name: "CMS".to_string(),
            ..Default::default()
        }
    }

    fn message() -> EmailMessage {
        EmailMessage::from_stored("user@example.com", "", "Hello", "<p>Hi&nbsp;there</p><p>Bye</p>")
    }

    #[test]
    fn test_from_stored_detects_html() {
        let msg = message();
        assert_eq!(msg.body_text, "Hi there\nBye");
        assert!(msg.body_html.is_some());
        assert_eq!(msg.from, None);

        let plain = EmailMessage::from_stored("a@b.c", "x@y.z", "S", "just text");
        assert_eq!(plain.body_text, "just text");
        assert_eq!(plain.body_html, None);
        assert_eq!(plain.from.as_deref(), Some("x@y.z"));
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(html_to_text("<h1>Title</h1>Line<br>Next &amp; more"), "Title\nLine\nNext & more");
    }

    #[tokio::test]
    async fn test_send_console_email() {
        let service = EmailService::new(test_config());
        assert!(service.send(message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_disabled_silently_succeeds() {
        let service = EmailService::new(EmailConfig::default());
        assert!(!service.is_enabled());
        assert!(service.send(message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_smtp_without_host_is_not_configured() {
        let service = EmailService::new(EmailConfig {
            provider: "smtp".into(),
            ..test_config()
        });
        assert!(matches!(
            service.send(message()).await,
            Err(EmailError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_sendgrid_without_key_is_not_configured() {
        let service = EmailService::new(EmailConfig {
            provider: "sendgrid".into(),
            ..test_config()
        });
        assert!(matches!(
            service.send(message()).await,
            Err(EmailError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_lettre_message_rejects_bad_address() {
        let service = EmailService::new(test_config());
        let mut msg = message();
        msg.to = "not an address".into();
        assert!(matches!(
            service.build_lettre_message(&msg),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_sendgrid_payload() {
        let service = EmailService::new(test_config());
        let mut msg = message();
        msg.reply_to = Some("reply@example.com".into());
        let payload = service.sendgrid_payload(&msg);
        assert_eq!(payload["from"]["email"], "cms@example.com");
        assert_eq!(payload["content"].as_array().unwrap().len(), 2);
        assert_eq!(payload["reply_to"]["email"], "reply@example.com");
    }
}
