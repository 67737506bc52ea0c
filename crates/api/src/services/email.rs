//! Email delivery for password reset links.
//!
//! Supports two providers:
//! - `console`: logs the reset link (development, or no credentials)
//! - `resend`: sends through the Resend HTTP API

use crate::config::EmailConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: String,
    /// Link logged instead when no provider credentials are configured
    pub fallback_link: Option<String>,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
        }
    }

    /// Whether messages actually leave the process.
    pub fn can_send(&self) -> bool {
        self.config.provider == "resend"
            && !self.config.resend_api_key.is_empty()
            && !self.config.sender_email.is_empty()
    }

    /// Absolute reset link for `token`.
    pub fn reset_url(&self, token: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
        format!(
            "{}/reset-password?token={}",
            self.config.base_url.trim_end_matches('/'),
            encoded
        )
    }

    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.can_send() {
            self.send_resend(message).await
        } else {
            self.send_console(message);
            Ok(())
        }
    }

    /// Send the password reset link to a member.
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        to_name: &str,
        reset_token: &str,
    ) -> Result<(), EmailError> {
        let reset_url = self.reset_url(reset_token);
        let name = if to_name.trim().is_empty() {
            "there"
        } else {
            to_name.trim()
        };

        let body_html = format!(
            "<p>Hi {name},</p>\
             <p>Use this link to reset your password:</p>\
             <p><a href=\"{url}\">{url}</a></p>\
             <p>This link expires in 30 minutes and can only be used once.</p>",
            name = name,
            url = reset_url
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            subject: "Reset your Podcast Club password".to_string(),
            body_html,
            fallback_link: Some(reset_url),
        })
        .await
    }

    fn send_console(&self, message: EmailMessage) {
        match &message.fallback_link {
            Some(link) => info!(
                to = %message.to,
                link = %link,
                "[password-reset] Email fallback"
            ),
            None => info!(
                to = %message.to,
                subject = %message.subject,
                "Email not sent, no provider configured"
            ),
        }
    }

    async fn send_resend(&self, message: EmailMessage) -> Result<(), EmailError> {
        let body = serde_json::json!({
            "from": self.config.sender_email,
            "to": [message.to],
            "subject": message.subject,
            "html": message.body_html,
        });

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.config.resend_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("Resend request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via Resend");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "Resend API error");
            Err(EmailError::ProviderError(format!(
                "Resend returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console_config() -> EmailConfig {
        EmailConfig {
            base_url: "https://club.example.com/".to_string(),
            ..EmailConfig::default()
        }
    }

    #[test]
    fn test_reset_url_encodes_token() {
        let service = EmailService::new(console_config());
        assert_eq!(
            service.reset_url("a+b/c="),
            "https://club.example.com/reset-password?token=a%2Bb%2Fc%3D"
        );
    }

    #[test]
    fn test_resend_requires_credentials() {
        let mut config = console_config();
        config.provider = "resend".to_string();
        assert!(!EmailService::new(config.clone()).can_send());

        config.resend_api_key = "re_123".to_string();
        assert!(!EmailService::new(config.clone()).can_send());

        config.sender_email = "club@example.com".to_string();
        assert!(EmailService::new(config).can_send());
    }

    #[test]
    fn test_console_provider_never_sends() {
        let config = EmailConfig {
            resend_api_key: "re_123".to_string(),
            sender_email: "club@example.com".to_string(),
            ..console_config()
        };
        assert!(!EmailService::new(config).can_send());
    }

    #[tokio::test]
    async fn test_console_fallback_succeeds() {
        let service = EmailService::new(console_config());
        let result = service
            .send_password_reset_email("jane@example.com", "", "token")
            .await;
        assert!(result.is_ok());
    }
}
