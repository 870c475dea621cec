//! Tracking-code notification dispatch.
//!
//! Mail is fire-and-forget: it runs after the registration transaction has
//! committed and a failure is logged, never surfaced to the applicant. The
//! trait exists so tests can capture dispatches without a mail provider.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_tracking_code(&self, email: &str, tracking_code: &str) -> Result<()>;
}

/// Dispatches through an HTTP mail API (Mailgun-style JSON endpoint).
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_token: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_token: Option<String>, from: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_token,
            from,
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_tracking_code(&self, email: &str, tracking_code: &str) -> Result<()> {
        let payload = MailPayload {
            from: &self.from,
            to: email,
            subject: "Código de seguimiento",
            text: format!("Su código de seguimiento es: {tracking_code}"),
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("failed to reach mail API")?
            .error_for_status()
            .context("mail API rejected the message")?;

        debug!(status = %response.status(), "tracking code mail accepted");
        Ok(())
    }
}

/// Used when no mail API is configured; dispatches are logged and dropped.
pub struct NoopMailer;

#[async_trait]
impl Notifier for NoopMailer {
    async fn send_tracking_code(&self, email: &str, tracking_code: &str) -> Result<()> {
        debug!(%email, %tracking_code, "mail API not configured, skipping notification");
        Ok(())
    }
}
