use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::TransportConfig;

/// A message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sender address this transport is authorised to use.
    fn sender(&self) -> &str;

    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Posts JSON to an HTTP mail API with a bearer key (Resend-compatible).
pub struct HttpMailTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpMailTransport {
    pub fn new(config: TransportConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("building mail HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    fn sender(&self) -> &str {
        &self.config.from
    }

    async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
        let body = SendRequest {
            from: &mail.from,
            to: [&mail.to],
            subject: &mail.subject,
            html: &mail.html,
        };

        let resp = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("mail API unreachable at {}", self.config.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            bail!("mail API returned {}: {}", status, detail);
        }

        debug!(endpoint = %self.config.endpoint, "Mail accepted by API");
        Ok(())
    }
}
