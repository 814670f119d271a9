//! Delivery of confirmed commands
//!
//! Delivery is fire-and-forget: the session controller logs a failed
//! dispatch and moves on, it never retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::intent::IntentKind;
use crate::{Error, Result};

/// Upper bound on a webhook call
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Receives confirmed commands
#[async_trait(?Send)]
pub trait ActionSink {
    /// Deliver a confirmed command
    ///
    /// # Errors
    ///
    /// Returns error if delivery fails
    async fn dispatch(&self, kind: IntentKind, order_number: &str) -> Result<()>;
}

#[async_trait(?Send)]
impl<S: ActionSink + ?Sized> ActionSink for Box<S> {
    async fn dispatch(&self, kind: IntentKind, order_number: &str) -> Result<()> {
        (**self).dispatch(kind, order_number).await
    }
}

/// Logs commands for the kitchen screen / console
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

#[async_trait(?Send)]
impl ActionSink for ConsoleSink {
    async fn dispatch(&self, kind: IntentKind, order_number: &str) -> Result<()> {
        match kind {
            IntentKind::Launch => {
                tracing::info!(order = order_number, "order queued for preparation");
            }
            IntentKind::Ready => {
                tracing::info!(order = order_number, "order ready, notification sent");
            }
        }
        Ok(())
    }
}

/// Body posted to the order-management webhook
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    kind: IntentKind,
    order_number: &'a str,
}

/// Posts commands as JSON to an order-management endpoint
pub struct WebhookSink {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookSink {
    /// Create a webhook sink
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the HTTP client cannot be built
    pub fn new(url: &str) -> Result<Self> {
        let url = url::Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid webhook url {url}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;

        Ok(Self { client, url })
    }

    /// Target URL
    #[must_use]
    pub const fn url(&self) -> &url::Url {
        &self.url
    }
}

#[async_trait(?Send)]
impl ActionSink for WebhookSink {
    async fn dispatch(&self, kind: IntentKind, order_number: &str) -> Result<()> {
        let payload = WebhookPayload { kind, order_number };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Dispatch(format!("webhook returned {status}: {body}")));
        }

        tracing::debug!(%kind, order = order_number, url = %self.url, "webhook delivered");
        Ok(())
    }
}
