//! Notification dispatch
//!
//! The engine treats delivery as a fire-and-forget side effect behind the
//! [`Notifier`] trait: the emitter logs a failed send and moves on, it never
//! retries and never blocks the dedup bookkeeping.

use async_trait::async_trait;
use reqwest::Client;
use std::env;
use std::time::Duration;
use url::Url;

use crate::errors::EngineError;
use crate::models::{Channel, Notification};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// ---------------------------------------------------------------------------
/// Notifier Trait
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn notify(
    &self,
    channel: Channel,
    client_id: &str,
    message: &str,
  ) -> Result<(), EngineError>;
}

/// ---------------------------------------------------------------------------
/// Webhook Notifier
/// ---------------------------------------------------------------------------

/// Posts notifications as JSON to a delivery gateway (the push/email fan-out
/// lives behind that endpoint, not here).
pub struct WebhookNotifier {
  client: Client,
  endpoint: Url,
}

impl WebhookNotifier {
  pub fn new(endpoint: &str) -> Result<Self, EngineError> {
    let endpoint = Url::parse(endpoint)
      .map_err(|e| EngineError::InvalidConfig(format!("Bad webhook URL: {}", e)))?;

    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .map_err(|e| EngineError::NotificationDeliveryFailed(e.to_string()))?;

    Ok(Self { client, endpoint })
  }

  /// Reads `PULSE_WEBHOOK_URL` from the environment.
  pub fn from_env() -> Result<Self, EngineError> {
    let endpoint = env::var("PULSE_WEBHOOK_URL")
      .map_err(|_| EngineError::MissingConfig("PULSE_WEBHOOK_URL".into()))?;
    Self::new(&endpoint)
  }
}

#[async_trait]
impl Notifier for WebhookNotifier {
  async fn notify(
    &self,
    channel: Channel,
    client_id: &str,
    message: &str,
  ) -> Result<(), EngineError> {
    let payload = Notification {
      channel,
      client_id: client_id.to_string(),
      message: message.to_string(),
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .json(&payload)
      .send()
      .await
      .map_err(|e| EngineError::NotificationDeliveryFailed(e.to_string()))?;

    if !response.status().is_success() {
      return Err(EngineError::NotificationDeliveryFailed(format!(
        "Gateway returned {}",
        response.status()
      )));
    }

    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Log Notifier
/// ---------------------------------------------------------------------------

/// Writes notifications to the log instead of a transport. Useful as a
/// default in environments without a gateway.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn notify(
    &self,
    channel: Channel,
    client_id: &str,
    message: &str,
  ) -> Result<(), EngineError> {
    tracing::info!(%channel, client_id, message, "notification");
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
