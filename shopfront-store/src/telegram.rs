use async_trait::async_trait;
use serde::Deserialize;
use shopfront_core::{BoxError, Notifier};
use shopfront_shared::models::events::{OrderFulfilledEvent, OrderRejectedEvent};
use tracing::info;

use crate::app_config::TelegramConfig;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("telegram refused the message: {0}")]
    Rejected(String),
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: String,
}

/// Sends order updates to the customer through the Telegram Bot API
pub struct TelegramNotifier {
    http: reqwest::Client,
    endpoint: String,
    subscription_base_url: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, subscription_base_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            subscription_base_url,
        }
    }

    /// `None` when no bot token is configured
    pub fn from_config(config: &TelegramConfig) -> Option<Self> {
        let token = config.bot_token.as_deref().filter(|t| !t.is_empty())?;
        Some(Self::new(&config.api_base, token, config.subscription_base_url.clone()))
    }

    async fn send(&self, chat_id: i64, text: String) -> Result<(), TelegramError> {
        let response: SendMessageResponse = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TelegramError::Rejected(response.description));
        }
        Ok(())
    }
}

fn fulfillment_text(event: &OrderFulfilledEvent, subscription_base_url: Option<&str>) -> String {
    let mut text = format!(
        "Order #{} approved.\nAccount: {}\nData: {} GB\nDuration: {} days",
        event.order_id, event.email.0, event.data_gb, event.days
    );
    match subscription_base_url {
        Some(base) => text.push_str(&format!("\nSubscription: {}{}", base, event.sub_id)),
        None => text.push_str(&format!("\nSubscription id: {}", event.sub_id)),
    }
    text
}

fn rejection_text(event: &OrderRejectedEvent) -> String {
    match event.note.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(note) => format!("Order #{} was rejected.\nReason: {}", event.order_id, note),
        None => format!("Order #{} was rejected.", event.order_id),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_fulfillment(&self, event: &OrderFulfilledEvent) -> Result<(), BoxError> {
        let text = fulfillment_text(event, self.subscription_base_url.as_deref());
        self.send(event.customer_id, text).await?;
        Ok(())
    }

    async fn notify_rejection(&self, event: &OrderRejectedEvent) -> Result<(), BoxError> {
        self.send(event.customer_id, rejection_text(event)).await?;
        Ok(())
    }
}

/// Stand-in when no bot is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_fulfillment(&self, event: &OrderFulfilledEvent) -> Result<(), BoxError> {
        info!("Order {} fulfilled for customer {} as {}", event.order_id, event.customer_id, event.email);
        Ok(())
    }

    async fn notify_rejection(&self, event: &OrderRejectedEvent) -> Result<(), BoxError> {
        info!("Order {} rejected for customer {}", event.order_id, event.customer_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_shared::pii::Masked;

    fn fulfilled() -> OrderFulfilledEvent {
        OrderFulfilledEvent {
            order_id: 7,
            customer_id: 4242,
            email: Masked("shop-order-7".to_string()),
            sub_id: "sub-1".to_string(),
            data_gb: 50,
            days: 30,
            timestamp: 0,
        }
    }

    #[test]
    fn test_fulfillment_text_links_subscription() {
        let text = fulfillment_text(&fulfilled(), Some("https://sub.example.com/sub/"));
        assert!(text.contains("Order #7 approved."));
        assert!(text.contains("shop-order-7"));
        assert!(text.contains("https://sub.example.com/sub/sub-1"));

        let bare = fulfillment_text(&fulfilled(), None);
        assert!(bare.contains("Subscription id: sub-1"));
    }

    #[test]
    fn test_rejection_text_skips_blank_note() {
        let mut event = OrderRejectedEvent {
            order_id: 9,
            customer_id: 4242,
            note: Some("  ".to_string()),
            timestamp: 0,
        };
        assert_eq!(rejection_text(&event), "Order #9 was rejected.");

        event.note = Some("receipt unreadable".to_string());
        assert!(rejection_text(&event).ends_with("Reason: receipt unreadable"));
    }

    #[test]
    fn test_missing_token_disables_bot() {
        assert!(TelegramNotifier::from_config(&TelegramConfig::default()).is_none());
    }
}
