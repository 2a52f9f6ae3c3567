//! Payment gateway collaborator
//!
//! Thin HTTP client for the external payment gateway plus the webhook
//! payload types it delivers. The gateway owns the actual money movement;
//! this crate only creates deposit/withdrawal intents and maps the
//! asynchronous confirmation events back onto wallet transactions.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::DomainError;

/// Gateway response to a deposit intent
#[derive(Debug, Deserialize)]
pub struct DepositIntent {
    pub transaction_id: String,
    pub reference: String,
    pub payment_url: String,
}

/// Gateway response to a withdrawal request
#[derive(Debug, Deserialize)]
pub struct WithdrawalIntent {
    pub transaction_id: String,
    pub reference: String,
}

/// Event types the gateway delivers on its webhook
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventType {
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "withdrawal.completed")]
    WithdrawalCompleted,
    #[serde(rename = "withdrawal.failed")]
    WithdrawalFailed,
}

/// Webhook payload delivered by the gateway
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub event: GatewayEventType,
    pub transaction_id: String,
}

/// HTTP client for the payment gateway API
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct CreateIntentBody<'a> {
    user_id: Uuid,
    amount: Decimal,
    currency: &'a str,
}

impl GatewayClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            api_key,
        }
    }

    /// Create a deposit intent; the user completes payment at the
    /// returned URL and the gateway confirms via webhook.
    pub async fn create_deposit(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<DepositIntent, DomainError> {
        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateIntentBody {
                user_id,
                amount,
                currency: "USD",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DomainError::Gateway(format!(
                "deposit intent rejected with status {}",
                response.status()
            )));
        }

        Ok(response.json::<DepositIntent>().await?)
    }

    /// Create a withdrawal; the gateway pays out asynchronously and
    /// confirms via webhook.
    pub async fn create_withdrawal(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<WithdrawalIntent, DomainError> {
        let response = self
            .client
            .post(format!("{}/v1/withdrawals", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateIntentBody {
                user_id,
                amount,
                currency: "USD",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DomainError::Gateway(format!(
                "withdrawal rejected with status {}",
                response.status()
            )));
        }

        Ok(response.json::<WithdrawalIntent>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_event_decoding() {
        let payload = r#"{"event":"payment.completed","transaction_id":"gw_123"}"#;
        let event: GatewayEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.event, GatewayEventType::PaymentCompleted);
        assert_eq!(event.transaction_id, "gw_123");

        let payload = r#"{"event":"withdrawal.failed","transaction_id":"gw_456"}"#;
        let event: GatewayEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.event, GatewayEventType::WithdrawalFailed);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let payload = r#"{"event":"payment.reversed","transaction_id":"gw_789"}"#;
        assert!(serde_json::from_str::<GatewayEvent>(payload).is_err());
    }
}
