//! PayGate hosted-checkout client
//!
//! Thin HTTP wrapper over the merchant API. Every response arrives in the
//! provider's `{ code, desc, data }` envelope; `code == "00"` means success
//! and anything else surfaces as a gateway error with the provider's own
//! description. Raw order statuses pass through untranslated — mapping to
//! ledger statuses is the reconciler's job.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::ports::{
    CheckoutRequest, CheckoutSession, GatewayOrderStatus, PaymentGatewayPort,
};
use crate::config::GatewayConfig;
use crate::domain::{DomainError, DomainResult};

const SERVICE: &str = "PayGate";

// ── Wire format ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    return_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelOrderBody<'a> {
    cancellation_reason: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    desc: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutData {
    checkout_url: String,
    qr_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderData {
    order_code: i64,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    transaction_id: Option<String>,
}

// ── Client ──────────────────────────────────────────────────────

pub struct PayGateGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PayGateGateway {
    pub fn new(config: &GatewayConfig) -> DomainResult<Self> {
        let timeout_ms = if config.timeout_ms > 0 {
            config.timeout_ms
        } else {
            15_000
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| DomainError::External {
                service: SERVICE,
                reason: format!("HTTP client init failed: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_envelope<T>(&self, response: reqwest::Response) -> DomainResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::External {
                service: SERVICE,
                reason: format!("HTTP {}", status),
            });
        }

        let envelope: Envelope<T> =
            response.json().await.map_err(|e| DomainError::External {
                service: SERVICE,
                reason: format!("Malformed response: {}", e),
            })?;

        if envelope.code != "00" {
            return Err(DomainError::External {
                service: SERVICE,
                reason: format!("{} ({})", envelope.desc, envelope.code),
            });
        }

        envelope.data.ok_or(DomainError::External {
            service: SERVICE,
            reason: "Response envelope carried no data".to_string(),
        })
    }
}

#[async_trait]
impl PaymentGatewayPort for PayGateGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> DomainResult<CheckoutSession> {
        let body = CreateOrderBody {
            order_code: request.order_code,
            amount: request.amount,
            description: &request.description,
            return_url: &request.return_url,
            cancel_url: &request.cancel_url,
        };

        let response = self
            .http
            .post(self.url("/v2/payment-requests"))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::External {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let data: CheckoutData = self.read_envelope(response).await?;
        Ok(CheckoutSession {
            checkout_url: data.checkout_url,
            qr_code: data.qr_code,
        })
    }

    async fn fetch_status(&self, order_code: i64) -> DomainResult<GatewayOrderStatus> {
        let response = self
            .http
            .get(self.url(&format!("/v2/payment-requests/{}", order_code)))
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| DomainError::External {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let data: OrderData = self.read_envelope(response).await?;
        Ok(GatewayOrderStatus {
            order_code: data.order_code,
            raw_status: data.status,
            paid_at: data.paid_at,
            transaction_ref: data.transaction_id,
        })
    }

    async fn cancel_order(&self, order_code: i64, reason: &str) -> DomainResult<()> {
        let body = CancelOrderBody {
            cancellation_reason: reason,
        };

        let response = self
            .http
            .post(self.url(&format!("/v2/payment-requests/{}/cancel", order_code)))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::External {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        // Cancellation returns the order back; we only care that it was accepted.
        let _: OrderData = self.read_envelope(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let config = GatewayConfig {
            base_url: "https://api-merchant.paygate.vn/".to_string(),
            ..GatewayConfig::default()
        };
        let gateway = PayGateGateway::new(&config).unwrap();
        assert_eq!(
            gateway.url("/v2/payment-requests"),
            "https://api-merchant.paygate.vn/v2/payment-requests"
        );
    }

    #[test]
    fn envelope_parses_provider_fields() {
        let raw = r#"{"code":"00","desc":"success","data":{"orderCode":17,"status":"PAID","paidAt":"2026-03-01T10:15:00Z","transactionId":"FT2606170042"}}"#;
        let envelope: Envelope<OrderData> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.code, "00");
        assert_eq!(envelope.desc, "success");
        let data = envelope.data.unwrap();
        assert_eq!(data.order_code, 17);
        assert_eq!(data.status, "PAID");
        assert!(data.paid_at.is_some());
        assert_eq!(data.transaction_id.as_deref(), Some("FT2606170042"));
    }

    #[test]
    fn envelope_tolerates_a_missing_transaction_id() {
        let raw = r#"{"code":"00","desc":"success","data":{"orderCode":18,"status":"PENDING","paidAt":null}}"#;
        let envelope: Envelope<OrderData> = serde_json::from_str(raw).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.status, "PENDING");
        assert!(data.transaction_id.is_none());
    }
}
