//! In-memory payment gateway for development and tests
//!
//! Behaves like the hosted provider from the reconciler's point of view:
//! checkouts are registered as PENDING and stay there until somebody flips
//! them with [`SimulatedGateway::mark_paid`] or [`SimulatedGateway::mark_cancelled`].
//! No money moves and no network is touched.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::application::ports::{
    CheckoutRequest, CheckoutSession, GatewayOrderStatus, PaymentGatewayPort,
};
use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone)]
struct SimulatedOrder {
    raw_status: String,
    paid_at: Option<DateTime<Utc>>,
    transaction_ref: Option<String>,
}

/// Fake hosted-checkout provider backed by a [`DashMap`].
pub struct SimulatedGateway {
    orders: DashMap<i64, SimulatedOrder>,
    checkouts: AtomicU64,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            checkouts: AtomicU64::new(0),
        }
    }

    /// Number of checkout sessions created since startup.
    pub fn checkouts_created(&self) -> u64 {
        self.checkouts.load(Ordering::Relaxed)
    }

    /// Simulate the payer completing the checkout.
    pub fn mark_paid(&self, order_code: i64) {
        if let Some(mut order) = self.orders.get_mut(&order_code) {
            order.raw_status = "PAID".to_string();
            order.paid_at = Some(Utc::now());
            order.transaction_ref = Some(format!("SIMTX-{}", order_code));
        }
    }

    /// Simulate the payer backing out on the gateway side.
    pub fn mark_cancelled(&self, order_code: i64) {
        if let Some(mut order) = self.orders.get_mut(&order_code) {
            if order.raw_status != "PAID" {
                order.raw_status = "CANCELLED".to_string();
            }
        }
    }

    /// Raw status of an order, if the gateway knows about it.
    pub fn status_of(&self, order_code: i64) -> Option<String> {
        self.orders.get(&order_code).map(|o| o.raw_status.clone())
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGatewayPort for SimulatedGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> DomainResult<CheckoutSession> {
        self.orders.insert(
            request.order_code,
            SimulatedOrder {
                raw_status: "PENDING".to_string(),
                paid_at: None,
                transaction_ref: None,
            },
        );
        self.checkouts.fetch_add(1, Ordering::Relaxed);

        Ok(CheckoutSession {
            checkout_url: format!("https://pay.simulated.test/checkout/{}", request.order_code),
            qr_code: format!("SIMQR|{}|{}", request.order_code, request.amount),
        })
    }

    async fn fetch_status(&self, order_code: i64) -> DomainResult<GatewayOrderStatus> {
        let order = self
            .orders
            .get(&order_code)
            .ok_or_else(|| DomainError::External {
                service: "SimulatedGateway",
                reason: format!("Unknown order {}", order_code),
            })?;

        Ok(GatewayOrderStatus {
            order_code,
            raw_status: order.raw_status.clone(),
            paid_at: order.paid_at,
            transaction_ref: order.transaction_ref.clone(),
        })
    }

    async fn cancel_order(&self, order_code: i64, _reason: &str) -> DomainResult<()> {
        match self.orders.get_mut(&order_code) {
            Some(order) if order.raw_status == "PAID" => Err(DomainError::Conflict(
                "Order has already been paid".to_string(),
            )),
            Some(mut order) => {
                order.raw_status = "CANCELLED".to_string();
                Ok(())
            }
            // Nothing to void
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(order_code: i64) -> CheckoutRequest {
        CheckoutRequest {
            order_code,
            amount: 480_000,
            description: "Deposit for booking test".to_string(),
            return_url: "https://rentra.local/payment/return".to_string(),
            cancel_url: "https://rentra.local/payment/cancel".to_string(),
        }
    }

    #[tokio::test]
    async fn checkout_registers_a_pending_order() {
        let gateway = SimulatedGateway::new();

        let session = gateway.create_checkout(request(1001)).await.unwrap();
        assert!(session.checkout_url.contains("1001"));
        assert_eq!(gateway.checkouts_created(), 1);

        let status = gateway.fetch_status(1001).await.unwrap();
        assert_eq!(status.raw_status, "PENDING");
        assert!(status.paid_at.is_none());
        assert!(status.transaction_ref.is_none());
    }

    #[tokio::test]
    async fn paid_orders_report_a_timestamp_and_resist_cancellation() {
        let gateway = SimulatedGateway::new();
        gateway.create_checkout(request(1002)).await.unwrap();

        gateway.mark_paid(1002);
        let status = gateway.fetch_status(1002).await.unwrap();
        assert_eq!(status.raw_status, "PAID");
        assert!(status.paid_at.is_some());
        assert_eq!(status.transaction_ref.as_deref(), Some("SIMTX-1002"));

        let cancel = gateway.cancel_order(1002, "too late").await;
        assert!(matches!(cancel, Err(DomainError::Conflict(_))));
        assert_eq!(gateway.status_of(1002), Some("PAID".to_string()));
    }

    #[tokio::test]
    async fn unknown_orders_are_an_error() {
        let gateway = SimulatedGateway::new();
        let result = gateway.fetch_status(9999).await;
        assert!(matches!(result, Err(DomainError::External { .. })));
    }
}
