//! Booking DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::application::services::{BookingCreated, SignOutcome};
use crate::domain::{Booking, Contract, Payment};

/// Booking API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDto {
    pub id: Uuid,
    pub renter_id: String,
    pub vehicle_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_station_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_station_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub hourly_rate: i64,
    pub daily_rate: i64,
    pub total_amount: i64,
    pub deposit_amount: i64,
    pub late_fee: i64,
    pub damage_fee: i64,
    pub extra_amount: i64,
    pub refund_amount: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_check_in_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_check_out_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_confirmed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            renter_id: b.renter_id,
            vehicle_id: b.vehicle_id,
            pickup_station_id: b.pickup_station_id,
            return_station_id: b.return_station_id,
            start_time: b.start_time,
            end_time: b.end_time,
            hourly_rate: b.hourly_rate,
            daily_rate: b.daily_rate,
            total_amount: b.total_amount,
            deposit_amount: b.deposit_amount,
            late_fee: b.late_fee,
            damage_fee: b.damage_fee,
            extra_amount: b.extra_amount,
            refund_amount: b.refund_amount,
            status: b.status.as_str().to_string(),
            cancel_reason: b.cancel_reason,
            actual_check_in_at: b.actual_check_in_at,
            actual_check_out_at: b.actual_check_out_at,
            check_in_note: b.check_in_note,
            check_in_photo_url: b.check_in_photo_url,
            check_out_note: b.check_out_note,
            check_out_photo_url: b.check_out_photo_url,
            refund_confirmed_by: b.refund_confirmed_by,
            refund_confirmed_at: b.refund_confirmed_at,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Short contract view embedded in booking responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContractSummaryDto {
    pub id: Uuid,
    pub contract_number: String,
    pub status: String,
    pub token_expires_at: DateTime<Utc>,
}

impl From<&Contract> for ContractSummaryDto {
    fn from(c: &Contract) -> Self {
        Self {
            id: c.id,
            contract_number: c.contract_number.clone(),
            status: c.status.as_str().to_string(),
            token_expires_at: c.token_expires_at,
        }
    }
}

/// Payment API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub payment_type: String,
    pub amount: i64,
    pub status: String,
    pub order_code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            booking_id: p.booking_id,
            payment_type: p.payment_type.as_str().to_string(),
            amount: p.amount,
            status: p.status.as_str().to_string(),
            order_code: p.order_code,
            checkout_url: p.checkout_url,
            qr_code: p.qr_code,
            paid_at: p.paid_at,
            transaction_id: p.transaction_id,
            failure_reason: p.failure_reason,
            created_at: p.created_at,
        }
    }
}

/// Book a vehicle for a window
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    /// Station the vehicle will be collected from
    pub pickup_station_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Booking created response. `signing_token` appears exactly once, here;
/// it is never readable again.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingCreatedResponse {
    pub booking: BookingDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_token: Option<String>,
}

impl From<BookingCreated> for BookingCreatedResponse {
    fn from(created: BookingCreated) -> Self {
        Self {
            booking: BookingDto::from(created.booking),
            contract: created.contract.as_ref().map(ContractSummaryDto::from),
            signing_token: created.signing_token,
        }
    }
}

/// Fresh signing link for a booking whose previous link lapsed
#[derive(Debug, Serialize, ToSchema)]
pub struct ReissuedContractResponse {
    pub contract: ContractSummaryDto,
    pub signing_token: String,
}

/// Signature outcome: the advanced booking plus the deposit checkout
#[derive(Debug, Serialize, ToSchema)]
pub struct SignedContractResponse {
    pub booking: BookingDto,
    pub contract: ContractSummaryDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_payment: Option<PaymentDto>,
}

impl From<SignOutcome> for SignedContractResponse {
    fn from(outcome: SignOutcome) -> Self {
        Self {
            booking: BookingDto::from(outcome.booking),
            contract: ContractSummaryDto::from(&outcome.contract),
            deposit_payment: outcome.deposit_payment.map(PaymentDto::from),
        }
    }
}

/// Ask for a payment link
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OpenPaymentRequest {
    /// Deposit, Rental or Extra
    #[validate(length(min = 1, message = "payment type is required"))]
    pub payment_type: String,
}

/// Hand the vehicle over
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckInRequest {
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    /// Condition photo taken at handover
    #[validate(url(message = "photo_url must be a valid URL"))]
    pub photo_url: Option<String>,
}

/// Take the vehicle back and settle
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckOutRequest {
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    #[validate(url(message = "photo_url must be a valid URL"))]
    pub photo_url: Option<String>,
    /// Station the vehicle was returned to
    pub return_station_id: Option<Uuid>,
    /// Damage charge assessed at the counter (VND)
    #[serde(default)]
    #[validate(range(min = 0, message = "damage fee cannot be negative"))]
    pub damage_fee: i64,
}

/// Cancel a booking
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelBookingRequest {
    #[validate(length(min = 1, max = 500, message = "reason is required"))]
    pub reason: String,
}

/// Staff incident cancellation (accident, breakdown, fraud)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelIncidentRequest {
    /// Defaults to a generic incident note when omitted
    #[validate(length(min = 1, max = 500, message = "reason cannot be empty"))]
    pub reason: Option<String>,
}

/// List bookings query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListBookingsParams {
    /// Filter by status (operator listings only)
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}
