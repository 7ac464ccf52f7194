//! Booking lifecycle — drives a booking from request to settlement
//!
//! This is the saga coordinator: it owns every status transition and
//! calls down into the contract gate, the payment ledger and the gateway
//! reconciler. Transitions are conditional writes; a lost race is
//! re-read and treated as a no-op when the other writer already applied
//! the same step, and as a conflict otherwise. No lock is ever held
//! across an await.
//!
//! Side work that must not block the saga (checkout creation,
//! notifications) is attempted once and logged on failure; every such
//! step has a repair path that runs it again later.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::ports::NotifierPort;
use crate::application::services::contract_gate::ContractGateService;
use crate::application::services::gateway_reconciler::GatewayReconcilerService;
use crate::application::services::payment_ledger::PaymentLedgerService;
use crate::config::BookingConfig;
use crate::domain::{
    apply_late_grace, deposit_for, settle, Booking, BookingStatus, CheckOutRecord, Contract,
    ContractStatus, DomainError, DomainResult, Payment, PaymentType, RepositoryProvider,
    VehicleStatus,
};
use crate::shared::{PaginatedResult, PaginationParams};

/// Outcome of creating a booking. The contract can be missing when
/// issuance failed; the booking then stays Pending and issuance is
/// retried through [`BookingLifecycleService::reissue_contract`].
#[derive(Debug)]
pub struct BookingCreated {
    pub booking: Booking,
    pub contract: Option<Contract>,
    /// Raw signing token for the renter's link; never stored.
    pub signing_token: Option<String>,
}

/// Outcome of a successful signature.
#[derive(Debug)]
pub struct SignOutcome {
    pub booking: Booking,
    pub contract: Contract,
    /// Deposit payment opened by the signature, when available.
    pub deposit_payment: Option<Payment>,
}

pub struct BookingLifecycleService {
    repos: Arc<dyn RepositoryProvider>,
    contracts: Arc<ContractGateService>,
    ledger: Arc<PaymentLedgerService>,
    reconciler: Arc<GatewayReconcilerService>,
    notifier: Arc<dyn NotifierPort>,
    config: BookingConfig,
}

impl BookingLifecycleService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        contracts: Arc<ContractGateService>,
        ledger: Arc<PaymentLedgerService>,
        reconciler: Arc<GatewayReconcilerService>,
        notifier: Arc<dyn NotifierPort>,
        config: BookingConfig,
    ) -> Self {
        Self {
            repos,
            contracts,
            ledger,
            reconciler,
            notifier,
            config,
        }
    }

    // ── Creation and signature ──────────────────────────────────

    /// Create a booking for a renter, price it from the vehicle's current
    /// rates (snapshotted onto the booking) and issue the contract.
    pub async fn create_booking(
        &self,
        renter_id: &str,
        vehicle_id: Uuid,
        pickup_station_id: Option<Uuid>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> DomainResult<BookingCreated> {
        let now = Utc::now();
        if end_time <= start_time {
            return Err(DomainError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        if start_time <= now {
            return Err(DomainError::Validation(
                "Start time must be in the future".to_string(),
            ));
        }

        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Vehicle",
                field: "id",
                value: vehicle_id.to_string(),
            })?;
        if !vehicle.is_bookable() {
            return Err(DomainError::Conflict(format!(
                "Vehicle {} is not available for booking",
                vehicle.license_plate
            )));
        }

        let holding = self
            .repos
            .bookings()
            .find_overlapping(vehicle_id, start_time, end_time)
            .await?;
        if !holding.is_empty() {
            return Err(DomainError::Conflict(
                "Vehicle is already booked for this window".to_string(),
            ));
        }

        let total_amount = vehicle.rental_price(start_time, end_time);
        if total_amount <= 0 {
            return Err(DomainError::Validation(
                "Vehicle rates produce a zero price for this window".to_string(),
            ));
        }
        let deposit_amount = deposit_for(total_amount, self.config.deposit_percent);

        let mut booking = Booking::new(
            renter_id,
            vehicle_id,
            start_time,
            end_time,
            vehicle.hourly_rate,
            vehicle.daily_rate,
            total_amount,
            deposit_amount,
        );
        booking.pickup_station_id = pickup_station_id;
        self.repos.bookings().save(booking.clone()).await?;

        info!(
            booking_id = %booking.id,
            renter_id = %booking.renter_id,
            vehicle_id = %vehicle_id,
            total_amount,
            deposit_amount,
            "📅 Booking created"
        );

        // Issuance failure leaves the booking Pending; the watchdog will
        // expire it unless staff re-issues in time
        match self.contracts.issue(&booking).await {
            Ok((contract, token)) => {
                self.advance(booking.id, BookingStatus::Pending, BookingStatus::ContractPending)
                    .await?;
                let booking = self.reload(booking.id).await?;
                self.notifier
                    .contract_ready(&booking, &contract, &token)
                    .await;
                Ok(BookingCreated {
                    booking,
                    contract: Some(contract),
                    signing_token: Some(token),
                })
            }
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "Contract issuance failed");
                Ok(BookingCreated {
                    booking,
                    contract: None,
                    signing_token: None,
                })
            }
        }
    }

    /// Issue (or replace) the contract for a booking that is still before
    /// signature. Repair path for failed issuance and for expired links.
    pub async fn reissue_contract(&self, booking_id: Uuid) -> DomainResult<(Contract, String)> {
        let booking = self.reload(booking_id).await?;
        if !matches!(
            booking.status,
            BookingStatus::Pending | BookingStatus::ContractPending
        ) {
            return Err(DomainError::Conflict(format!(
                "Cannot issue a contract for a {} booking",
                booking.status
            )));
        }

        let (contract, token) = self.contracts.issue(&booking).await?;
        if booking.status == BookingStatus::Pending {
            self.advance(booking.id, BookingStatus::Pending, BookingStatus::ContractPending)
                .await?;
        }
        let booking = self.reload(booking_id).await?;
        self.notifier
            .contract_ready(&booking, &contract, &token)
            .await;
        Ok((contract, token))
    }

    /// Sign through the single-use token and open the deposit payment.
    pub async fn sign_contract(
        &self,
        token: &str,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> DomainResult<SignOutcome> {
        let contract = self.contracts.sign_with_token(token, ip, user_agent).await?;
        let booking_id = contract.booking_id;

        let flipped = self
            .repos
            .bookings()
            .cas_status(
                booking_id,
                BookingStatus::ContractPending,
                BookingStatus::ContractSigned,
            )
            .await?;
        let booking = self.reload(booking_id).await?;
        if !flipped && booking.status != BookingStatus::ContractSigned {
            // Signature landed on a booking that moved elsewhere
            // (cancelled by the watchdog in the same instant)
            return Err(DomainError::Conflict(format!(
                "Booking is {} and can no longer be signed",
                booking.status
            )));
        }

        let deposit = self
            .open_and_checkout(booking_id, PaymentType::Deposit)
            .await;

        if flipped {
            self.notifier
                .booking_status_changed(&booking, BookingStatus::ContractPending)
                .await;
        }

        Ok(SignOutcome {
            booking,
            contract,
            deposit_payment: deposit,
        })
    }

    // ── Payments ────────────────────────────────────────────────

    /// Open (or re-surface) a payment and make sure it has a live
    /// checkout. The renter-facing "give me a payment link" operation.
    pub async fn open_payment(
        &self,
        booking_id: Uuid,
        payment_type: PaymentType,
        requested_by: Option<&str>,
    ) -> DomainResult<Payment> {
        let booking = self.reload(booking_id).await?;
        self.require_owned(&booking, requested_by)?;

        if booking.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Booking is {} and takes no further payments",
                booking.status
            )));
        }
        if payment_type == PaymentType::Refund {
            return Err(DomainError::Validation(
                "Refunds are paid out by staff, not collected".to_string(),
            ));
        }

        let payment = self.ledger.open_payment(booking_id, payment_type).await?;
        match self.reconciler.ensure_checkout(payment.id).await {
            Ok(with_session) => Ok(with_session),
            Err(e) => {
                warn!(payment_id = %payment.id, error = %e, "Checkout creation failed");
                Ok(payment)
            }
        }
    }

    /// Poll the gateway for this booking's pending payments and advance
    /// the booking for every payment that came back confirmed.
    pub async fn sync_payments(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        let confirmed = self.reconciler.sync(booking_id).await?;
        for payment in &confirmed {
            if let Err(e) = self.on_payment_succeeded(payment).await {
                warn!(
                    payment_id = %payment.id,
                    order_code = payment.order_code,
                    error = %e,
                    "Could not advance booking for confirmed payment"
                );
            }
        }
        Ok(confirmed)
    }

    /// Full ledger for a booking, renter-scoped when requested by one.
    pub async fn payments_for(
        &self,
        booking_id: Uuid,
        requested_by: Option<&str>,
    ) -> DomainResult<Vec<Payment>> {
        let booking = self.reload(booking_id).await?;
        self.require_owned(&booking, requested_by)?;
        self.ledger.ledger_for(booking_id).await
    }

    /// Route a confirmed payment into the booking's next status.
    async fn on_payment_succeeded(&self, payment: &Payment) -> DomainResult<()> {
        let booking = self.reload(payment.booking_id).await?;
        self.notifier.payment_succeeded(&booking, payment).await;

        match payment.payment_type {
            PaymentType::Deposit => {
                let flipped = self
                    .repos
                    .bookings()
                    .cas_status(
                        booking.id,
                        BookingStatus::ContractSigned,
                        BookingStatus::DepositPaid,
                    )
                    .await?;
                if flipped {
                    let booking = self.reload(booking.id).await?;
                    self.notifier
                        .booking_status_changed(&booking, BookingStatus::ContractSigned)
                        .await;
                } else if booking.status == BookingStatus::ContractSigned {
                    return Err(DomainError::Conflict(
                        "Deposit confirmation lost a status race".to_string(),
                    ));
                } else if matches!(
                    booking.status,
                    BookingStatus::Cancelled | BookingStatus::RefundPending
                ) {
                    // Money arrived on a dead booking; staff pays it back
                    warn!(
                        booking_id = %booking.id,
                        status = %booking.status,
                        "Deposit confirmed on a cancelled booking, manual refund needed"
                    );
                } else {
                    debug!(booking_id = %booking.id, "Deposit already applied");
                }
            }
            PaymentType::Rental => {
                info!(
                    booking_id = %booking.id,
                    amount = payment.amount,
                    "Rental payment settled"
                );
            }
            PaymentType::Extra => {
                let flipped = self
                    .repos
                    .bookings()
                    .cas_status(
                        booking.id,
                        BookingStatus::ExtraPaymentPending,
                        BookingStatus::Completed,
                    )
                    .await?;
                if flipped {
                    let booking = self.reload(booking.id).await?;
                    info!(booking_id = %booking.id, "✅ Booking completed");
                    self.notifier
                        .booking_status_changed(&booking, BookingStatus::ExtraPaymentPending)
                        .await;
                } else {
                    debug!(booking_id = %booking.id, "Extra charge already applied");
                }
            }
            PaymentType::Refund => {
                // Refunds settle through confirm_refund, never the gateway
                debug!(booking_id = %booking.id, "Ignoring gateway event for refund row");
            }
        }
        Ok(())
    }

    // ── Handover ────────────────────────────────────────────────

    /// Hand the vehicle over. Only a paid booking inside the pickup
    /// window can check in; the rental payment is opened alongside.
    pub async fn check_in(
        &self,
        booking_id: Uuid,
        staff_id: &str,
        note: Option<String>,
        photo_url: Option<String>,
    ) -> DomainResult<Booking> {
        let booking = self.reload(booking_id).await?;
        if booking.status != BookingStatus::DepositPaid {
            return Err(DomainError::Conflict(format!(
                "Cannot check in a {} booking",
                booking.status
            )));
        }

        let now = Utc::now();
        if !booking.check_in_window_open(now, self.config.check_in_grace_minutes) {
            return Err(DomainError::Validation(format!(
                "Check-in is only allowed within {} minutes of the booked start",
                self.config.check_in_grace_minutes
            )));
        }

        let flipped = self
            .repos
            .bookings()
            .record_check_in(booking_id, now, note, photo_url)
            .await?;
        let booking = self.reload(booking_id).await?;
        if !flipped {
            if booking.status == BookingStatus::CheckedIn {
                return Ok(booking);
            }
            return Err(DomainError::Conflict(format!(
                "Cannot check in a {} booking",
                booking.status
            )));
        }

        self.repos
            .vehicles()
            .update_status(booking.vehicle_id, VehicleStatus::Rented)
            .await?;

        self.open_and_checkout(booking_id, PaymentType::Rental).await;

        info!(
            booking_id = %booking_id,
            staff_id = %staff_id,
            "🚗 Vehicle handed over"
        );
        self.notifier
            .booking_status_changed(&booking, BookingStatus::DepositPaid)
            .await;

        Ok(booking)
    }

    /// Take the vehicle back, settle charges against the deposit and
    /// route the booking to its payout or collection tail.
    ///
    /// Re-invoking on an already CheckedOut booking skips settlement and
    /// just re-runs the routing, which repairs a crash between the two
    /// writes.
    pub async fn check_out(
        &self,
        booking_id: Uuid,
        staff_id: &str,
        note: Option<String>,
        photo_url: Option<String>,
        return_station_id: Option<Uuid>,
        damage_fee: i64,
    ) -> DomainResult<Booking> {
        if damage_fee < 0 {
            return Err(DomainError::Validation(
                "Damage fee cannot be negative".to_string(),
            ));
        }

        let booking = self.reload(booking_id).await?;
        let entry_status = booking.status;
        match entry_status {
            BookingStatus::CheckedIn => {
                let now = Utc::now();
                let graced_return =
                    apply_late_grace(booking.end_time, now, self.config.late_grace_minutes);
                let settlement = settle(
                    booking.end_time,
                    graced_return,
                    booking.hourly_rate,
                    damage_fee,
                    booking.deposit_amount,
                );

                let flipped = self
                    .repos
                    .bookings()
                    .record_check_out(
                        booking_id,
                        CheckOutRecord {
                            at: now,
                            note,
                            photo_url,
                            return_station_id,
                            late_fee: settlement.late_fee,
                            damage_fee,
                            extra_amount: settlement.extra_amount,
                            refund_amount: settlement.refund_amount,
                        },
                    )
                    .await?;
                if !flipped {
                    let current = self.reload(booking_id).await?;
                    if current.status == BookingStatus::CheckedIn {
                        return Err(DomainError::Conflict(
                            "Check-out lost a status race".to_string(),
                        ));
                    }
                    // Someone else already checked out; fall through to routing
                } else {
                    info!(
                        booking_id = %booking_id,
                        staff_id = %staff_id,
                        late_hours = settlement.late_hours,
                        late_fee = settlement.late_fee,
                        damage_fee,
                        extra_amount = settlement.extra_amount,
                        refund_amount = settlement.refund_amount,
                        "🏁 Vehicle returned"
                    );
                }
            }
            BookingStatus::CheckedOut => {
                debug!(booking_id = %booking_id, "Re-running check-out routing");
            }
            other => {
                return Err(DomainError::Conflict(format!(
                    "Cannot check out a {} booking",
                    other
                )));
            }
        }

        // The vehicle is free in every post-return state; asserting it
        // again makes the repair path safe
        self.repos
            .vehicles()
            .update_status(booking.vehicle_id, VehicleStatus::Available)
            .await?;

        let booking = self.route_after_return(booking_id).await?;
        self.notifier
            .booking_status_changed(&booking, entry_status)
            .await;
        Ok(booking)
    }

    /// Move a CheckedOut booking onto its tail using the settlement
    /// amounts persisted with the return.
    async fn route_after_return(&self, booking_id: Uuid) -> DomainResult<Booking> {
        let booking = self.reload(booking_id).await?;
        if booking.status != BookingStatus::CheckedOut {
            // Already routed (repair path re-entry)
            return Ok(booking);
        }

        let next = if booking.extra_amount > 0 {
            BookingStatus::ExtraPaymentPending
        } else if booking.refund_amount > 0 {
            BookingStatus::RefundPending
        } else {
            BookingStatus::Completed
        };

        let flipped = self
            .repos
            .bookings()
            .cas_status(booking_id, BookingStatus::CheckedOut, next)
            .await?;
        let booking = self.reload(booking_id).await?;
        if !flipped && booking.status == BookingStatus::CheckedOut {
            return Err(DomainError::Conflict(
                "Check-out routing lost a status race".to_string(),
            ));
        }

        match booking.status {
            BookingStatus::ExtraPaymentPending => {
                self.open_and_checkout(booking_id, PaymentType::Extra).await;
            }
            BookingStatus::RefundPending => {
                if let Err(e) = self.ledger.open_payment(booking_id, PaymentType::Refund).await {
                    warn!(booking_id = %booking_id, error = %e, "Could not open refund row");
                }
                self.notifier.refund_due(&booking).await;
            }
            BookingStatus::Completed => {
                info!(booking_id = %booking_id, "✅ Booking completed");
            }
            _ => {}
        }

        Ok(booking)
    }

    // ── Cancellation and refunds ────────────────────────────────

    /// Cancel a booking. Renters can only cancel their own; a paid
    /// booking cancelled early enough keeps its deposit refundable and
    /// parks in RefundPending instead of dying outright.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        requested_by: Option<&str>,
        reason: &str,
    ) -> DomainResult<Booking> {
        let booking = self.reload(booking_id).await?;
        self.require_owned(&booking, requested_by)?;

        if !booking.status.is_cancellable() {
            return Err(DomainError::Conflict(format!(
                "Cannot cancel a {} booking",
                booking.status
            )));
        }

        let now = Utc::now();
        let refunds_deposit = booking.status == BookingStatus::DepositPaid
            && booking.cancel_refunds_deposit(now, self.config.cancel_refund_cutoff_hours);

        let previous = booking.status;
        let flipped = if refunds_deposit {
            self.repos
                .bookings()
                .record_cancel(
                    booking_id,
                    &[BookingStatus::DepositPaid],
                    BookingStatus::RefundPending,
                    reason,
                    booking.deposit_amount,
                )
                .await?
        } else {
            self.repos
                .bookings()
                .record_cancel(
                    booking_id,
                    &[
                        BookingStatus::Pending,
                        BookingStatus::ContractPending,
                        BookingStatus::ContractSigned,
                        BookingStatus::DepositPaid,
                    ],
                    BookingStatus::Cancelled,
                    reason,
                    0,
                )
                .await?
        };

        let booking = self.reload(booking_id).await?;
        if !flipped {
            if matches!(
                booking.status,
                BookingStatus::Cancelled | BookingStatus::RefundPending
            ) {
                return Ok(booking);
            }
            return Err(DomainError::Conflict(format!(
                "Cannot cancel a {} booking",
                booking.status
            )));
        }

        // Dead bookings keep no live checkout and no live signing link
        if let Err(e) = self.reconciler.abandon_pending(booking_id, "Booking cancelled").await {
            warn!(booking_id = %booking_id, error = %e, "Could not abandon pending payments");
        }
        self.expire_live_contract(booking_id).await;

        if refunds_deposit {
            if let Err(e) = self.ledger.open_payment(booking_id, PaymentType::Refund).await {
                warn!(booking_id = %booking_id, error = %e, "Could not open refund row");
            }
            self.notifier.refund_due(&booking).await;
        }

        info!(
            booking_id = %booking_id,
            status = %booking.status,
            reason = %reason,
            "🛑 Booking cancelled"
        );
        self.notifier.booking_status_changed(&booking, previous).await;

        Ok(booking)
    }

    /// Staff cancellation for incidents (accident, breakdown, fraud).
    /// Unlike the renter policy path this works on an in-progress rental
    /// and always hands the full deposit back when one was collected.
    pub async fn cancel_incident(
        &self,
        booking_id: Uuid,
        staff_id: &str,
        reason: &str,
    ) -> DomainResult<Booking> {
        let booking = self.reload(booking_id).await?;
        if !booking.status.holds_vehicle() {
            return Err(DomainError::Conflict(format!(
                "Cannot incident-cancel a {} booking",
                booking.status
            )));
        }

        let deposit_held = matches!(
            booking.status,
            BookingStatus::DepositPaid | BookingStatus::CheckedIn
        );
        let previous = booking.status;
        let flipped = if deposit_held {
            self.repos
                .bookings()
                .record_cancel(
                    booking_id,
                    &[BookingStatus::DepositPaid, BookingStatus::CheckedIn],
                    BookingStatus::RefundPending,
                    reason,
                    booking.deposit_amount,
                )
                .await?
        } else {
            self.repos
                .bookings()
                .record_cancel(
                    booking_id,
                    &[
                        BookingStatus::Pending,
                        BookingStatus::ContractPending,
                        BookingStatus::ContractSigned,
                    ],
                    BookingStatus::Cancelled,
                    reason,
                    0,
                )
                .await?
        };

        let booking = self.reload(booking_id).await?;
        if !flipped {
            if matches!(
                booking.status,
                BookingStatus::Cancelled | BookingStatus::RefundPending
            ) {
                return Ok(booking);
            }
            return Err(DomainError::Conflict(format!(
                "Cannot incident-cancel a {} booking",
                booking.status
            )));
        }

        if previous == BookingStatus::CheckedIn {
            // The vehicle comes back outside the normal check-out flow
            self.repos
                .vehicles()
                .update_status(booking.vehicle_id, VehicleStatus::Available)
                .await?;
        }

        if let Err(e) = self.reconciler.abandon_pending(booking_id, "Booking cancelled").await {
            warn!(booking_id = %booking_id, error = %e, "Could not abandon pending payments");
        }
        self.expire_live_contract(booking_id).await;

        if deposit_held {
            if let Err(e) = self.ledger.open_payment(booking_id, PaymentType::Refund).await {
                warn!(booking_id = %booking_id, error = %e, "Could not open refund row");
            }
            self.notifier.refund_due(&booking).await;
        }

        info!(
            booking_id = %booking_id,
            staff_id = %staff_id,
            status = %booking.status,
            reason = %reason,
            "🛑 Booking cancelled by staff incident report"
        );
        self.notifier.booking_status_changed(&booking, previous).await;

        Ok(booking)
    }

    /// Staff confirmation that the deposit was paid back. Closes the
    /// booking as Cancelled when it died by cancellation, Completed when
    /// it ran its course.
    pub async fn confirm_refund(&self, booking_id: Uuid, staff_id: &str) -> DomainResult<Booking> {
        let booking = self.reload(booking_id).await?;
        if booking.status != BookingStatus::RefundPending {
            return Err(DomainError::Conflict(format!(
                "No refund is pending on a {} booking",
                booking.status
            )));
        }

        let final_status = if booking.cancel_reason.is_some() {
            BookingStatus::Cancelled
        } else {
            BookingStatus::Completed
        };

        let now = Utc::now();
        let flipped = self
            .repos
            .bookings()
            .record_refund_confirmed(booking_id, staff_id, now, final_status)
            .await?;
        let booking = self.reload(booking_id).await?;
        if !flipped {
            if booking.status.is_terminal() {
                return Ok(booking);
            }
            return Err(DomainError::Conflict(
                "Refund confirmation lost a status race".to_string(),
            ));
        }

        self.ledger.settle_refund(booking_id, now).await?;

        info!(
            booking_id = %booking_id,
            staff_id = %staff_id,
            refund_amount = booking.refund_amount,
            final_status = %booking.status,
            "💸 Refund paid out"
        );
        self.notifier
            .booking_status_changed(&booking, BookingStatus::RefundPending)
            .await;

        Ok(booking)
    }

    // ── Watchdog sweeps ─────────────────────────────────────────

    /// Cancel bookings that never reached a signature within the TTL.
    /// Returns how many were cancelled this sweep.
    pub async fn expire_stale_pending(&self) -> DomainResult<usize> {
        let cutoff = Utc::now() - Duration::minutes(self.config.pending_ttl_minutes);
        let stale = self.repos.bookings().find_stale_pending(cutoff).await?;

        let mut cancelled = 0;
        for booking in stale {
            let flipped = match self
                .repos
                .bookings()
                .record_cancel(
                    booking.id,
                    &[BookingStatus::Pending, BookingStatus::ContractPending],
                    BookingStatus::Cancelled,
                    "Contract was not signed in time",
                    0,
                )
                .await
            {
                Ok(flipped) => flipped,
                Err(e) => {
                    warn!(booking_id = %booking.id, error = %e, "Failed to expire booking");
                    continue;
                }
            };
            if !flipped {
                continue;
            }

            self.expire_live_contract(booking.id).await;
            if let Err(e) = self
                .reconciler
                .abandon_pending(booking.id, "Booking cancelled")
                .await
            {
                warn!(booking_id = %booking.id, error = %e, "Could not abandon pending payments");
            }
            cancelled += 1;
        }

        if cancelled > 0 {
            info!(cancelled, "⏳ Expired unsigned bookings");
        }
        Ok(cancelled)
    }

    /// Cancel paid bookings whose renter never came. The deposit is
    /// forfeited: no refund row is opened.
    pub async fn cancel_no_shows(&self) -> DomainResult<usize> {
        let cutoff = Utc::now() - Duration::minutes(self.config.no_show_minutes);
        let absent = self.repos.bookings().find_no_shows(cutoff).await?;

        let mut cancelled = 0;
        for booking in absent {
            let flipped = match self
                .repos
                .bookings()
                .record_cancel(
                    booking.id,
                    &[BookingStatus::DepositPaid],
                    BookingStatus::Cancelled,
                    "Renter did not show up",
                    0,
                )
                .await
            {
                Ok(flipped) => flipped,
                Err(e) => {
                    warn!(booking_id = %booking.id, error = %e, "Failed to cancel no-show");
                    continue;
                }
            };
            if !flipped {
                continue;
            }

            if let Err(e) = self
                .reconciler
                .abandon_pending(booking.id, "Booking cancelled")
                .await
            {
                warn!(booking_id = %booking.id, error = %e, "Could not abandon pending payments");
            }
            let booking = self.reload(booking.id).await?;
            self.notifier
                .booking_status_changed(&booking, BookingStatus::DepositPaid)
                .await;
            cancelled += 1;
        }

        if cancelled > 0 {
            info!(cancelled, "⏳ Cancelled no-show bookings");
        }
        Ok(cancelled)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get_booking(
        &self,
        booking_id: Uuid,
        requested_by: Option<&str>,
    ) -> DomainResult<Booking> {
        let booking = self.reload(booking_id).await?;
        self.require_owned(&booking, requested_by)?;
        Ok(booking)
    }

    pub async fn list_bookings(
        &self,
        status: Option<BookingStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        self.repos.bookings().list(status, pagination).await
    }

    pub async fn bookings_for(
        &self,
        renter_id: &str,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        self.repos.bookings().find_by_renter(renter_id, pagination).await
    }

    // ── Internals ───────────────────────────────────────────────

    async fn reload(&self, booking_id: Uuid) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Booking",
                field: "id",
                value: booking_id.to_string(),
            })
    }

    fn require_owned(&self, booking: &Booking, requested_by: Option<&str>) -> DomainResult<()> {
        match requested_by {
            Some(renter) if booking.renter_id != renter => Err(DomainError::Forbidden(
                "This booking belongs to another renter".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn advance(
        &self,
        booking_id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<()> {
        let flipped = self
            .repos
            .bookings()
            .cas_status(booking_id, expected, next)
            .await?;
        if !flipped {
            debug!(
                booking_id = %booking_id,
                expected = %expected,
                next = %next,
                "Transition already applied elsewhere"
            );
        }
        Ok(())
    }

    /// Open a payment and attach a checkout, logging instead of failing:
    /// both are re-runnable through `open_payment`.
    async fn open_and_checkout(
        &self,
        booking_id: Uuid,
        payment_type: PaymentType,
    ) -> Option<Payment> {
        let payment = match self.ledger.open_payment(booking_id, payment_type).await {
            Ok(payment) => payment,
            Err(e) => {
                warn!(
                    booking_id = %booking_id,
                    payment_type = %payment_type,
                    error = %e,
                    "Could not open payment"
                );
                return None;
            }
        };
        match self.reconciler.ensure_checkout(payment.id).await {
            Ok(with_session) => Some(with_session),
            Err(e) => {
                warn!(payment_id = %payment.id, error = %e, "Checkout creation failed");
                Some(payment)
            }
        }
    }

    /// Expire a booking's live unsigned contract so the link dies with
    /// the booking.
    async fn expire_live_contract(&self, booking_id: Uuid) {
        match self.repos.contracts().find_by_booking(booking_id).await {
            Ok(Some(contract)) if contract.status == ContractStatus::Pending => {
                if let Err(e) = self.repos.contracts().mark_expired(contract.id).await {
                    warn!(contract_id = %contract.id, error = %e, "Failed to expire contract");
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "Failed to load contract");
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::gateway::SimulatedGateway;
    use crate::infrastructure::notify::TracingNotifier;
    use crate::infrastructure::render::TemplateRenderer;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use crate::domain::{CreateUserDto, PaymentStatus, Vehicle};

    struct World {
        svc: BookingLifecycleService,
        repos: Arc<InMemoryRepositoryProvider>,
        gateway: Arc<SimulatedGateway>,
        vehicle: Vehicle,
        /// Generated id of the seeded renter account.
        renter: String,
    }

    async fn world() -> World {
        world_with(BookingConfig::default()).await
    }

    async fn world_with(config: BookingConfig) -> World {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let gateway = Arc::new(SimulatedGateway::new());

        let ledger = Arc::new(PaymentLedgerService::new(repos.clone()));
        let contracts = Arc::new(ContractGateService::new(
            repos.clone(),
            Arc::new(TemplateRenderer::new()),
            24,
        ));
        let reconciler = Arc::new(GatewayReconcilerService::new(
            repos.clone(),
            ledger.clone(),
            gateway.clone(),
            "https://app.test/payment/return".to_string(),
            "https://app.test/payment/cancel".to_string(),
        ));
        let svc = BookingLifecycleService::new(
            repos.clone(),
            contracts,
            ledger,
            reconciler,
            Arc::new(TracingNotifier::new()),
            config,
        );

        repos
            .users()
            .create_user(CreateUserDto {
                username: "ngthanh".into(),
                email: "thanh@example.com".into(),
                role: None,
                password: "rent-a-car-2026".into(),
                full_name: Some("Nguyen Van Thanh".into()),
                phone: None,
                driver_license_no: None,
            })
            .await
            .unwrap();
        let renter = repos
            .users()
            .get_user_by_username("ngthanh")
            .await
            .unwrap()
            .unwrap()
            .id;

        let vehicle = Vehicle::new("51F-123.45", "VinFast", "VF e34", 2024, "White", 50_000, 800_000);
        World {
            svc,
            repos,
            gateway,
            vehicle,
            renter,
        }
    }

    impl World {
        async fn add_vehicle(&self) {
            self.repos.vehicles().save(self.vehicle.clone()).await.unwrap();
        }

        /// Drive a fresh booking through signature and deposit payment.
        async fn paid_booking(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Booking {
            let created = self
                .svc
                .create_booking(&self.renter, self.vehicle.id, None, start, end)
                .await
                .unwrap();
            let token = created.signing_token.unwrap();
            let signed = self.svc.sign_contract(&token, None, None).await.unwrap();
            let deposit = signed.deposit_payment.unwrap();

            self.gateway.mark_paid(deposit.order_code);
            self.svc.sync_payments(created.booking.id).await.unwrap();

            let booking = self
                .svc
                .get_booking(created.booking.id, None)
                .await
                .unwrap();
            assert_eq!(booking.status, BookingStatus::DepositPaid);
            booking
        }

        /// Insert a booking directly in a given state, bypassing the flow.
        async fn seed_booking(&self, booking: Booking) -> Booking {
            self.repos.bookings().save(booking.clone()).await.unwrap();
            booking
        }
    }

    fn in_hours(h: i64) -> DateTime<Utc> {
        Utc::now() + Duration::hours(h)
    }

    #[tokio::test]
    async fn create_prices_and_issues_contract() {
        let w = world().await;
        w.add_vehicle().await;

        let created = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();

        // 24h span -> 1 day at the daily rate, 30% deposit
        assert_eq!(created.booking.total_amount, 800_000);
        assert_eq!(created.booking.deposit_amount, 240_000);
        assert_eq!(created.booking.hourly_rate, 50_000);
        assert_eq!(created.booking.status, BookingStatus::ContractPending);
        assert!(created.contract.is_some());
        assert!(created.signing_token.is_some());
    }

    #[tokio::test]
    async fn create_rejects_bad_windows() {
        let w = world().await;
        w.add_vehicle().await;

        let backwards = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(48), in_hours(24))
            .await;
        assert!(matches!(backwards, Err(DomainError::Validation(_))));

        let in_past = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(-2), in_hours(24))
            .await;
        assert!(matches!(in_past, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_renter_account_defers_contract_issuance() {
        let w = world().await;
        w.add_vehicle().await;

        // The booking itself survives; the contract comes later via reissue
        let created = w
            .svc
            .create_booking("ghost", w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();
        assert!(created.contract.is_none());
        assert!(created.signing_token.is_none());
        assert_eq!(created.booking.status, BookingStatus::Pending);

        // Reissue keeps failing until the account problem is fixed
        let reissue = w.svc.reissue_contract(created.booking.id).await;
        assert!(matches!(reissue, Err(DomainError::NotFound { .. })));
        let booking = w.svc.get_booking(created.booking.id, None).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn overlapping_booking_is_rejected() {
        let w = world().await;
        w.add_vehicle().await;

        w.svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();

        let overlap = w
            .svc
            .create_booking("renter-2", w.vehicle.id, None, in_hours(36), in_hours(60))
            .await;
        assert!(matches!(overlap, Err(DomainError::Conflict(_))));

        // Adjacent windows touch but do not overlap
        let adjacent = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(48), in_hours(72))
            .await;
        assert!(adjacent.is_ok());
    }

    #[tokio::test]
    async fn signature_opens_deposit_payment() {
        let w = world().await;
        w.add_vehicle().await;

        let created = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();
        let token = created.signing_token.unwrap();

        let signed = w.svc.sign_contract(&token, Some("10.0.0.1".into()), None).await.unwrap();
        assert_eq!(signed.booking.status, BookingStatus::ContractSigned);

        let deposit = signed.deposit_payment.unwrap();
        assert_eq!(deposit.payment_type, PaymentType::Deposit);
        assert_eq!(deposit.amount, 240_000);
        assert!(deposit.checkout_url.is_some());
    }

    #[tokio::test]
    async fn deposit_confirmation_advances_booking() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w.paid_booking(in_hours(24), in_hours(48)).await;
        assert_eq!(booking.status, BookingStatus::DepositPaid);
    }

    #[tokio::test]
    async fn check_in_requires_the_window() {
        let w = world().await;
        w.add_vehicle().await;
        // Start 24h away: the +-60min window is firmly closed
        let booking = w.paid_booking(in_hours(24), in_hours(48)).await;

        let early = w.svc.check_in(booking.id, "staff-1", None, None).await;
        assert!(matches!(early, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn check_in_hands_the_vehicle_over() {
        let w = world().await;
        w.add_vehicle().await;
        // Start in 30min: inside the 60min pickup window
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;

        let checked_in = w
            .svc
            .check_in(
                booking.id,
                "staff-1",
                Some("tank full".into()),
                Some("https://cdn.rentra.test/handover/51f12345.jpg".into()),
            )
            .await
            .unwrap();
        assert_eq!(checked_in.status, BookingStatus::CheckedIn);
        assert!(checked_in.actual_check_in_at.is_some());
        assert_eq!(checked_in.check_in_note.as_deref(), Some("tank full"));
        assert!(checked_in.check_in_photo_url.is_some());

        let vehicle = w.repos.vehicles().find_by_id(w.vehicle.id).await.unwrap().unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Rented);

        // Rental payment opened alongside
        let ledger = w.svc.payments_for(booking.id, None).await.unwrap();
        assert!(ledger
            .iter()
            .any(|p| p.payment_type == PaymentType::Rental && p.amount == booking.total_amount));
    }

    #[tokio::test]
    async fn on_time_return_refunds_the_deposit() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;
        w.svc.check_in(booking.id, "staff-1", None, None).await.unwrap();

        let returned = w
            .svc
            .check_out(booking.id, "staff-1", None, None, None, 0)
            .await
            .unwrap();

        // Early return, no damage: full deposit back
        assert_eq!(returned.status, BookingStatus::RefundPending);
        assert_eq!(returned.late_fee, 0);
        assert_eq!(returned.refund_amount, booking.deposit_amount);

        let vehicle = w.repos.vehicles().find_by_id(w.vehicle.id).await.unwrap().unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);

        // Refund row open for the stamped amount, no checkout attached
        let ledger = w.svc.payments_for(booking.id, None).await.unwrap();
        let refund = ledger
            .iter()
            .find(|p| p.payment_type == PaymentType::Refund)
            .unwrap();
        assert_eq!(refund.amount, booking.deposit_amount);
        assert_eq!(refund.status, PaymentStatus::Pending);
        assert!(refund.checkout_url.is_none());
    }

    #[tokio::test]
    async fn stations_travel_with_the_booking() {
        let w = world().await;
        w.add_vehicle().await;

        let pickup = Uuid::new_v4();
        let created = w
            .svc
            .create_booking(
                &w.renter,
                w.vehicle.id,
                Some(pickup),
                in_hours(24),
                in_hours(48),
            )
            .await
            .unwrap();
        assert_eq!(created.booking.pickup_station_id, Some(pickup));
        assert!(created.booking.return_station_id.is_none());
    }

    #[tokio::test]
    async fn return_station_is_recorded_at_check_out() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;
        w.svc.check_in(booking.id, "staff-1", None, None).await.unwrap();

        let station = Uuid::new_v4();
        let returned = w
            .svc
            .check_out(booking.id, "staff-1", None, None, Some(station), 0)
            .await
            .unwrap();
        assert_eq!(returned.return_station_id, Some(station));
    }

    #[tokio::test]
    async fn late_return_bills_the_overdue_hours() {
        let w = world().await;
        w.add_vehicle().await;

        // CheckedIn booking whose window ended almost 3h ago
        let mut booking = Booking::new(
            w.renter.as_str(),
            w.vehicle.id,
            Utc::now() - Duration::hours(27),
            Utc::now() - Duration::hours(3) + Duration::seconds(30),
            50_000,
            800_000,
            800_000,
            100_000,
        );
        booking.status = BookingStatus::CheckedIn;
        let booking = w.seed_booking(booking).await;

        let returned = w
            .svc
            .check_out(booking.id, "staff-1", None, None, None, 0)
            .await
            .unwrap();

        // 3 late hours at the snapshotted hourly rate, netted against
        // the 100k deposit
        assert_eq!(returned.late_fee, 150_000);
        assert_eq!(returned.extra_amount, 50_000);
        assert_eq!(returned.refund_amount, 0);
        assert_eq!(returned.status, BookingStatus::ExtraPaymentPending);

        // Extra charge collects only what the deposit did not cover
        let ledger = w.svc.payments_for(booking.id, None).await.unwrap();
        let extra = ledger
            .iter()
            .find(|p| p.payment_type == PaymentType::Extra)
            .unwrap();
        assert_eq!(extra.amount, 50_000);

        // Paying the extra completes the booking
        w.gateway.mark_paid(extra.order_code);
        w.svc.sync_payments(booking.id).await.unwrap();
        let done = w.svc.get_booking(booking.id, None).await.unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn grace_window_forgives_small_delays() {
        let w = world().await;
        w.add_vehicle().await;

        let mut booking = Booking::new(
            w.renter.as_str(),
            w.vehicle.id,
            Utc::now() - Duration::hours(24),
            Utc::now() - Duration::minutes(10),
            50_000,
            800_000,
            800_000,
            240_000,
        );
        booking.status = BookingStatus::CheckedIn;
        let booking = w.seed_booking(booking).await;

        let returned = w
            .svc
            .check_out(booking.id, "staff-1", None, None, None, 0)
            .await
            .unwrap();

        // 10 minutes late, 30 minute grace: no late fee at all
        assert_eq!(returned.late_fee, 0);
        assert_eq!(returned.refund_amount, 240_000);
        assert_eq!(returned.status, BookingStatus::RefundPending);
    }

    #[tokio::test]
    async fn exact_deposit_match_completes_without_tail() {
        let w = world().await;
        w.add_vehicle().await;

        // Damage exactly eats the deposit: nothing owed either way
        let mut booking = Booking::new(
            w.renter.as_str(),
            w.vehicle.id,
            Utc::now() - Duration::hours(24),
            Utc::now() + Duration::hours(1),
            50_000,
            800_000,
            800_000,
            100_000,
        );
        booking.status = BookingStatus::CheckedIn;
        let booking = w.seed_booking(booking).await;

        let returned = w
            .svc
            .check_out(booking.id, "staff-1", None, None, None, 100_000)
            .await
            .unwrap();
        assert_eq!(returned.extra_amount, 0);
        assert_eq!(returned.refund_amount, 0);
        assert_eq!(returned.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn confirm_refund_closes_the_booking() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;
        w.svc.check_in(booking.id, "staff-1", None, None).await.unwrap();
        w.svc
            .check_out(booking.id, "staff-1", None, None, None, 0)
            .await
            .unwrap();

        let closed = w.svc.confirm_refund(booking.id, "staff-2").await.unwrap();
        assert_eq!(closed.status, BookingStatus::Completed);
        assert_eq!(closed.refund_confirmed_by.as_deref(), Some("staff-2"));

        // The refund row settled with the confirmation
        let ledger = w.svc.payments_for(booking.id, None).await.unwrap();
        let refund = ledger
            .iter()
            .find(|p| p.payment_type == PaymentType::Refund)
            .unwrap();
        assert_eq!(refund.status, PaymentStatus::Success);

        // Second confirmation is a no-op
        let again = w.svc.confirm_refund(booking.id, "staff-3").await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn early_cancel_refunds_the_deposit() {
        let w = world().await;
        w.add_vehicle().await;
        // Start 48h out: well before the 24h cutoff
        let booking = w.paid_booking(in_hours(48), in_hours(72)).await;

        let cancelled = w
            .svc
            .cancel(booking.id, Some(w.renter.as_str()), "Change of plans")
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::RefundPending);
        assert_eq!(cancelled.refund_amount, booking.deposit_amount);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("Change of plans"));

        // Cancelled by cancellation: refund confirmation ends in Cancelled
        let closed = w.svc.confirm_refund(booking.id, "staff-1").await.unwrap();
        assert_eq!(closed.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn late_cancel_forfeits_the_deposit() {
        let w = world().await;
        w.add_vehicle().await;
        // Start only 2h out: inside the 24h cutoff
        let booking = w.paid_booking(in_hours(2), in_hours(26)).await;

        let cancelled = w
            .svc
            .cancel(booking.id, Some(w.renter.as_str()), "Too late")
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.refund_amount, 0);
    }

    #[tokio::test]
    async fn cancel_enforces_ownership() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w.paid_booking(in_hours(48), in_hours(72)).await;

        let stranger = w.svc.cancel(booking.id, Some("renter-2"), "mine now").await;
        assert!(matches!(stranger, Err(DomainError::Forbidden(_))));

        // Staff (no renter scope) can always cancel
        let by_staff = w.svc.cancel(booking.id, None, "Fleet recall").await;
        assert!(by_staff.is_ok());
    }

    #[tokio::test]
    async fn cancel_kills_pending_checkout_and_link() {
        let w = world().await;
        w.add_vehicle().await;

        let created = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();
        let token = created.signing_token.unwrap();
        let signed = w.svc.sign_contract(&token, None, None).await.unwrap();
        let deposit = signed.deposit_payment.unwrap();

        w.svc
            .cancel(created.booking.id, Some(w.renter.as_str()), "No longer needed")
            .await
            .unwrap();

        let ledger = w.svc.payments_for(created.booking.id, None).await.unwrap();
        assert_eq!(ledger[0].status, PaymentStatus::Failed);
        assert_eq!(w.gateway.status_of(deposit.order_code).as_deref(), Some("CANCELLED"));
    }

    #[tokio::test]
    async fn checked_in_booking_cannot_be_cancelled() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;
        w.svc.check_in(booking.id, "staff-1", None, None).await.unwrap();

        let result = w.svc.cancel(booking.id, None, "nope").await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn incident_cancel_recovers_a_rented_vehicle() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;
        w.svc.check_in(booking.id, "staff-1", None, None).await.unwrap();

        let cancelled = w
            .svc
            .cancel_incident(booking.id, "staff-1", "Engine failure on day one")
            .await
            .unwrap();

        // Mid-rental incident: full deposit back, no cutoff policy
        assert_eq!(cancelled.status, BookingStatus::RefundPending);
        assert_eq!(cancelled.refund_amount, booking.deposit_amount);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("Engine failure on day one"));

        let vehicle = w.repos.vehicles().find_by_id(w.vehicle.id).await.unwrap().unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);

        let ledger = w.svc.payments_for(booking.id, None).await.unwrap();
        assert!(ledger
            .iter()
            .any(|p| p.payment_type == PaymentType::Refund && p.amount == booking.deposit_amount));

        let closed = w.svc.confirm_refund(booking.id, "staff-2").await.unwrap();
        assert_eq!(closed.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn incident_cancel_before_deposit_skips_the_refund() {
        let w = world().await;
        w.add_vehicle().await;

        let created = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();

        let cancelled = w
            .svc
            .cancel_incident(created.booking.id, "staff-1", "Vehicle recalled")
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.refund_amount, 0);

        // Nothing was paid: no refund row, and the signing link is dead
        let ledger = w.svc.payments_for(created.booking.id, None).await.unwrap();
        assert!(ledger.iter().all(|p| p.payment_type != PaymentType::Refund));
        let token = created.signing_token.unwrap();
        assert!(w.svc.sign_contract(&token, None, None).await.is_err());
    }

    #[tokio::test]
    async fn incident_cancel_rejects_returned_bookings() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w
            .paid_booking(Utc::now() + Duration::minutes(30), in_hours(48))
            .await;
        w.svc.check_in(booking.id, "staff-1", None, None).await.unwrap();
        w.svc
            .check_out(booking.id, "staff-1", None, None, None, 0)
            .await
            .unwrap();

        let result = w.svc.cancel_incident(booking.id, "staff-1", "too late").await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn watchdog_expires_unsigned_bookings() {
        let w = world().await;
        w.add_vehicle().await;

        let created = w
            .svc
            .create_booking(&w.renter, w.vehicle.id, None, in_hours(24), in_hours(48))
            .await
            .unwrap();

        // Fresh booking: nothing to expire yet
        assert_eq!(w.svc.expire_stale_pending().await.unwrap(), 0);

        // Age the booking past the TTL
        let mut aged = w.svc.get_booking(created.booking.id, None).await.unwrap();
        aged.created_at = Utc::now() - Duration::hours(2);
        w.seed_booking(aged).await;

        assert_eq!(w.svc.expire_stale_pending().await.unwrap(), 1);

        let booking = w.svc.get_booking(created.booking.id, None).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        // The signing link died with the booking
        let token = created.signing_token.unwrap();
        let sign = w.svc.sign_contract(&token, None, None).await;
        assert!(sign.is_err());
    }

    #[tokio::test]
    async fn watchdog_cancels_no_shows_and_keeps_deposit() {
        let w = world().await;
        w.add_vehicle().await;

        let mut booking = Booking::new(
            w.renter.as_str(),
            w.vehicle.id,
            Utc::now() - Duration::hours(2),
            in_hours(24),
            50_000,
            800_000,
            800_000,
            240_000,
        );
        booking.status = BookingStatus::DepositPaid;
        let booking = w.seed_booking(booking).await;

        assert_eq!(w.svc.cancel_no_shows().await.unwrap(), 1);

        let cancelled = w.svc.get_booking(booking.id, None).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.refund_amount, 0);

        // No refund row: the deposit is forfeit
        let ledger = w.svc.payments_for(booking.id, None).await.unwrap();
        assert!(ledger.iter().all(|p| p.payment_type != PaymentType::Refund));
    }

    #[tokio::test]
    async fn renter_queries_are_scoped() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w.paid_booking(in_hours(24), in_hours(48)).await;

        let denied = w.svc.get_booking(booking.id, Some("renter-2")).await;
        assert!(matches!(denied, Err(DomainError::Forbidden(_))));

        let denied = w.svc.payments_for(booking.id, Some("renter-2")).await;
        assert!(matches!(denied, Err(DomainError::Forbidden(_))));

        assert!(w.svc.get_booking(booking.id, Some(w.renter.as_str())).await.is_ok());
    }

    #[tokio::test]
    async fn open_payment_rejects_refund_collection() {
        let w = world().await;
        w.add_vehicle().await;
        let booking = w.paid_booking(in_hours(24), in_hours(48)).await;

        let result = w
            .svc
            .open_payment(booking.id, PaymentType::Refund, None)
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
