//! In-memory repositories for development and testing
//!
//! Mirrors the SQL semantics of the database-backed repositories,
//! including the conditional status writes: every `mark_*` / `record_*`
//! mutation checks the expected state under the entry lock and reports
//! whether it actually flipped, exactly like `UPDATE .. WHERE status = ?`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    windows_overlap, Booking, BookingRepository, BookingStatus, CheckOutRecord, Contract,
    ContractRepository, ContractStatus, CreateUserDto, DomainError, DomainResult, GetUserDto,
    Payment, PaymentRepository, PaymentStatus, PaymentType, RepositoryProvider, SignatureRecord,
    UpdateUserDto, User, UserRepositoryInterface, Vehicle, VehicleRepository, VehicleStatus,
};
use crate::infrastructure::crypto::password::hash_password;
use crate::shared::{PaginatedResult, PaginationParams};

fn paginate<T>(mut items: Vec<T>, pagination: PaginationParams) -> PaginatedResult<T> {
    let total = items.len() as u64;
    let limit = pagination.limit.max(1);
    let start = ((pagination.page.max(1) - 1) * limit) as usize;
    let page: Vec<T> = if start >= items.len() {
        Vec::new()
    } else {
        items.drain(start..).take(limit as usize).collect()
    };
    PaginatedResult::new(page, total, pagination.page, limit)
}

// ── Bookings ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: DashMap<Uuid, Booking>,
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn save(&self, booking: Booking) -> DomainResult<()> {
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn find_by_renter(
        &self,
        renter_id: &str,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let mut items: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.renter_id == renter_id)
            .map(|b| b.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, pagination))
    }

    async fn list(
        &self,
        status: Option<BookingStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let mut items: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .map(|b| b.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, pagination))
    }

    async fn cas_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DomainResult<bool> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            if booking.status == expected {
                booking.status = next;
                booking.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn record_check_in(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        note: Option<String>,
        photo_url: Option<String>,
    ) -> DomainResult<bool> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            if booking.status == BookingStatus::DepositPaid {
                booking.status = BookingStatus::CheckedIn;
                booking.actual_check_in_at = Some(at);
                booking.check_in_note = note;
                booking.check_in_photo_url = photo_url;
                booking.updated_at = at;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn record_check_out(&self, id: Uuid, record: CheckOutRecord) -> DomainResult<bool> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            if booking.status == BookingStatus::CheckedIn {
                booking.status = BookingStatus::CheckedOut;
                booking.actual_check_out_at = Some(record.at);
                booking.check_out_note = record.note;
                booking.check_out_photo_url = record.photo_url;
                booking.return_station_id = record.return_station_id;
                booking.late_fee = record.late_fee;
                booking.damage_fee = record.damage_fee;
                booking.extra_amount = record.extra_amount;
                booking.refund_amount = record.refund_amount;
                booking.updated_at = record.at;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn record_cancel(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        next: BookingStatus,
        reason: &str,
        refund_amount: i64,
    ) -> DomainResult<bool> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            if expected.contains(&booking.status) {
                booking.status = next;
                booking.cancel_reason = Some(reason.to_string());
                booking.refund_amount = refund_amount;
                booking.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn record_refund_confirmed(
        &self,
        id: Uuid,
        staff_id: &str,
        at: DateTime<Utc>,
        final_status: BookingStatus,
    ) -> DomainResult<bool> {
        if let Some(mut booking) = self.bookings.get_mut(&id) {
            if booking.status == BookingStatus::RefundPending {
                booking.status = final_status;
                booking.refund_confirmed_by = Some(staff_id.to_string());
                booking.refund_confirmed_at = Some(at);
                booking.updated_at = at;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn find_overlapping(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                b.vehicle_id == vehicle_id
                    && b.status.holds_vehicle()
                    && windows_overlap(b.start_time, b.end_time, start, end)
            })
            .map(|b| b.clone())
            .collect())
    }

    async fn find_stale_pending(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                matches!(
                    b.status,
                    BookingStatus::Pending | BookingStatus::ContractPending
                ) && b.created_at < cutoff
            })
            .map(|b| b.clone())
            .collect())
    }

    async fn find_no_shows(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::DepositPaid && b.start_time < cutoff)
            .map(|b| b.clone())
            .collect())
    }
}

// ── Contracts ───────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryContractRepository {
    contracts: DashMap<Uuid, Contract>,
}

#[async_trait]
impl ContractRepository for InMemoryContractRepository {
    async fn save(&self, contract: Contract) -> DomainResult<()> {
        self.contracts.insert(contract.id, contract);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Contract>> {
        Ok(self
            .contracts
            .get(&id)
            .filter(|c| !c.is_deleted())
            .map(|c| c.clone()))
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Contract>> {
        Ok(self
            .contracts
            .iter()
            .filter(|c| c.booking_id == booking_id && !c.is_deleted())
            .max_by_key(|c| c.created_at)
            .map(|c| c.clone()))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> DomainResult<Option<Contract>> {
        Ok(self
            .contracts
            .iter()
            .find(|c| !c.is_deleted() && c.token_hash.as_deref() == Some(token_hash))
            .map(|c| c.clone()))
    }

    async fn mark_signed(&self, id: Uuid, signature: SignatureRecord) -> DomainResult<bool> {
        if let Some(mut contract) = self.contracts.get_mut(&id) {
            if !contract.is_deleted() && contract.status == ContractStatus::Pending {
                contract.status = ContractStatus::Signed;
                contract.signed_at = Some(signature.at);
                contract.signed_ip = signature.ip;
                contract.signed_user_agent = signature.user_agent;
                contract.token_hash = None;
                contract.updated_at = signature.at;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_expired(&self, id: Uuid) -> DomainResult<bool> {
        if let Some(mut contract) = self.contracts.get_mut(&id) {
            if !contract.is_deleted() && contract.status == ContractStatus::Pending {
                contract.status = ContractStatus::Expired;
                contract.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn soft_delete(&self, id: Uuid) -> DomainResult<bool> {
        if let Some(mut contract) = self.contracts.get_mut(&id) {
            if !contract.is_deleted() {
                contract.deleted_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Contract>> {
        Ok(self
            .contracts
            .iter()
            .filter(|c| {
                !c.is_deleted() && c.status == ContractStatus::Pending && c.token_expires_at < now
            })
            .map(|c| c.clone())
            .collect())
    }

    async fn count_for_year(&self, year: i32) -> DomainResult<u64> {
        // Soft-deleted rows keep their number, so they still count
        Ok(self
            .contracts
            .iter()
            .filter(|c| c.created_at.year() == year)
            .count() as u64)
    }
}

// ── Payments ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: DashMap<Uuid, Payment>,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: Payment) -> DomainResult<()> {
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Payment>> {
        Ok(self.payments.get(&id).map(|p| p.clone()))
    }

    async fn find_by_order_code(&self, order_code: i64) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.order_code == order_code)
            .map(|p| p.clone()))
    }

    async fn find_open(
        &self,
        booking_id: Uuid,
        payment_type: PaymentType,
    ) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.booking_id == booking_id && p.payment_type == payment_type && p.is_open())
            .map(|p| p.clone()))
    }

    async fn find_pending_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        let mut items: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id && p.status == PaymentStatus::Pending)
            .map(|p| p.clone())
            .collect();
        items.sort_by_key(|p| p.created_at);
        Ok(items)
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> DomainResult<Vec<Payment>> {
        let mut items: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .map(|p| p.clone())
            .collect();
        items.sort_by_key(|p| p.created_at);
        Ok(items)
    }

    async fn order_code_taken(&self, order_code: i64) -> DomainResult<bool> {
        Ok(self.payments.iter().any(|p| p.order_code == order_code))
    }

    async fn mark_success(
        &self,
        order_code: i64,
        paid_at: DateTime<Utc>,
        transaction_ref: Option<&str>,
    ) -> DomainResult<bool> {
        for mut payment in self.payments.iter_mut() {
            if payment.order_code == order_code {
                if payment.status == PaymentStatus::Pending {
                    payment.status = PaymentStatus::Success;
                    payment.paid_at = Some(paid_at);
                    payment.transaction_id = transaction_ref.map(str::to_string);
                    payment.updated_at = paid_at;
                    return Ok(true);
                }
                return Ok(false);
            }
        }
        Ok(false)
    }

    async fn mark_failed(&self, order_code: i64, reason: &str) -> DomainResult<bool> {
        for mut payment in self.payments.iter_mut() {
            if payment.order_code == order_code {
                if payment.status == PaymentStatus::Pending {
                    payment.status = PaymentStatus::Failed;
                    payment.failure_reason = Some(reason.to_string());
                    payment.updated_at = Utc::now();
                    return Ok(true);
                }
                return Ok(false);
            }
        }
        Ok(false)
    }

    async fn set_gateway_artifacts(
        &self,
        id: Uuid,
        checkout_url: &str,
        qr_code: &str,
    ) -> DomainResult<()> {
        let mut payment = self.payments.get_mut(&id).ok_or(DomainError::NotFound {
            entity: "Payment",
            field: "id",
            value: id.to_string(),
        })?;
        payment.checkout_url = Some(checkout_url.to_string());
        payment.qr_code = Some(qr_code.to_string());
        payment.updated_at = Utc::now();
        Ok(())
    }
}

// ── Vehicles ────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: DashMap<Uuid, Vehicle>,
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn save(&self, vehicle: Vehicle) -> DomainResult<()> {
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Vehicle>> {
        Ok(self.vehicles.get(&id).map(|v| v.clone()))
    }

    async fn find_by_license_plate(&self, plate: &str) -> DomainResult<Option<Vehicle>> {
        Ok(self
            .vehicles
            .iter()
            .find(|v| v.license_plate == plate)
            .map(|v| v.clone()))
    }

    async fn list(
        &self,
        status: Option<VehicleStatus>,
        pagination: PaginationParams,
    ) -> DomainResult<PaginatedResult<Vehicle>> {
        let mut items: Vec<Vehicle> = self
            .vehicles
            .iter()
            .filter(|v| status.map_or(true, |s| v.status == s))
            .map(|v| v.clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, pagination))
    }

    async fn update(&self, vehicle: Vehicle) -> DomainResult<()> {
        if !self.vehicles.contains_key(&vehicle.id) {
            return Err(DomainError::NotFound {
                entity: "Vehicle",
                field: "id",
                value: vehicle.id.to_string(),
            });
        }
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: VehicleStatus) -> DomainResult<()> {
        let mut vehicle = self.vehicles.get_mut(&id).ok_or(DomainError::NotFound {
            entity: "Vehicle",
            field: "id",
            value: id.to_string(),
        })?;
        vehicle.status = status;
        vehicle.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        self.vehicles.remove(&id).ok_or(DomainError::NotFound {
            entity: "Vehicle",
            field: "id",
            value: id.to_string(),
        })?;
        Ok(())
    }
}

// ── Users ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

#[async_trait]
impl UserRepositoryInterface for InMemoryUserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<()> {
        let taken = self
            .users
            .iter()
            .any(|u| u.username == dto.username || u.email == dto.email);
        if taken {
            return Err(DomainError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&dto.password)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: dto.username,
            email: dto.email,
            password_hash,
            role: dto.role.unwrap_or_default(),
            full_name: dto.full_name,
            phone: dto.phone,
            driver_license_no: dto.driver_license_no,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let page = dto.page.unwrap_or(1).max(1);
        let page_size = dto.page_size.unwrap_or(20).clamp(1, 100);

        let mut items: Vec<User> = self
            .users
            .iter()
            .filter(|u| {
                dto.search.as_deref().map_or(true, |s| {
                    u.username.contains(s) || u.email.contains(s)
                }) && dto.role.map_or(true, |r| u.role == r)
            })
            .map(|u| u.clone())
            .collect();

        match dto.sort_by.as_deref() {
            Some("username") => items.sort_by(|a, b| a.username.cmp(&b.username)),
            Some("email") => items.sort_by(|a, b| a.email.cmp(&b.email)),
            Some("role") => items.sort_by(|a, b| a.role.as_str().cmp(b.role.as_str())),
            _ => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        Ok(paginate(
            items,
            PaginationParams {
                page,
                limit: page_size,
            },
        ))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        // Uniqueness scans happen before taking the entry lock
        if let Some(ref username) = dto.username {
            if self.users.iter().any(|u| u.id != id && u.username == *username) {
                return Err(DomainError::Conflict(
                    "Username or email already exists".to_string(),
                ));
            }
        }
        if let Some(ref email) = dto.email {
            if self.users.iter().any(|u| u.id != id && u.email == *email) {
                return Err(DomainError::Conflict(
                    "Username or email already exists".to_string(),
                ));
            }
        }

        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };

        if let Some(username) = dto.username {
            user.username = username;
        }
        if let Some(email) = dto.email {
            user.email = email;
        }
        if let Some(role) = dto.role {
            user.role = role;
        }
        if let Some(is_active) = dto.is_active {
            user.is_active = is_active;
        }
        if let Some(full_name) = dto.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(phone) = dto.phone {
            user.phone = Some(phone);
        }
        if let Some(driver_license_no) = dto.driver_license_no {
            user.driver_license_no = Some(driver_license_no);
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn update_user_password(&self, id: &str, new_password_hash: &str) -> DomainResult<()> {
        let mut user = self.users.get_mut(id).ok_or(DomainError::NotFound {
            entity: "User",
            field: "id",
            value: id.to_string(),
        })?;
        user.password_hash = new_password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_last_login(&self, id: &str) -> DomainResult<()> {
        let mut user = self.users.get_mut(id).ok_or(DomainError::NotFound {
            entity: "User",
            field: "id",
            value: id.to_string(),
        })?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        self.users.remove(id).ok_or(DomainError::NotFound {
            entity: "User",
            field: "id",
            value: id.to_string(),
        })?;
        Ok(())
    }
}

// ── Provider ────────────────────────────────────────────────────

/// In-memory [`RepositoryProvider`] for development and testing.
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    bookings: InMemoryBookingRepository,
    contracts: InMemoryContractRepository,
    payments: InMemoryPaymentRepository,
    vehicles: InMemoryVehicleRepository,
    users: InMemoryUserRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn contracts(&self) -> &dyn ContractRepository {
        &self.contracts
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn users(&self) -> &dyn UserRepositoryInterface {
        &self.users
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContractDraft;
    use chrono::Duration;

    fn sample_booking(status: BookingStatus) -> Booking {
        let start = Utc::now() + Duration::days(1);
        let mut booking = Booking::new(
            "renter-1",
            Uuid::new_v4(),
            start,
            start + Duration::days(1),
            50_000,
            800_000,
            800_000,
            240_000,
        );
        booking.status = status;
        booking
    }

    #[tokio::test]
    async fn cas_only_flips_from_expected() {
        let repo = InMemoryBookingRepository::default();
        let booking = sample_booking(BookingStatus::Pending);
        repo.save(booking.clone()).await.unwrap();

        let moved = repo
            .cas_status(
                booking.id,
                BookingStatus::ContractPending,
                BookingStatus::ContractSigned,
            )
            .await
            .unwrap();
        assert!(!moved);

        let moved = repo
            .cas_status(
                booking.id,
                BookingStatus::Pending,
                BookingStatus::ContractPending,
            )
            .await
            .unwrap();
        assert!(moved);

        let current = repo.find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(current.status, BookingStatus::ContractPending);
    }

    #[tokio::test]
    async fn overlap_ignores_released_bookings() {
        let repo = InMemoryBookingRepository::default();
        let held = sample_booking(BookingStatus::DepositPaid);
        let mut released = sample_booking(BookingStatus::Cancelled);
        released.vehicle_id = held.vehicle_id;
        repo.save(held.clone()).await.unwrap();
        repo.save(released).await.unwrap();

        let hits = repo
            .find_overlapping(held.vehicle_id, held.start_time, held.end_time)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, held.id);
    }

    #[tokio::test]
    async fn soft_deleted_contract_disappears_from_lookups() {
        let repo = InMemoryContractRepository::default();
        let booking_id = Uuid::new_v4();
        let contract = Contract::new(ContractDraft {
            booking_id,
            contract_number: "HD-2026-000001".to_string(),
            renter_name: "Nguyen Van Thanh".to_string(),
            vehicle_plate: "51F-123.45".to_string(),
            content: "content".to_string(),
            content_hash: "hash".to_string(),
            token_hash: "token-digest".to_string(),
            token_expires_at: Utc::now() + Duration::hours(24),
        });
        repo.save(contract.clone()).await.unwrap();

        assert!(repo.soft_delete(contract.id).await.unwrap());
        assert!(!repo.soft_delete(contract.id).await.unwrap());

        assert!(repo.find_by_id(contract.id).await.unwrap().is_none());
        assert!(repo.find_by_booking(booking_id).await.unwrap().is_none());
        assert!(repo
            .find_by_token_hash("token-digest")
            .await
            .unwrap()
            .is_none());

        // The number stays burned for this year
        assert_eq!(
            repo.count_for_year(contract.created_at.year()).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn payment_success_is_sticky() {
        let repo = InMemoryPaymentRepository::default();
        let payment = Payment::new(Uuid::new_v4(), PaymentType::Deposit, 240_000, 42);
        repo.save(payment.clone()).await.unwrap();

        assert!(repo.mark_success(42, Utc::now(), Some("FT2606000042")).await.unwrap());
        assert!(!repo.mark_success(42, Utc::now(), None).await.unwrap());
        assert!(!repo.mark_failed(42, "late cancel").await.unwrap());

        let current = repo.find_by_order_code(42).await.unwrap().unwrap();
        assert_eq!(current.status, PaymentStatus::Success);
        assert_eq!(current.transaction_id.as_deref(), Some("FT2606000042"));
        assert!(current.failure_reason.is_none());
    }

    #[tokio::test]
    async fn pagination_slices_and_counts() {
        let repo = InMemoryBookingRepository::default();
        for _ in 0..5 {
            repo.save(sample_booking(BookingStatus::Pending)).await.unwrap();
        }

        let page = repo
            .list(None, PaginationParams { page: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 3);

        let filtered = repo
            .list(
                Some(BookingStatus::Cancelled),
                PaginationParams { page: 1, limit: 10 },
            )
            .await
            .unwrap();
        assert_eq!(filtered.total, 0);
    }

    fn user_dto(username: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.to_string(),
            email: email.to_string(),
            role: None,
            password: "correct-horse-battery".to_string(),
            full_name: None,
            phone: None,
            driver_license_no: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let repo = InMemoryUserRepository::default();
        repo.create_user(user_dto("thanh", "thanh@example.com"))
            .await
            .unwrap();

        let same_name = repo
            .create_user(user_dto("thanh", "other@example.com"))
            .await;
        assert!(matches!(same_name, Err(DomainError::Conflict(_))));

        let same_email = repo
            .create_user(user_dto("other", "thanh@example.com"))
            .await;
        assert!(matches!(same_email, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_missing_user_returns_none() {
        let repo = InMemoryUserRepository::default();
        let updated = repo
            .update_user("nope", UpdateUserDto::default())
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn update_fills_profile_fields() {
        let repo = InMemoryUserRepository::default();
        repo.create_user(user_dto("thanh", "thanh@example.com"))
            .await
            .unwrap();
        let id = repo
            .get_user_by_username("thanh")
            .await
            .unwrap()
            .unwrap()
            .id;

        let updated = repo
            .update_user(
                &id,
                UpdateUserDto {
                    full_name: Some("Nguyen Van Thanh".to_string()),
                    driver_license_no: Some("B2-123456".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.full_name.as_deref(), Some("Nguyen Van Thanh"));
        assert_eq!(updated.driver_license_no.as_deref(), Some("B2-123456"));
        assert_eq!(updated.username, "thanh");
    }
}
