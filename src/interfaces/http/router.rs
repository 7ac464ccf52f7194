//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::identity::UserService;
use crate::application::services::{BookingLifecycleService, ContractGateService};
use crate::config::RateLimitConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::SeaOrmUserRepository;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};

use super::modules::{
    auth, bookings, contracts, health, metrics as metrics_mod, request_id, users, vehicles,
};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::register,
        auth::get_current_user,
        auth::change_password,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Vehicles
        vehicles::list_vehicles,
        vehicles::get_vehicle,
        vehicles::create_vehicle,
        vehicles::update_vehicle,
        vehicles::change_vehicle_status,
        vehicles::delete_vehicle,
        // Bookings
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::list_payments,
        bookings::open_payment,
        bookings::sync_payments,
        bookings::reissue_contract,
        bookings::check_in,
        bookings::check_out,
        bookings::cancel_booking,
        bookings::cancel_incident,
        bookings::confirm_refund,
        // Contracts
        contracts::view_contract,
        contracts::sign_contract,
        contracts::get_contract,
        contracts::get_contract_by_booking,
        contracts::revoke_contract,
    ),
    components(
        schemas(
            // Health
            health::HealthResponse,
            health::DependencyHealth,
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            auth::RegisterRequest,
            auth::ChangePasswordRequest,
            // Users
            users::UserDto,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            // Vehicles
            vehicles::VehicleDto,
            vehicles::CreateVehicleRequest,
            vehicles::UpdateVehicleRequest,
            vehicles::ChangeVehicleStatusRequest,
            // Bookings
            bookings::BookingDto,
            bookings::ContractSummaryDto,
            bookings::PaymentDto,
            bookings::CreateBookingRequest,
            bookings::BookingCreatedResponse,
            bookings::ReissuedContractResponse,
            bookings::SignedContractResponse,
            bookings::OpenPaymentRequest,
            bookings::CheckInRequest,
            bookings::CheckOutRequest,
            bookings::CancelBookingRequest,
            bookings::CancelIncidentRequest,
            // Contracts
            contracts::ContractViewResponse,
            contracts::ContractDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Authentication", description = "User authentication: login (JWT), registration, password change"),
        (name = "Users", description = "User administration (admin only)"),
        (name = "Vehicles", description = "Fleet management and availability"),
        (name = "Bookings", description = "Rental booking lifecycle: creation, payments, check-in/out, cancellation"),
        (name = "Contracts", description = "Rental agreement signing gate and staff contract views"),
    ),
    info(
        title = "Rentra Booking API",
        version = "1.0.0",
        description = "REST API for the vehicle rental booking lifecycle",
        license(name = "MIT"),
        contact(name = "Rentra", email = "support@rentra.local")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
#[allow(clippy::too_many_arguments)]
pub fn create_api_router(
    repos: Arc<dyn RepositoryProvider>,
    lifecycle: Arc<BookingLifecycleService>,
    contract_gate: Arc<ContractGateService>,
    user_service: Arc<UserService<SeaOrmUserRepository>>,
    db: DatabaseConnection,
    jwt_config: JwtConfig,
    rate_limit: &RateLimitConfig,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let middleware_state = AuthState {
        jwt_config: jwt_config.clone(),
    };

    // ── Health & metrics ───────────────────────────────────────
    let health_state = health::HealthState {
        db: db.clone(),
        started_at: Arc::new(Instant::now()),
    };
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_mod::prometheus_metrics))
        .with_state(prometheus_handle);

    // ── Auth ───────────────────────────────────────────────────
    let auth_state = auth::AuthHandlerState {
        user_service: user_service.clone(),
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .with_state(auth_state.clone());

    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/change-password", post(auth::change_password))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // ── Users (admin) ──────────────────────────────────────────
    let user_state = users::UserHandlerState { user_service };
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(user_state);

    // ── Vehicles ───────────────────────────────────────────────
    let vehicle_state = vehicles::VehicleHandlerState { repos };
    let vehicle_routes = Router::new()
        .route(
            "/",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route(
            "/{id}",
            get(vehicles::get_vehicle)
                .put(vehicles::update_vehicle)
                .delete(vehicles::delete_vehicle),
        )
        .route("/{id}/status", put(vehicles::change_vehicle_status))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(vehicle_state);

    // ── Bookings ───────────────────────────────────────────────
    let booking_state = bookings::BookingHandlerState {
        lifecycle: lifecycle.clone(),
    };
    let booking_routes = Router::new()
        .route(
            "/",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/{id}", get(bookings::get_booking))
        .route(
            "/{id}/payments",
            get(bookings::list_payments).post(bookings::open_payment),
        )
        .route("/{id}/payments/sync", post(bookings::sync_payments))
        .route("/{id}/contract/reissue", post(bookings::reissue_contract))
        .route("/{id}/check-in", post(bookings::check_in))
        .route("/{id}/check-out", post(bookings::check_out))
        .route("/{id}/cancel", post(bookings::cancel_booking))
        .route("/{id}/cancel-incident", post(bookings::cancel_incident))
        .route("/{id}/confirm-refund", post(bookings::confirm_refund))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(booking_state);

    // ── Contracts ──────────────────────────────────────────────
    let contract_state = contracts::ContractHandlerState {
        lifecycle,
        contracts: contract_gate,
    };

    // Anonymous signing gate, rate limited per client IP. The token in
    // the URL is the only credential, so the window for guessing one is
    // kept narrow.
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit.contract_per_second.max(1))
            .burst_size(rate_limit.contract_burst.max(1))
            .finish()
            .unwrap_or_default(),
    );
    let contract_public_routes = Router::new()
        .route("/view/{token}", get(contracts::view_contract))
        .route("/sign/{token}", post(contracts::sign_contract))
        .layer(GovernorLayer::new(governor_config))
        .with_state(contract_state.clone());

    let contract_protected_routes = Router::new()
        .route("/{id}", get(contracts::get_contract))
        .route(
            "/by-booking/{booking_id}",
            get(contracts::get_contract_by_booking),
        )
        .route("/{id}/revoke", post(contracts::revoke_contract))
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ))
        .with_state(contract_state);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health & metrics
        .merge(health_routes)
        .merge(metrics_routes)
        // Auth
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/auth", auth_protected_routes)
        // Users
        .nest("/api/v1/users", user_routes)
        // Vehicles
        .nest("/api/v1/vehicles", vehicle_routes)
        // Bookings
        .nest("/api/v1/bookings", booking_routes)
        // Contracts
        .nest("/api/v1/contracts", contract_public_routes)
        .nest("/api/v1/contracts", contract_protected_routes)
        // Middleware
        .layer(middleware::from_fn(metrics_mod::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
