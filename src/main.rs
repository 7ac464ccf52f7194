//!
//! REST service orchestrating the vehicle rental booking lifecycle.
//! Reads configuration from TOML file (~/.config/rentra-booking/config.toml).

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use metrics_exporter_prometheus;
use rentra_booking::application::ports::{DocumentRendererPort, NotifierPort, PaymentGatewayPort};
use rentra_booking::application::services::{
    start_booking_watchdog_task, start_contract_expiry_task,
};
use rentra_booking::application::{
    BookingLifecycleService, ContractGateService, GatewayReconcilerService, PaymentLedgerService,
    UserService,
};
use rentra_booking::config::{AppConfig, GatewayMode};
use rentra_booking::domain::RepositoryProvider;
use rentra_booking::infrastructure::crypto::jwt::JwtConfig;
use rentra_booking::infrastructure::database::migrator::Migrator;
use rentra_booking::infrastructure::{
    PayGateGateway, SimulatedGateway, TemplateRenderer, TracingNotifier,
};
use rentra_booking::shared::shutdown::ShutdownCoordinator;
use rentra_booking::{
    create_api_router, default_config_path, init_database, SeaOrmRepositoryProvider,
    SeaOrmUserRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("BOOKING_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Initialize logging with configured level
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting Rentra Booking Service...");

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("📊 Prometheus metrics recorder installed");

    let jwt_config = JwtConfig::new(
        app_cfg.security.jwt_secret.clone(),
        app_cfg.security.jwt_expiration_hours,
    );
    info!(
        "JWT configured with {}h token expiration",
        jwt_config.expiration_hours
    );

    // ── Database ───────────────────────────────────────────────
    let db = match init_database(&app_cfg.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // Create default admin user if not exists
    create_default_admin(&db, &app_cfg).await;

    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // ── Payment gateway (simulated or live, per config) ────────
    let gateway: Arc<dyn PaymentGatewayPort> = match app_cfg.gateway.mode {
        GatewayMode::Simulated => {
            info!("💰 Payment gateway: simulated (in-memory)");
            Arc::new(SimulatedGateway::new())
        }
        GatewayMode::Live => {
            info!("💰 Payment gateway: live at {}", app_cfg.gateway.base_url);
            match PayGateGateway::new(&app_cfg.gateway) {
                Ok(gw) => Arc::new(gw),
                Err(e) => {
                    error!("Failed to initialize payment gateway: {}", e);
                    return Err(e.into());
                }
            }
        }
    };

    let notifier: Arc<dyn NotifierPort> = Arc::new(TracingNotifier::new());
    let renderer: Arc<dyn DocumentRendererPort> = Arc::new(TemplateRenderer::new());

    // ── Application services ───────────────────────────────────
    let ledger = Arc::new(PaymentLedgerService::new(repos.clone()));
    let contract_gate = Arc::new(ContractGateService::new(
        repos.clone(),
        renderer,
        app_cfg.contract.token_ttl_hours,
    ));
    let reconciler = Arc::new(GatewayReconcilerService::new(
        repos.clone(),
        ledger.clone(),
        gateway,
        app_cfg.gateway.return_url.clone(),
        app_cfg.gateway.cancel_url.clone(),
    ));
    let lifecycle = Arc::new(BookingLifecycleService::new(
        repos.clone(),
        contract_gate.clone(),
        ledger.clone(),
        reconciler.clone(),
        notifier,
        app_cfg.booking.clone(),
    ));
    let user_service = Arc::new(UserService::new(
        Arc::new(SeaOrmUserRepository::new(db.clone())),
        jwt_config.clone(),
    ));

    // Initialize shutdown coordinator
    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
    let shutdown_signal = shutdown.signal();

    // Start listening for shutdown signals (SIGTERM, SIGINT)
    shutdown.start_signal_listener();

    // ── Background tasks ───────────────────────────────────────
    start_booking_watchdog_task(
        lifecycle.clone(),
        shutdown_signal.clone(),
        app_cfg.booking.watchdog_interval_secs,
    );
    start_contract_expiry_task(
        contract_gate.clone(),
        shutdown_signal.clone(),
        app_cfg.contract.sweep_interval_secs,
    );

    // Create REST API router
    let api_router = create_api_router(
        repos,
        lifecycle,
        contract_gate,
        user_service,
        db.clone(),
        jwt_config,
        &app_cfg.rate_limit,
        prometheus_handle,
    );

    // Start REST API server with graceful shutdown
    let api_addr = format!("{}:{}", app_cfg.server.api_host, app_cfg.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    info!("🚀 Booking service started. Press Ctrl+C to shutdown gracefully.");

    let api_shutdown = shutdown_signal.clone();
    axum::serve(
        listener,
        api_router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        api_shutdown.wait().await;
        info!("🛑 REST API server received shutdown signal");
    })
    .await?;

    // Perform final cleanup, bounded by the configured shutdown timeout
    info!("🧹 Performing final cleanup...");

    shutdown
        .shutdown_with_cleanup(|| async {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("✅ Database connection closed");
            }
        })
        .await;

    info!("👋 Rentra Booking Service shutdown complete");
    Ok(())
}

/// Create default admin user if no users exist
async fn create_default_admin(db: &sea_orm::DatabaseConnection, app_cfg: &AppConfig) {
    use rentra_booking::infrastructure::crypto::password::hash_password;
    use rentra_booking::infrastructure::database::entities::user::{self, UserRole};
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    let users_count = user::Entity::find().count(db).await.unwrap_or(0);

    if users_count == 0 {
        info!("Creating default admin user...");

        let admin_email = app_cfg.admin.email.clone();
        let admin_username = app_cfg.admin.username.clone();
        let admin_password = app_cfg.admin.password.clone();

        let password_hash = match hash_password(&admin_password) {
            Ok(hash) => hash,
            Err(e) => {
                error!("Failed to hash admin password: {}", e);
                return;
            }
        };

        let admin = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(admin_username),
            email: Set(admin_email.clone()),
            password_hash: Set(password_hash),
            role: Set(UserRole::Admin),
            full_name: Set(None),
            phone: Set(None),
            driver_license_no: Set(None),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(chrono::Utc::now()),
            last_login_at: Set(None),
        };

        match admin.insert(db).await {
            Ok(_) => {
                info!("Default admin created: {}", admin_email);
                info!("⚠️  Please change the admin password immediately!");
            }
            Err(e) => {
                error!("Failed to create admin user: {}", e);
            }
        }
    }
}
