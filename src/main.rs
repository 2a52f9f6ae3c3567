//! RentHub Backend Server
//!
//! Backend for an equipment-rental marketplace: rental lifecycle
//! management, a digital wallet with payment-gateway integration, and
//! paid ad sponsorships, with background sweeps driving timeout logic.

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use renthub_server::auth::JwtVerifier;
use renthub_server::catalog::CatalogService;
use renthub_server::config::Config;
use renthub_server::gateway::GatewayClient;
use renthub_server::middleware::request_log;
use renthub_server::notifier::LogNotifier;
use renthub_server::rental::RentalService;
use renthub_server::sponsorship::SponsorshipService;
use renthub_server::state::AppState;
use renthub_server::wallet::WalletService;
use renthub_server::{db, jobs, routes};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting RentHub server");

    // Database pool and migrations
    let db_pool = match db::create_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&db_pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    // Wire services once, explicitly; no container
    let gateway = GatewayClient::new(
        config.gateway_base_url.clone(),
        config.gateway_api_key.clone(),
    );
    let catalog_service = CatalogService::new(db_pool.clone());
    let wallet_service = Arc::new(WalletService::new(db_pool.clone(), gateway));
    let rental_service = Arc::new(RentalService::new(
        db_pool.clone(),
        catalog_service.clone(),
        (*wallet_service).clone(),
        Arc::new(LogNotifier),
        config.max_rental_days,
    ));
    let sponsorship_service = Arc::new(SponsorshipService::new(
        db_pool.clone(),
        (*wallet_service).clone(),
    ));
    let catalog_service = Arc::new(catalog_service);
    let jwt_verifier = Arc::new(JwtVerifier::new(config.jwt_secret.clone()));

    let app_state = AppState::new(
        wallet_service,
        rental_service.clone(),
        sponsorship_service.clone(),
        catalog_service,
        jwt_verifier,
        config.gateway_webhook_secret.clone(),
    );

    // Start the recurring sweeps
    let mut scheduler = match jobs::start_jobs(
        rental_service,
        sponsorship_service,
        config.rental_payment_timeout_hours,
    )
    .await
    {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start background jobs: {}", e);
            std::process::exit(1);
        }
    };

    // Clone db_pool for health check
    let health_db_pool = db_pool.clone();

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_db_pool.clone())))
        .merge(routes::wallet_routes())
        .merge(routes::rental_routes())
        .merge(routes::sponsorship_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(request_log))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(configure_cors(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown error: {}", e);
    }
    tracing::info!("Server shutdown complete");
}

async fn root() -> &'static str {
    "RentHub API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: sqlx::PgPool) -> axum::Json<HealthResponse> {
    let database = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    axum::Json(HealthResponse {
        status: status.to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(allowed_origins: &Option<String>) -> CorsLayer {
    let Some(origins_str) = allowed_origins.as_deref().filter(|s| !s.is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
