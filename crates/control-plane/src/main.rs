// Swag API server
// Decision: Runs without DATABASE_URL on the in-memory store (dev mode)
// Decision: Background jobs share the services of the HTTP routes and stop with the server

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use swag_control_plane::api::health::{self, HealthState};
use swag_control_plane::config::AppConfig;
use swag_control_plane::jobs::{JobScheduler, RefreshExternalNews, SyncExternalEvents};
use swag_control_plane::openapi::ApiDoc;
use swag_control_plane::AppContext;
use swag_core::telemetry::{init_telemetry, TelemetryConfig};
use swag_external::{http_client, EventSiteClient, MembershipClient};
use swag_storage::StorageBackend;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Configure via environment variables:
    // - RUST_LOG: Log filter (default: "swag_control_plane=debug,tower_http=debug,info")
    // - LOG_FORMAT: "json" for JSON lines
    let mut telemetry_config = TelemetryConfig::from_env();
    if telemetry_config.service_name == "swag" {
        telemetry_config.service_name = "swag-control-plane".to_string();
    }
    telemetry_config.service_version = Some(env!("CARGO_PKG_VERSION").to_string());
    init_telemetry(telemetry_config);

    tracing::info!("swag-control-plane starting...");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let storage = match &config.database_url {
        Some(url) => {
            let storage = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            storage
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            StorageBackend::in_memory()
        }
    };

    let client = http_client(&config.external).context("Failed to build HTTP client")?;
    let membership = Arc::new(MembershipClient::new(client.clone(), config.external.clone()));
    let event_site = Arc::new(EventSiteClient::new(client, config.external.clone()));
    tracing::info!(
        events_api = %config.external.events_api_url,
        timezone = %config.external.timezone,
        "External APIs configured"
    );

    let ctx = AppContext::new(
        storage.clone(),
        &config.auth,
        membership,
        event_site,
        config.external.timezone,
    );

    let mut scheduler = JobScheduler::new();
    scheduler.spawn(
        Arc::new(SyncExternalEvents::new(ctx.external.clone())),
        config.jobs.sync_external_events,
    );
    scheduler.spawn(
        Arc::new(RefreshExternalNews::new(ctx.external.clone())),
        config.jobs.refresh_external_news,
    );
    tracing::info!(jobs = scheduler.job_count(), "Background jobs started");

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let cors_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();
    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    // Health is never prefixed
    let app = health::routes(HealthState {
        storage: storage.kind(),
    })
    .merge(build_router_with_prefix(ctx.api_routes(), &config.api_prefix))
    .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                ])
                .allow_credentials(true),
        )
    } else {
        app
    };

    let app = app.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("HTTP server stopped, stopping background jobs");
    scheduler.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
