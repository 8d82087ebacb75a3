use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use axum::{Extension, Router, middleware, response::IntoResponse, routing::get, serve};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shared::config::server::{Config, DatabaseConfig, LogFormat};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::{
    app_state::AppState,
    db::bootstrap,
    handlers,
    middleware::{
        auth::auth_middleware,
        request_context::{RequestIdState, assign_request_id},
    },
    routes,
    services::{blob_store::HttpBlobStore, presence::PresenceRegistry},
};
use axum::http::{HeaderValue, StatusCode, header};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global Prometheus recorder handle, installed once per process.
pub fn metrics_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn metrics_endpoint(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        handle.render(),
    )
}

/// Initializes the tracing subscriber for logging using the provided configuration.
pub fn initialize_tracing(config: &Config) -> String {
    let env_filter = build_env_filter(config);

    let fmt_builder = fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    if matches!(config.logging.format, LogFormat::Json) {
        fmt_builder.json().with_ansi(false).init();
    } else {
        fmt_builder.with_ansi(true).init();
    }

    config.logging.level.clone()
}

fn build_env_filter(config: &Config) -> EnvFilter {
    let default_level = config
        .logging
        .level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    })
}

/// Creates a database connection pool from the given database configuration.
///
/// # Errors
/// Returns an error if the database connection pool cannot be created.
pub async fn create_database_pool(db: &DatabaseConfig) -> Result<sqlx::PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect(&db.url)
        .await?;
    metrics::gauge!("db_pool_max_connections").set(f64::from(db.max_connections));
    Ok(pool)
}

/// Creates the application state with the given database pool.
pub fn create_app_state(pool: Option<sqlx::PgPool>, config: &Config) -> Arc<AppState> {
    Arc::new(AppState {
        pool,
        presence: Arc::new(PresenceRegistry::new(config.sse.channel_capacity)),
        blob_store: Arc::new(HttpBlobStore::from_config(&config.blob_store)),
    })
}

/// Creates the CORS layer for the application.
pub fn create_cors_layer(config: &Config) -> CorsLayer {
    use http::Method;

    let methods = vec![
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let mut cors = CorsLayer::new()
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::any())
        .allow_credentials(config.server.cors.allow_credentials)
        .max_age(Duration::from_secs(config.server.cors.max_age_seconds));

    if config.server.cors.allowed_origins.is_empty() {
        cors = cors.allow_origin(AllowOrigin::any());
    } else {
        let origins = config
            .server
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origin| http::HeaderValue::from_str(origin).ok())
            .collect::<Vec<_>>();
        cors = cors.allow_origin(AllowOrigin::list(origins));
    }

    cors
}

/// Creates the API router: message routes and the push channel behind the
/// auth boundary, health and metrics open.
pub fn create_api_router() -> Router {
    let protected = handlers::messages::routes()
        .route(
            "/stream",
            get(handlers::stream::sse_handler),
        )
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .merge(routes::health::create_health_router())
        .route("/metrics", get(metrics_endpoint))
        .merge(protected)
}

/// Creates the main application router with all middleware and routes.
pub fn create_app_router(
    state: Arc<AppState>,
    config: Arc<Config>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let request_id_state = RequestIdState::from_config(&config);

    create_api_router()
        .layer(middleware::from_fn_with_state(
            request_id_state,
            assign_request_id,
        ))
        .layer(Extension(metrics_handle))
        .layer(Extension(state))
        .layer(Extension(config.clone()))
        .layer(create_cors_layer(&config))
        .layer(TraceLayer::new_for_http())
}

/// Runs the server with the provided configuration until shutdown.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server loop fails.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let level = initialize_tracing(&config);
    info!(level, "starting QuickChat server");

    let handle = metrics_handle();

    let pool = match create_database_pool(&config.database).await {
        Ok(pool) => {
            bootstrap::run(&pool).await?;
            bootstrap::ensure_liveness(&pool).await?;
            Some(pool)
        }
        Err(err) => {
            // The server still comes up for health probes; readyz reports
            // degraded until the store is reachable on restart.
            warn!(error = %err, "database unavailable, running without a pool");
            None
        }
    };

    let config = Arc::new(config);
    let state = create_app_state(pool, &config);
    let app = create_app_router(state, Arc::clone(&config), handle);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    serve(listener, app).await?;
    Ok(())
}
