//! Taskloft: a personal task-tracking service.
//!
//! Accounts register with email confirmation, authenticate with either an API
//! bearer token or a browser session cookie, and manage tasks with optional
//! file attachments. Repeated authentication failures from one address feed a
//! shared penalty store consumed by the rate limiter in front of the service.

pub mod api;
pub mod auth;
pub mod config;
pub mod email;
pub mod errors;
pub mod openapi;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    routing::{delete, get, patch, post},
};
use bon::Builder;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use crate::config::Config;

use crate::api::handlers;
use crate::auth::AuthGate;
use crate::email::EmailService;
use crate::openapi::ApiDoc;
use crate::store::{PgCredentialStore, PgTaskStore, RedisPenaltyStore, S3FileStore, Stores};

/// Shared state available to all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub gate: Arc<AuthGate>,
    pub email: Arc<EmailService>,
}

/// Get the taskloft database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL and bring the schema up to date.
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool_settings = &config.database.pool;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(pool_settings.acquire_timeout_secs))
        .idle_timeout(match pool_settings.idle_timeout_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        })
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;

    Ok(pool)
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // AllowOrigin::list refuses a literal "*"; wildcard means "any"
    let allow_origin = if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(config.cors.allow_credentials);

    Ok(cors)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    // Leave headroom over the attachment limit for multipart framing; the
    // handler enforces the exact limit on the decoded file
    let body_limit = state.config.limits.max_upload_size as usize + 64 * 1024;

    let router = Router::new()
        .route("/authentication/register", post(handlers::auth::register))
        .route("/authentication/confirm/{token}", get(handlers::auth::confirm))
        .route("/authentication/login", post(handlers::auth::login))
        .route("/authentication/logout", post(handlers::auth::logout))
        .route("/users/me", get(handlers::users::me))
        .route("/tasks", post(handlers::tasks::create_task).get(handlers::tasks::list_tasks))
        .route("/tasks/{id}", delete(handlers::tasks::delete_task))
        .route("/tasks/{id}/status", patch(handlers::tasks::update_task_status))
        .route(
            "/tasks/{id}/attachment",
            post(handlers::attachments::upload_attachment).delete(handlers::attachments::delete_attachment),
        )
        .route("/healthz", get(healthz))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    Ok(router)
}

/// The assembled service: connections established, migrations run, router built.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;

        let penalties = Arc::new(RedisPenaltyStore::connect(&config.redis.url).await?);
        let files = Arc::new(S3FileStore::connect(&config.storage).await?);
        let stores = Stores {
            credentials: Arc::new(PgCredentialStore::new(pool.clone())),
            tasks: Arc::new(PgTaskStore::new(pool.clone())),
            penalties,
            files,
        };

        let gate = Arc::new(AuthGate::new(&config, stores.credentials.clone(), stores.penalties.clone())?);
        let email = Arc::new(EmailService::new(&config)?);

        let state = AppState::builder()
            .config(config.clone())
            .stores(stores)
            .gate(gate)
            .email(email)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Taskloft listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
