use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post, IntoMakeService};
use axum::{Router, Server};
use hyper::server::conn::AddrIncoming;
use hyper::{Body, Request};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::captcha_client::CaptchaClient;
use crate::config::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::notifications::Notifier;
use crate::routes::{health_check, send_contact_message, subscribe};
use crate::store::SubmissionStore;

pub type AppServer = Server<AddrIncoming, IntoMakeService<Router>>;

pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub captcha_client: CaptchaClient,
    pub notifier: Notifier,
}

/// Wires the clients from `config` around `store` and binds the listener.
/// Port `0` picks a random free port; see [`Server::local_addr`].
pub fn build(
    config: &Settings,
    store: Arc<dyn SubmissionStore>,
) -> Result<AppServer, anyhow::Error> {
    let email_client = EmailClient::new(
        &config.email_client.base_url,
        config.email_client.authorization_token.clone(),
        config.email_client.timeout(),
    )?;
    let recipient = config
        .notifications
        .recipient()
        .map_err(anyhow::Error::msg)
        .context("Invalid notification recipient address.")?;
    let senders = config
        .notifications
        .senders()
        .map_err(anyhow::Error::msg)
        .context("Invalid notification sender address.")?;
    let captcha_client = CaptchaClient::new(
        &config.captcha.verify_url,
        config.captcha.secret_key.clone(),
        config.captcha.score_threshold,
        config.captcha.timeout(),
    )?;

    let state = Arc::new(AppState {
        store,
        captcha_client,
        notifier: Notifier::new(Arc::new(email_client), recipient, senders),
    });

    let address: SocketAddr = format!("{}:{}", config.application.host, config.application.port)
        .parse()
        .context("Invalid application host or port.")?;
    let server = Server::try_bind(&address)
        .with_context(|| format!("Failed to bind {address}"))?
        .serve(router(state).into_make_service());

    Ok(server)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health_check", get(health_check))
        .route("/subscriptions", post(subscribe))
        .route("/contact", post(send_contact_message))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = Uuid::new_v4();
                        tracing::info_span!(
                            "request",
                            %request_id,
                            method = %request.method(),
                            uri = %request.uri(),
                            version = ?request.version(),
                        )
                    }),
                )
                .layer(cors_layer()),
        )
}

/// The site is served from a different origin than the API.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

pub fn get_db_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(config.with_db())
}

pub async fn run_migrations(db_pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db_pool).await
}
