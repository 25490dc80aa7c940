mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::{BookingExt, DBClient, ListingExt, NegotiationExt, NotificationExt, UserExt};
use dotenv::dotenv;
use routes::create_router;
use service::{
    background_jobs,
    booking_service::BookingService,
    negotiation_service::NegotiationService,
    notification_service::NotificationService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub users: Arc<dyn UserExt>,
    pub negotiation_service: Arc<NegotiationService>,
    pub booking_service: Arc<BookingService>,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, env: Config) -> Self
    where
        S: UserExt + ListingExt + NegotiationExt + NotificationExt + BookingExt + 'static,
    {
        let notification_service = Arc::new(NotificationService::new(store.clone()));
        let booking_service = Arc::new(BookingService::new(store.clone()));
        let negotiation_service = Arc::new(NegotiationService::new(
            store.clone(),
            store.clone(),
            notification_service,
            booking_service.clone(),
            env.negotiation_expiry_days,
        ));

        AppState {
            env,
            users: store,
            negotiation_service,
            booking_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Failed to run database migrations: {:?}", err);
        std::process::exit(1);
    }

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST]);

    let db_client = Arc::new(DBClient::new(pool));
    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    tokio::spawn(background_jobs::start_negotiation_expiry_job(app_state.clone()));
    tokio::spawn(background_jobs::start_booking_reconciliation_job(app_state.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {:?}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {:?}", err);
        std::process::exit(1);
    }
}
