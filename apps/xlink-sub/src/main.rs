use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xlink_db::repositories::clash_repo::ClashSubscriptionRepository;
use xlink_db::repositories::inbound_repo::InboundRepository;

mod config;
mod error;
mod handlers;
mod link;
mod services;

use config::SubConfig;
use services::{ClashService, SubscriptionConverter, SubscriptionService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xlink_sub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("A rustls crypto provider was already installed");
    }

    let config = SubConfig::load()?;
    tracing::info!("Subscription service starting...");
    tracing::info!("Subscription path: {}", config.sub_path);
    tracing::info!("Converter: {}", config.converter_url);

    let pool = xlink_db::db::init_db(&config.database_url).await?;
    let inbounds = Arc::new(InboundRepository::new(pool.clone()));
    let converter = SubscriptionConverter::new(
        config.converter_url.clone(),
        Duration::from_secs(config.converter_timeout_secs),
    )?;

    let state = AppState {
        subscriptions: Arc::new(SubscriptionService::new(
            inbounds.clone(),
            config.remark_model.clone(),
            config.show_info,
        )),
        clash: Arc::new(ClashService::new(
            inbounds,
            Arc::new(ClashSubscriptionRepository::new(pool)),
            Arc::new(converter),
            config.remark_model.clone(),
            config.hidden_port,
        )),
        config: config.clone(),
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("Subscription service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub config: SubConfig,
    pub subscriptions: Arc<SubscriptionService>,
    pub clash: Arc<ClashService>,
}

pub fn build_router(state: AppState) -> Router {
    let sub_route = format!("{}{{sub_id}}", state.config.sub_path);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(&sub_route, get(handlers::subscription::subscription_handler))
        .route(
            "/clash/subscription/{email}",
            get(handlers::clash::clash_handler),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
