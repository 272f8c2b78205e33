mod config;
mod error;
mod generator;
mod models;
mod poller;
mod replicate;
mod routes;
mod style;
mod submitter;
#[cfg(test)]
mod fakes;

use axum::{Router, routing::{post, get}};
use routes::{generate_image, generate_batch, list_presets, create_image, list_images, get_image, delete_image, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};

use crate::config::Config;
use crate::generator::ImageGenerator;
use crate::poller::TokioSleeper;
use crate::replicate::ReplicateClient;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate_image))
        .route("/api/generate/batch", post(generate_batch))
        .route("/api/presets", get(list_presets))
        .route("/api/images", post(create_image).get(list_images))
        .route("/api/images/:id", get(get_image).delete(delete_image))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    tracing::info!("Provider token: {}", config.token_hint());
    if config.api_token.is_none() {
        tracing::warn!("REPLICATE_API_TOKEN is not set; generation requests will be rejected");
    }

    let transport = Arc::new(ReplicateClient::new(config.predictions_url.clone(), config.request_timeout)?);
    let state = AppState {
        store: Arc::default(),
        generator: Arc::new(ImageGenerator::new(&config, transport, Arc::new(TokioSleeper))),
    };

    let addr = SocketAddr::from(([0,0,0,0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
