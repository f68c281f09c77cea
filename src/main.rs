use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solveboard::{
    bot::Bot, config::Config, gateway, identity::HttpIdentityResolver,
    proof::HttpProofImageSource, store::SolveStore,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solveboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting solveboard...");

    let config = Config::from_env();

    if let Some(url) = config.install_url() {
        tracing::info!("Add the bot to a server: {}", url);
    }

    let store = SolveStore::open(&config.database_url)
        .await
        .expect("Failed to open solve store");

    let identities = HttpIdentityResolver::new(config.bridge_url.clone(), config.http_timeout)
        .expect("Failed to build identity client");
    let proofs = HttpProofImageSource::new(config.proof_image_url.clone(), config.http_timeout)
        .expect("Failed to build proof image client");

    let bot = Arc::new(Bot::new(
        store.clone(),
        Arc::new(identities),
        Arc::new(proofs),
        config.timezone,
    ));

    let app = gateway::router(bot);

    tracing::info!("Listening on http://{}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    store.close().await;
    tracing::info!("Solve store closed, bye");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
