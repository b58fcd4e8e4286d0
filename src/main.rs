// SPDX-License-Identifier: MIT

//! Visor de Territorios Formalizados — API server.
//!
//! Loads the formalized-territory shapefile once at startup and serves
//! filtering, overlay analysis and export endpoints.

use std::sync::Arc;
use territorio_visor::{config::Config, services::TerritoryService, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting territorio-visor API");

    // Load the territory collection; a load failure here is fatal, the
    // process never serves partial data.
    tracing::info!(source = %config.data_source, "Loading territory archive");
    let territories = TerritoryService::load(&config.data_source)
        .await
        .expect("Failed to load territory archive");
    tracing::info!(
        count = territories.territories().len(),
        "Territory collection loaded"
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        territories,
    });

    let app = territorio_visor::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("territorio_visor=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
