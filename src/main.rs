use {
    psp_ledger_sync::{
        AppState, adapters::stripe::client::StripeGateway, app, config::AppConfig,
        infra::commercetools::CommercetoolsClient,
    },
    std::{sync::Arc, time::Duration},
    tokio::signal,
    tracing_subscriber::EnvFilter,
};

/// Overall deadline for one inbound request, PSP retries included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenvy::dotenv().ok();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let gateway = Arc::new(StripeGateway::new(&config.regions, config.stripe.clone()));
    let ledger = match CommercetoolsClient::new(config.commerce.clone(), config.stripe.request_timeout) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "failed to build commerce platform client");
            std::process::exit(1);
        }
    };

    let regions: Vec<String> = config.regions.regions().map(|r| r.to_string()).collect();
    let state = AppState::new(&config, gateway, ledger);
    let router = app(state, REQUEST_TIMEOUT);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(
        addr = %config.bind_addr,
        regions = %regions.join(","),
        multi_operations = ?config.multi_operations,
        "listening"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
