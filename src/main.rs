use tesis_gateway::logging::init_tracing;
use tesis_gateway::{create_app, Config};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(&config.logging);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(config)?;

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "gateway listening");

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal(app.shutdown))
        .await?;

    tracing::info!("gateway stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, then stops the health monitor
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    token.cancel();
}
