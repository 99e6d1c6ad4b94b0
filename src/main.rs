use rfid_console::{router, AppState, Console, ConsoleConfig};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = match ConsoleConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return Err(err.into());
        }
    };
    info!(
        mode = %config.session.mode,
        subject_id = %config.session.subject_id,
        transport = ?config.transport,
        "starting console"
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let (console, scans) = Console::new(config);
    let _tasks = console.start(scans);

    let app = router(AppState::new(console));
    info!("panel listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
