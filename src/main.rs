use std::net::TcpListener;

use authgate::configuration::get_configuration;
use authgate::startup::{build_auth_service, connect_database, run};
use authgate::store::spawn_refresh_token_sweep;
use authgate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let environment = configuration.application.environment;
    init_telemetry(&configuration.log, environment);
    tracing::info!(environment = ?environment, "Configuration loaded");

    let pool = connect_database(&configuration.database, environment)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create connection pool");
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let auth = build_auth_service(pool.clone(), &configuration);
    let sweep = spawn_refresh_token_sweep(
        auth.refresh_token_store(),
        configuration.application.sweep_interval,
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    // actix handles SIGINT/SIGTERM and drains workers before returning
    let result = run(listener, auth, environment)?.await;

    sweep.abort();
    pool.close().await;
    tracing::info!("Server shut down");

    result
}
