use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};
use annonce_booking_backend::config::{Config, DatabaseSettings};
use annonce_booking_backend::controller::{self, AppState};
use annonce_booking_backend::helpers::logging::init_tracing;
use annonce_booking_backend::repositories::connection::Connection;
use annonce_booking_backend::repositories::postgres_repo::PostgresReservationRepo;
use annonce_booking_backend::services::reservation_service::{ReservationService, ServiceSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::parse();
    init_tracing(&config.log_level, &config.log_format);

    let settings = DatabaseSettings::load(&config.database_config, &config.environment)
        .with_context(|| format!("Failed to load database settings for {}", config.environment))?;

    let connection = match Connection::connect(&settings).await {
        Ok(connection) => connection,
        Err(e) if config.fail_fast => {
            return Err(anyhow::Error::new(e).context("Database is unreachable, refusing to start"));
        }
        Err(e) => {
            warn!("Database is unreachable, serving in degraded mode: {}", e);
            Connection::lazy(&settings)
        }
    };

    if config.run_migrations {
        match connection.migrate().await {
            Ok(()) => {}
            Err(e) if config.fail_fast => {
                return Err(anyhow::Error::new(e).context("Failed to apply database schema"));
            }
            Err(e) => warn!("Skipping database schema setup: {}", e),
        }
    }

    let gateway = Arc::new(PostgresReservationRepo::new(connection.clone()));
    let reservation_service = Arc::new(ReservationService::new(
        gateway,
        ServiceSettings {
            dedup_window: config.dedup_window(),
            request_timeout: config.request_timeout(),
        },
    ));

    let served = controller::serve(
        AppState { reservation_service },
        &config,
        shutdown_signal(),
    ).await;

    connection.close();
    info!("Shut down");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
