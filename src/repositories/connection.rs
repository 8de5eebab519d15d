use bb8_postgres::bb8::{ManageConnection, Pool};
use bb8_postgres::tokio_postgres::{Config as PgConfig, NoTls};
use bb8_postgres::PostgresConnectionManager;
use tracing::{debug, info};

use crate::config::DatabaseSettings;
use crate::errors::{ConnectionError, PersistenceError};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

const SCHEMA: &str = include_str!("../../migrations/0001_create_reservations.sql");

/// The process-wide handle to the store. Built once by the composition root
/// and handed to the gateway; dropping the last clone releases the pool.
#[derive(Clone)]
pub struct Connection {
    pool: PgPool,
}

impl Connection {
    /// Authenticates once against the store and returns a pooled handle.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, ConnectionError> {
        let manager = PostgresConnectionManager::new(pg_config(settings), NoTls);

        let attempt = tokio::time::timeout(settings.connect_timeout(), async {
            let client = manager.connect().await?;
            client.simple_query("SELECT 1").await?;
            Ok::<_, bb8_postgres::tokio_postgres::Error>(())
        })
        .await;

        match attempt {
            Ok(Ok(())) => {
                info!(
                    "Connected to database {} at {}:{}",
                    settings.database, settings.host, settings.port
                );
                Ok(Self::with_manager(manager, settings))
            }
            Ok(Err(e)) => Err(classify_connect_error(e, settings)),
            Err(_) => Err(ConnectionError::TimedOut),
        }
    }

    /// Builds the pool without contacting the store; every acquisition will
    /// try again.
    pub fn lazy(settings: &DatabaseSettings) -> Self {
        let manager = PostgresConnectionManager::new(pg_config(settings), NoTls);
        Self::with_manager(manager, settings)
    }

    fn with_manager(
        manager: PostgresConnectionManager<NoTls>,
        settings: &DatabaseSettings,
    ) -> Self {
        let pool = Pool::builder()
            .max_size(settings.pool.max_size)
            .connection_timeout(settings.acquire_timeout())
            .build_unchecked(manager);
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the bundled schema. Every statement is idempotent.
    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|_| PersistenceError::ConnectionLost)?;
        conn.batch_execute(SCHEMA)
            .await
            .map_err(|e| PersistenceError::Unexpected(e.to_string()))?;
        info!("Database schema is up to date");
        Ok(())
    }

    pub fn close(self) {
        let state = self.pool.state();
        debug!(
            "Releasing database pool with {} open connections",
            state.connections
        );
        drop(self.pool);
    }
}

fn pg_config(settings: &DatabaseSettings) -> PgConfig {
    let mut config = PgConfig::new();
    config
        .host(&settings.host)
        .port(settings.port)
        .dbname(&settings.database)
        .user(&settings.username)
        .connect_timeout(settings.connect_timeout());
    if let Some(password) = &settings.password {
        config.password(password);
    }
    if let Some(name) = &settings.dialect_options.application_name {
        config.application_name(name);
    }
    config
}

fn classify_connect_error(
    e: bb8_postgres::tokio_postgres::Error,
    settings: &DatabaseSettings,
) -> ConnectionError {
    match e.as_db_error() {
        // The server answered, so it was the credentials or the database name.
        Some(db) => ConnectionError::Rejected(db.message().to_string()),
        None => ConnectionError::Unreachable {
            host: settings.host.clone(),
            port: settings.port,
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_settings() -> DatabaseSettings {
        DatabaseSettings::from_json(
            r#"{ "test": {
                "username": "nobody",
                "database": "nothing",
                "host": "bad-host.invalid",
                "port": 5432,
                "dialect": "postgres",
                "dialectOptions": { "connectTimeoutMs": 500 },
                "pool": { "maxSize": 1, "acquireTimeoutMs": 300 }
            } }"#,
            "test",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn connect_to_bad_host_is_a_connection_error() {
        let err = Connection::connect(&unreachable_settings())
            .await
            .err()
            .expect("bad host must not connect");
        assert!(matches!(
            err,
            ConnectionError::Unreachable { .. } | ConnectionError::TimedOut
        ));
    }

    #[tokio::test]
    async fn lazy_connection_fails_migration_as_connection_lost() {
        let connection = Connection::lazy(&unreachable_settings());
        assert_eq!(
            connection.migrate().await,
            Err(PersistenceError::ConnectionLost)
        );
    }
}
