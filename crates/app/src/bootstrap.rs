use roomquote_core::config::{AppConfig, ConfigError, LoadOptions};
use roomquote_db::connection::connect_from_config;
use roomquote_db::{migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::desk::{DeskRepositories, QuoteDesk};
use crate::notify::{NotificationDispatcher, NotificationError};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub desk: QuoteDesk,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates and wires the desk for an already loaded configuration.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let repos = DeskRepositories::sql(db_pool.clone());
    let dispatcher = NotificationDispatcher::from_config(&config, repos.notifications.clone())?;
    info!(
        event_name = "system.bootstrap.notifications_ready",
        channels = ?dispatcher.channels(),
        "notification channels configured"
    );

    let desk = QuoteDesk::new(repos, &config, dispatcher);
    Ok(Application { config, db_pool, desk })
}
