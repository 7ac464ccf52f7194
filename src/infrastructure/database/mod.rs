pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::{SeaOrmRepositoryProvider, SeaOrmUserRepository};

use sea_orm::{Database, DatabaseConnection};
use tracing::info;

use crate::config::{DatabaseSettings, DbType};

/// Initialize database connection
pub async fn init_database(settings: &DatabaseSettings) -> Result<DatabaseConnection, sea_orm::DbErr> {
    // Password stays out of the log line
    match settings.driver {
        DbType::Sqlite => info!("Connecting to database: sqlite://{}", settings.sqlite.path),
        DbType::Postgres => info!(
            "Connecting to database: postgres://{}@{}:{}/{}",
            settings.postgres.user,
            settings.postgres.host,
            settings.postgres.port,
            settings.postgres.dbname
        ),
    }

    let db = Database::connect(settings.connection_url()).await?;
    info!("Database connected successfully");
    Ok(db)
}
