//! Database connection utilities.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use impresario_error::{ImpresarioResult, StorageError, StorageErrorKind};

/// Establish a connection to the PostgreSQL database.
///
/// Reads the `DATABASE_URL` environment variable for the connection string.
///
/// # Errors
///
/// Returns an error if:
/// - `DATABASE_URL` is not set
/// - Connection to the database fails
pub fn establish_connection() -> ImpresarioResult<PgConnection> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        StorageError::new(StorageErrorKind::Connection(
            "DATABASE_URL environment variable not set".to_string(),
        ))
    })?;
    connect_to(&database_url)
}

/// Connect to the database at the given URL.
pub fn connect_to(database_url: &str) -> ImpresarioResult<PgConnection> {
    PgConnection::establish(database_url)
        .map_err(|e| StorageError::new(StorageErrorKind::Connection(e.to_string())).into())
}

/// Run pending migrations.
pub fn run_migrations(conn: &mut PgConnection) -> ImpresarioResult<()> {
    use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
        StorageError::new(StorageErrorKind::Backend(format!("Migration failed: {e}")))
    })?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "Applied pending database migrations");
    }
    Ok(())
}
