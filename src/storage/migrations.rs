use rusqlite::Connection;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

mod embedded {
    use refinery::embed_migrations;

    embed_migrations!("./migrations");
}

static MIGRATION_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn run_migrations(conn: &mut Connection) -> AppResult<()> {
    // Serialize migrations per-process and take an exclusive SQLite lock
    // to avoid concurrent runners interleaving on multi-instance startups.
    let mutex = MIGRATION_LOCK.get_or_init(|| Mutex::new(()));
    // Recover from a poisoned lock: migrations are idempotent, so a panic
    // in another thread leaves nothing half-done that a re-run can't fix.
    let _guard = match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Migration lock was poisoned, recovering...");
            poisoned.into_inner()
        }
    };

    conn.busy_timeout(Duration::from_secs(30))?;
    conn.execute_batch("BEGIN IMMEDIATE")?;

    if let Err(err) = embedded::migrations::runner().run(conn) {
        let _ = conn.execute_batch("ROLLBACK");
        return Err(AppError::Migration(err));
    }

    conn.execute_batch("COMMIT")?;
    Ok(())
}

/// Run migrations for tests without the outer transaction wrapper
/// This is needed because refinery uses its own transactions internally
#[doc(hidden)]
pub fn run_migrations_for_test(conn: &mut Connection) -> AppResult<()> {
    conn.busy_timeout(Duration::from_secs(30))?;
    embedded::migrations::runner()
        .run(conn)
        .map(|_| ())
        .map_err(AppError::Migration)
}
