//! SQLite access: connection pool and user/order CRUD
//!
//! Catalog price rows are owned by `pricing::ledger` — nothing else in the
//! crate writes them. Everything here goes through the r2d2 pool; schema
//! setup runs once in `create_pool` via the embedded migrations.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

use crate::core::error::AppResult;
use crate::core::types::{PaymentMethod, Platform, RegistrationStage, TransferType};
use crate::storage::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// A registered (or registering) user.
#[derive(Debug, Clone)]
pub struct User {
    pub telegram_id: i64,
    pub platform: Option<Platform>,
    pub whatsapp: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_details: Option<String>,
    pub stage: RegistrationStage,
}

/// Create a new database connection pool and run schema migrations.
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// In-memory pool for tests.
pub fn create_test_pool() -> AppResult<DbPool> {
    // A single shared connection keeps the in-memory database alive and
    // visible across pool checkouts.
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager)?;
    let mut conn = pool.get()?;
    migrations::run_migrations_for_test(&mut conn)?;
    Ok(pool)
}

/// Get a connection from the pool.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Loads a user row, if one exists.
pub fn get_user(conn: &DbConnection, telegram_id: i64) -> AppResult<Option<User>> {
    let row = conn
        .query_row(
            "SELECT telegram_id, platform, whatsapp, payment_method, payment_details, registration_stage
             FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    Ok(row.map(|(telegram_id, platform, whatsapp, payment_method, payment_details, stage)| User {
        telegram_id,
        platform: platform.and_then(|p| Platform::from_str(&p).ok()),
        whatsapp,
        payment_method: payment_method.and_then(|m| PaymentMethod::from_str(&m).ok()),
        payment_details,
        // Unknown stage text from an older build reads as a fresh start.
        stage: stage.parse().unwrap_or_default(),
    }))
}

/// Returns the persisted registration stage, `Start` when no row exists.
pub fn get_stage(conn: &DbConnection, telegram_id: i64) -> AppResult<RegistrationStage> {
    Ok(get_user(conn, telegram_id)?.map(|u| u.stage).unwrap_or_default())
}

/// Creates the user row if missing and moves its stage checkpoint.
/// Appends a registration_log row in the same transaction.
pub fn save_stage(conn: &mut DbConnection, telegram_id: i64, stage: RegistrationStage) -> AppResult<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (telegram_id, registration_stage) VALUES (?1, ?2)
         ON CONFLICT(telegram_id)
         DO UPDATE SET registration_stage = ?2, updated_at = datetime('now')",
        params![telegram_id, stage.to_string()],
    )?;
    tx.execute(
        "INSERT INTO registration_log (telegram_id, stage) VALUES (?1, ?2)",
        params![telegram_id, stage.to_string()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Writes one registration field together with the stage it advances to,
/// in a single transaction, so a crash between the two cannot leave the
/// checkpoint ahead of the data it implies.
pub fn save_field_and_stage(
    conn: &mut DbConnection,
    telegram_id: i64,
    field: UserField<'_>,
    stage: RegistrationStage,
) -> AppResult<()> {
    let (column, value) = field.column_value();
    let tx = conn.transaction()?;
    tx.execute(
        &format!(
            "UPDATE users SET {column} = ?1, registration_stage = ?2, updated_at = datetime('now')
             WHERE telegram_id = ?3"
        ),
        params![value, stage.to_string(), telegram_id],
    )?;
    tx.execute(
        "INSERT INTO registration_log (telegram_id, stage, data) VALUES (?1, ?2, ?3)",
        params![telegram_id, stage.to_string(), value],
    )?;
    tx.commit()?;
    Ok(())
}

/// Registration fields writable through `save_field_and_stage`. A closed
/// set instead of a free column string keeps SQL injection out of the
/// format! above.
#[derive(Debug, Clone, Copy)]
pub enum UserField<'a> {
    Platform(Platform),
    Whatsapp(&'a str),
    PaymentMethod(PaymentMethod),
    PaymentDetails(&'a str),
}

impl UserField<'_> {
    fn column_value(&self) -> (&'static str, String) {
        match self {
            UserField::Platform(p) => ("platform", p.to_string()),
            UserField::Whatsapp(w) => ("whatsapp", (*w).to_string()),
            UserField::PaymentMethod(m) => ("payment_method", m.to_string()),
            UserField::PaymentDetails(d) => ("payment_details", (*d).to_string()),
        }
    }
}

/// Removes the user and every derived history row. Only the explicit,
/// double-confirmed self-service erase calls this.
pub fn delete_user(conn: &mut DbConnection, telegram_id: i64) -> AppResult<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM registration_log WHERE telegram_id = ?1", params![telegram_id])?;
    tx.execute("DELETE FROM sell_orders WHERE telegram_id = ?1", params![telegram_id])?;
    let affected = tx.execute("DELETE FROM users WHERE telegram_id = ?1", params![telegram_id])?;
    tx.commit()?;
    Ok(affected > 0)
}

/// A completed sale request.
#[derive(Debug, Clone)]
pub struct SellOrder {
    pub id: String,
    pub telegram_id: i64,
    pub platform: Platform,
    pub transfer_type: TransferType,
    pub amount: i64,
    pub price: i64,
}

/// Records a completed sale. The id is generated here so callers cannot
/// collide.
pub fn insert_order(
    conn: &DbConnection,
    telegram_id: i64,
    platform: Platform,
    transfer_type: TransferType,
    amount: i64,
    price: i64,
) -> AppResult<SellOrder> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO sell_orders (id, telegram_id, platform, transfer_type, amount, price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            telegram_id,
            platform.to_string(),
            transfer_type.to_string(),
            amount,
            price
        ],
    )?;
    Ok(SellOrder {
        id,
        telegram_id,
        platform,
        transfer_type,
        amount,
        price,
    })
}
