//! Serialized price catalog store
//!
//! The catalog holds one price per (platform, transfer type) at the fixed
//! reference quantity. Updates are the single operation in the process
//! that requires cross-user exclusion: a mutex is held for the entire
//! read-validate-write-audit sequence, and the price write plus its audit
//! row commit in one SQLite transaction — a crash can lose both, never
//! one. Reads go straight to the pool; a single SELECT observes a
//! consistent snapshot and never a half-written price.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::sync::Mutex;

use crate::core::config::price::REFERENCE_QUANTITY;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{Platform, TransferType};
use crate::core::validation::check_price_bounds;
use crate::storage::db::DbPool;

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub platform: Platform,
    pub transfer_type: TransferType,
    pub amount: i64,
    pub price: i64,
    pub updated_at: String,
}

/// Result of a successful update, for caller messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceUpdate {
    pub old_price: Option<i64>,
    pub new_price: i64,
}

pub struct PriceLedger {
    pool: DbPool,
    /// Exclusion mechanism for the whole update sequence. The underlying
    /// store does not tolerate concurrent writers, so updates on
    /// *different* catalog keys still serialize here.
    write_lock: Mutex<()>,
}

impl PriceLedger {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Current price for a catalog key, `None` when the key is missing.
    pub fn read(&self, platform: Platform, transfer_type: TransferType) -> AppResult<Option<i64>> {
        let conn = self.pool.get()?;
        let price = conn
            .query_row(
                "SELECT price FROM coin_prices
                 WHERE platform = ?1 AND transfer_type = ?2 AND amount = ?3",
                params![platform.to_string(), transfer_type.to_string(), REFERENCE_QUANTITY],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(price)
    }

    /// Whole catalog, ordered for display.
    pub fn all(&self) -> AppResult<Vec<PriceEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT platform, transfer_type, amount, price, updated_at
             FROM coin_prices ORDER BY platform, transfer_type, amount",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (platform, transfer_type, amount, price, updated_at) = row?;
            // Rows with vocabulary this build does not know are skipped,
            // not fatal: the admin panel should keep rendering.
            let (Ok(platform), Ok(transfer_type)) = (platform.parse(), transfer_type.parse()) else {
                continue;
            };
            entries.push(PriceEntry {
                platform,
                transfer_type,
                amount,
                price,
                updated_at,
            });
        }
        Ok(entries)
    }

    /// Replaces the price for a catalog key and appends an audit record in
    /// the same transaction.
    ///
    /// Out-of-bounds prices are rejected before any storage is touched and
    /// come back as `AppError::Validation`; storage failures come back as
    /// `AppError::Database`/`DatabasePool` — callers rely on that split
    /// for messaging. Platform and transfer type are enum-typed, so an
    /// out-of-vocabulary key is unrepresentable.
    pub fn update(
        &self,
        platform: Platform,
        transfer_type: TransferType,
        new_price: i64,
        admin_id: i64,
    ) -> AppResult<PriceUpdate> {
        check_price_bounds(new_price).map_err(|e| AppError::Validation(e.to_string()))?;

        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            // A poisoned lock means another update panicked after its
            // transaction already committed or rolled back; the store
            // itself is consistent either way.
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let old_price = tx
            .query_row(
                "SELECT price FROM coin_prices
                 WHERE platform = ?1 AND transfer_type = ?2 AND amount = ?3",
                params![platform.to_string(), transfer_type.to_string(), REFERENCE_QUANTITY],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        tx.execute(
            "INSERT INTO coin_prices (platform, transfer_type, amount, price, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(platform, transfer_type, amount)
             DO UPDATE SET price = ?4, updated_at = ?5",
            params![
                platform.to_string(),
                transfer_type.to_string(),
                REFERENCE_QUANTITY,
                new_price,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.execute(
            "INSERT INTO price_audit_log (admin_id, platform, transfer_type, old_price, new_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                admin_id,
                platform.to_string(),
                transfer_type.to_string(),
                old_price,
                new_price
            ],
        )?;

        tx.commit()?;

        log::info!(
            "price updated by admin {}: {} {} {:?} -> {}",
            admin_id,
            platform,
            transfer_type,
            old_price,
            new_price
        );

        Ok(PriceUpdate { old_price, new_price })
    }

    /// Quotes a sale: `amount` coins at the catalog price per reference
    /// quantity, rounded down.
    pub fn quote(&self, platform: Platform, transfer_type: TransferType, amount: i64) -> AppResult<Option<i64>> {
        Ok(self
            .read(platform, transfer_type)?
            .map(|per_reference| amount.saturating_mul(per_reference) / REFERENCE_QUANTITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::create_test_pool;

    fn ledger() -> PriceLedger {
        PriceLedger::new(create_test_pool().unwrap())
    }

    #[test]
    fn test_seeded_catalog_reads() {
        let ledger = ledger();
        assert_eq!(
            ledger.read(Platform::Playstation, TransferType::Normal).unwrap(),
            Some(5600)
        );
        assert_eq!(ledger.read(Platform::Pc, TransferType::Instant).unwrap(), Some(5800));
        assert_eq!(ledger.all().unwrap().len(), 6);
    }

    #[test]
    fn test_update_appends_exactly_one_audit_record() {
        let ledger = ledger();
        let update = ledger
            .update(Platform::Playstation, TransferType::Normal, 5500, 99)
            .unwrap();
        assert_eq!(update.old_price, Some(5600));
        assert_eq!(update.new_price, 5500);
        assert_eq!(
            ledger.read(Platform::Playstation, TransferType::Normal).unwrap(),
            Some(5500)
        );

        let conn = ledger.pool.get().unwrap();
        let (count, old, new): (i64, Option<i64>, i64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(old_price), MAX(new_price) FROM price_audit_log",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((count, old, new), (1, Some(5600), 5500));
    }

    #[test]
    fn test_out_of_bounds_price_leaves_storage_unchanged() {
        let ledger = ledger();

        for bad in [500, 50_001] {
            let err = ledger
                .update(Platform::Playstation, TransferType::Normal, bad, 99)
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "price {} must be rejected", bad);
        }

        // Prior value intact, no audit rows written
        assert_eq!(
            ledger.read(Platform::Playstation, TransferType::Normal).unwrap(),
            Some(5600)
        );
        let conn = ledger.pool.get().unwrap();
        let audits: i64 = conn
            .query_row("SELECT COUNT(*) FROM price_audit_log", [], |r| r.get(0))
            .unwrap();
        assert_eq!(audits, 0);
    }

    #[test]
    fn test_quote_scales_reference_price() {
        let ledger = ledger();
        // 5600 per 1M -> 1000 coins = 5 (rounded down)
        assert_eq!(
            ledger.quote(Platform::Playstation, TransferType::Normal, 1000).unwrap(),
            Some(5)
        );
        assert_eq!(
            ledger.quote(Platform::Pc, TransferType::Normal, 20_000).unwrap(),
            Some(122)
        );
    }
}
