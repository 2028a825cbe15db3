//! Sarraf - Telegram bot for selling FC in-game coins
//!
//! This library provides the bot's core functionality: conversation flow
//! orchestration, the priced catalog with its serialized update path,
//! SQLite persistence with durable flow snapshots, and the Telegram
//! binding.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, rate limiting, validation
//! - `flow`: flow engine, session buckets, claim tags, recovery routing
//! - `pricing`: the price ledger and its audit trail
//! - `storage`: database pool, migrations, snapshots, backups
//! - `telegram`: teloxide integration and handlers

pub mod core;
pub mod flow;
pub mod pricing;
pub mod storage;
pub mod telegram;
pub mod texts;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use crate::flow::{FlowRuntime, InboundEvent, Reply, Services};
pub use crate::pricing::PriceLedger;
pub use crate::storage::{create_pool, get_connection, DbConnection, DbPool};
