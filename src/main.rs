use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::interval;

use sarraf::core::rate_limiter::RateLimiter;
use sarraf::core::{config, init_logger};
use sarraf::flow::{FlowRuntime, Services};
use sarraf::pricing::PriceLedger;
use sarraf::storage::{backup, create_pool, snapshot};
use sarraf::telegram::{self, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present, before any config
    // statics are first read.
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    log::info!("Starting sarraf (db: {})", config::DATABASE_PATH.as_str());

    let db_pool = create_pool(&config::DATABASE_PATH)?;
    let services = Arc::new(Services {
        ledger: PriceLedger::new(db_pool.clone()),
        db: db_pool,
    });

    let runtime = Arc::new(FlowRuntime::new(
        Arc::clone(&services),
        RateLimiter::default(),
        Some(config::SNAPSHOT_PATH.to_string()),
    )?);

    // Resume users mid-flow from the last snapshot.
    let snap = snapshot::load(&config::SNAPSHOT_PATH);
    if !snap.instances.is_empty() || !snap.buckets.is_empty() {
        log::info!(
            "restoring {} flow instances, {} buckets from snapshot",
            snap.instances.len(),
            snap.buckets.len()
        );
    }
    runtime.restore(snap);

    spawn_backup_job();

    let bot = telegram::create_bot()?;
    if let Err(e) = telegram::setup_bot_commands(&bot).await {
        log::warn!("failed to register bot commands: {}", e);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(telegram::handle_command),
        )
        .branch(Update::filter_message().endpoint(telegram::handle_message))
        .branch(Update::filter_callback_query().endpoint(telegram::handle_callback));

    log::info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&runtime)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Periodic copies of the database and snapshot files, with retention
/// pruning. Runs for the life of the process.
fn spawn_backup_job() {
    tokio::spawn(async {
        let mut ticker = interval(config::backup::interval());
        // The first tick fires immediately; skip it so startup stays fast.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for source in [config::DATABASE_PATH.as_str(), config::SNAPSHOT_PATH.as_str()] {
                if let Err(e) = backup::create_backup(source) {
                    log::error!("backup of {} failed: {}", source, e);
                }
            }
        }
    });
}
