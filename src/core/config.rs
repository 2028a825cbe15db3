use once_cell::sync::Lazy;
use std::env;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: sarraf.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "sarraf.sqlite".to_string()));

/// Flow snapshot file path (active flow instances + session buckets,
/// rewritten after every handled event and loaded once at startup)
/// Read from SNAPSHOT_PATH environment variable
/// Default: sessions.json
pub static SNAPSHOT_PATH: Lazy<String> =
    Lazy::new(|| env::var("SNAPSHOT_PATH").unwrap_or_else(|_| "sessions.json".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: sarraf.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "sarraf.log".to_string()));

/// Hardened deployment mode (tighter rate limits)
/// Read from SARRAF_HARDENED environment variable
/// Default: false
pub static HARDENED: Lazy<bool> = Lazy::new(|| {
    env::var("SARRAF_HARDENED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
});

/// Rate limiting configuration
pub mod rate_limit {
    use std::time::Duration;

    /// Sliding window length
    pub const WINDOW_SECS: u64 = 60;

    /// Flow entries allowed per user per window
    pub const MAX_PER_WINDOW: usize = 10;

    /// Allowance in hardened deployments
    pub const MAX_PER_WINDOW_HARDENED: usize = 5;

    pub fn window() -> Duration {
        Duration::from_secs(WINDOW_SECS)
    }

    /// Per-window allowance for the current deployment mode.
    pub fn max_per_window() -> usize {
        if *super::HARDENED {
            MAX_PER_WINDOW_HARDENED
        } else {
            MAX_PER_WINDOW
        }
    }
}

/// Catalog price bounds (EGP per reference quantity)
pub mod price {
    /// Fixed coin quantity catalog prices are quoted against (1M coins)
    pub const REFERENCE_QUANTITY: i64 = 1_000_000;

    /// Lowest accepted price per reference quantity
    pub const MIN_PRICE: i64 = 1_000;

    /// Highest accepted price per reference quantity
    pub const MAX_PRICE: i64 = 50_000;
}

/// Sale amount bounds (coins per order)
pub mod amount {
    pub const MIN_COINS: i64 = 50;
    pub const MAX_COINS: i64 = 20_000;
}

/// Backup job configuration
pub mod backup {
    use std::time::Duration;

    /// Hours between periodic backups of the database and snapshot files
    pub const INTERVAL_HOURS: u64 = 6;

    /// Backups older than this many days are pruned
    pub const RETENTION_DAYS: i64 = 7;

    pub fn interval() -> Duration {
        Duration::from_secs(INTERVAL_HOURS * 3600)
    }
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Check if user is admin
    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }

}
