use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use settlement_common::helpers::parse_boolean_flag;
use settlement_engine::{sqlite::db::db_url, PricingPolicy};

use crate::errors::WorkerError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::hours(48);
const DEFAULT_EXPIRY_INTERVAL: StdDuration = StdDuration::from_secs(60);

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// If true, pending migrations are applied before any job runs.
    pub run_migrations: bool,
    /// The time before an unpaid order is cancelled and its stock released.
    pub unpaid_order_timeout: Duration,
    /// How often the expiry job runs.
    pub expiry_interval: StdDuration,
    pub pricing: PricingPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: true,
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            expiry_interval: DEFAULT_EXPIRY_INTERVAL,
            pricing: PricingPolicy::default(),
        }
    }
}

impl WorkerConfig {
    pub fn new(database_url: &str) -> Self {
        Self { database_url: database_url.to_string(), ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let database_url = db_url();
        let max_connections = env::var("SE_DB_MAX_CONNECTIONS")
            .map(|s| {
                s.parse::<u32>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid value for SE_DB_MAX_CONNECTIONS. {e} Using the default, \
                         {DEFAULT_MAX_CONNECTIONS}, instead."
                    );
                    DEFAULT_MAX_CONNECTIONS
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let run_migrations = parse_boolean_flag(env::var("SE_RUN_MIGRATIONS").ok(), true);
        let unpaid_order_timeout = parse_order_timeout(env::var("SE_UNPAID_ORDER_TIMEOUT").ok());
        let expiry_interval = parse_expiry_interval(env::var("SE_EXPIRY_INTERVAL").ok());
        let pricing = PricingPolicy::from_env_or_default();
        Self { database_url, max_connections, run_migrations, unpaid_order_timeout, expiry_interval, pricing }
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.database_url.is_empty() {
            return Err(WorkerError::ConfigurationError("No database URL has been configured".into()));
        }
        if self.max_connections == 0 {
            return Err(WorkerError::ConfigurationError("The connection pool needs at least one connection".into()));
        }
        if self.unpaid_order_timeout <= Duration::zero() {
            return Err(WorkerError::ConfigurationError("The unpaid order timeout must be positive".into()));
        }
        if self.expiry_interval.is_zero() {
            return Err(WorkerError::ConfigurationError("The expiry interval must be positive".into()));
        }
        Ok(())
    }
}

/// Reads a timeout in hours, falling back to the default when the value is missing or malformed.
fn parse_order_timeout(value: Option<String>) -> Duration {
    let Some(s) = value else {
        info!(
            "🪛️ SE_UNPAID_ORDER_TIMEOUT is not set. Using the default value of {} hrs.",
            DEFAULT_UNPAID_ORDER_TIMEOUT.num_hours()
        );
        return DEFAULT_UNPAID_ORDER_TIMEOUT;
    };
    match s.trim().parse::<i64>() {
        Ok(hours) if hours > 0 => Duration::hours(hours),
        Ok(hours) => {
            warn!("🪛️ SE_UNPAID_ORDER_TIMEOUT must be positive, not {hours}. Using the default instead.");
            DEFAULT_UNPAID_ORDER_TIMEOUT
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for SE_UNPAID_ORDER_TIMEOUT. {e}");
            DEFAULT_UNPAID_ORDER_TIMEOUT
        },
    }
}

fn parse_expiry_interval(value: Option<String>) -> StdDuration {
    value
        .and_then(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SE_EXPIRY_INTERVAL. {e}"))
                .ok()
        })
        .filter(|&secs| secs > 0)
        .map(StdDuration::from_secs)
        .unwrap_or(DEFAULT_EXPIRY_INTERVAL)
}
