use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

const DEFAULT_AUTH_LATENCY: Duration = Duration::from_millis(500);
const DEFAULT_LEDGER_LATENCY: Duration = Duration::from_millis(800);
const DEFAULT_OPENING_BALANCE: i64 = 1000;
const DEFAULT_RECENT_LIMIT: usize = 5;
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config error: {key} has invalid value '{value}'")]
    InvalidValue {
        key: &'static str,
        value: String
    }
}

/// Runtime settings shared by both stores.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Simulated delay before every identity operation.
    pub auth_latency: Duration,
    /// Simulated delay before every ledger mutation.
    pub ledger_latency: Duration,
    /// Balance of the default account opened on first login.
    pub opening_balance: Decimal,
    pub recent_limit: usize,
    pub password_cost: u32,
    pub seed_demo_users: bool,
    /// `None` keeps everything in memory.
    pub store_path: Option<PathBuf>
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_latency: DEFAULT_AUTH_LATENCY,
            ledger_latency: DEFAULT_LEDGER_LATENCY,
            opening_balance: Decimal::from(DEFAULT_OPENING_BALANCE),
            recent_limit: DEFAULT_RECENT_LIMIT,
            password_cost: bcrypt::DEFAULT_COST,
            seed_demo_users: true,
            store_path: None
        }
    }
}

impl Settings {
    /// Builds settings from `BANK_*` environment variables, loading `.env` first.
    ///
    /// Unset variables keep their defaults. `BANK_LATENCY_MS` sets both latencies and
    /// the specific `BANK_AUTH_LATENCY_MS` / `BANK_LEDGER_LATENCY_MS` override it.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut settings = Self::default();

        if let Some(latency) = read_var::<u64>("BANK_LATENCY_MS")? {
            settings = settings.with_latency(Duration::from_millis(latency));
        }
        if let Some(latency) = read_var::<u64>("BANK_AUTH_LATENCY_MS")? {
            settings.auth_latency = Duration::from_millis(latency);
        }
        if let Some(latency) = read_var::<u64>("BANK_LEDGER_LATENCY_MS")? {
            settings.ledger_latency = Duration::from_millis(latency);
        }
        if let Some(balance) = read_var::<Decimal>("BANK_OPENING_BALANCE")? {
            settings = settings.with_opening_balance(balance);
        }
        if let Some(limit) = read_var::<usize>("BANK_RECENT_LIMIT")? {
            settings.recent_limit = limit;
        }
        if let Some(cost) = read_var::<u32>("BANK_PASSWORD_COST")? {
            settings = settings.with_password_cost(cost);
        }
        if let Some(seed) = read_var::<bool>("BANK_SEED_DEMO_USERS")? {
            settings = settings.with_demo_users(seed);
        }
        if let Ok(path) = env::var("BANK_STORE_PATH") {
            if !path.trim().is_empty() {
                settings.store_path = Some(PathBuf::from(path.trim()));
            }
        }

        debug!("Loaded settings: {settings:?}");

        Ok(settings)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.auth_latency = latency;
        self.ledger_latency = latency;
        self
    }

    /// bcrypt accepts costs 4 through 31; values outside are clamped.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost.clamp(4, 31);
        self
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = balance;
        self
    }

    pub fn with_demo_users(mut self, seed: bool) -> Self {
        self.seed_demo_users = seed;
        self
    }
}

fn read_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(None)
    }
}
