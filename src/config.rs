use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Where market state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!(
                "Invalid STORAGE_BACKEND: {}. Must be one of: [\"postgres\", \"memory\"]",
                s
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Trading parameters
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Balance credited to newly created accounts
    pub starting_balance: Decimal,
    /// Share supply issued for a player when none is given
    pub default_total_shares: i64,
    /// Cap = base price × this
    pub cap_multiplier: Decimal,
    /// Floor = base price × this
    pub floor_multiplier: Decimal,
    /// How many times a trade is re-run after a write conflict
    pub commit_retries: u32,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    /// Present when `storage` is Postgres
    pub database: Option<DatabaseConfig>,
    pub market: MarketConfig,
    pub log_level: String,
    pub log_format: LogFormat,
    pub http_port: u16,
    pub ws_port: Option<u16>,
    pub audit_log_dir: Option<PathBuf>,
    pub environment: String,
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, String> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("Invalid {}: {}", key, raw)),
        None => Ok(default),
    }
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create database config from an arbitrary variable source
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let url = lookup("DATABASE_URL")
            .ok_or("DATABASE_URL environment variable is required")?;

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;
        let acquire_timeout_secs = parse_or(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        let idle_timeout_secs = parse_or(&lookup, "DATABASE_IDLE_TIMEOUT_SECS", 600u64)?; // 10 minutes
        let max_lifetime_secs = parse_or(&lookup, "DATABASE_MAX_LIFETIME_SECS", 1800u64)?; // 30 minutes
        let test_before_acquire = parse_or(&lookup, "DATABASE_TEST_BEFORE_ACQUIRE", true)?;

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/footy_exchange".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl MarketConfig {
    fn from_vars(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();

        let starting_balance = parse_or(lookup, "STARTING_BALANCE", defaults.starting_balance)?;
        let commit_retries = parse_or(lookup, "TRADE_COMMIT_RETRIES", defaults.commit_retries)?;

        if starting_balance < Decimal::ZERO {
            return Err("STARTING_BALANCE must not be negative".to_string());
        }

        Ok(Self {
            starting_balance,
            commit_retries,
            ..defaults
        })
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::new(10_000, 0),
            default_total_shares: 1000,
            cap_multiplier: Decimal::new(2, 0),
            floor_multiplier: Decimal::new(5, 1),
            commit_retries: 3,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create application config from an arbitrary variable source
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let storage = StorageBackend::from_str(
            &lookup("STORAGE_BACKEND").unwrap_or_else(|| "postgres".to_string()),
        )?;

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig::from_vars(&lookup)?),
            StorageBackend::Memory => None,
        };

        let market = MarketConfig::from_vars(&lookup)?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(format!("Invalid LOG_FORMAT: {}", other)),
        };

        let http_port = parse_or(&lookup, "HTTP_PORT", 8080u16)?;

        let ws_port = match lookup("WS_PORT") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid WS_PORT: {}", raw))?,
            ),
            None => None,
        };

        let audit_log_dir = lookup("AUDIT_LOG_DIR").map(PathBuf::from);

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        if ws_port == Some(http_port) {
            return Err("WS_PORT must differ from HTTP_PORT".to_string());
        }

        Ok(Self {
            storage,
            database,
            market,
            log_level: log_level.to_lowercase(),
            log_format,
            http_port,
            ws_port,
            audit_log_dir,
            environment: environment.to_lowercase(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database: None,
            market: MarketConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            http_port: 8080,
            ws_port: None,
            audit_log_dir: None,
            environment: "development".to_string(),
        }
    }
}
