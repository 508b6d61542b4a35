use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_JWT_SECRET: &str = "devsecret";

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub booking: BookingConfig,
    pub admin: Option<AdminSeed>,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

// Без DATABASE_URL сервис работает на хранилище в памяти
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

// Redis нужен только для списка отозванных токенов
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub seats_per_show: i32,
}

/// Account created (or promoted) to admin on startup.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Flat view of the environment, keys are the lowercased variable names.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    host: String,
    port: u16,
    environment: String,
    rust_log: String,
    log_format: String,
    cors_origin: String,
    database_url: Option<String>,
    db_pool_size: u32,
    redis_url: Option<String>,
    jwt_secret: String,
    jwt_expires_in_hours: i64,
    bcrypt_cost: u32,
    seats_per_show: i32,
    admin_name: String,
    admin_email: Option<String>,
    admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Defaults only, the process environment is ignored.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::default().source(Some(Default::default())))
    }

    pub fn from_environment(env: config::Environment) -> Result<Self, ConfigError> {
        let settings: EnvSettings = config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000_i64)?
            .set_default("environment", "development")?
            .set_default("rust_log", "cinema_booking=debug,tower_http=debug")?
            .set_default("log_format", "plain")?
            .set_default("cors_origin", "http://127.0.0.1:5500")?
            .set_default("db_pool_size", 20_i64)?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("jwt_expires_in_hours", 24_i64)?
            .set_default("bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("seats_per_show", 25_i64)?
            .set_default("admin_name", "Administrator")?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.try_into()
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt.secret == DEFAULT_JWT_SECRET
    }
}

impl TryFrom<EnvSettings> for Config {
    type Error = ConfigError;

    fn try_from(s: EnvSettings) -> Result<Self, Self::Error> {
        let log_format = match s.log_format.to_ascii_lowercase().as_str() {
            "plain" | "pretty" | "text" => LogFormat::Plain,
            "json" => LogFormat::Json,
            other => return Err(ConfigError::Invalid(format!("LOG_FORMAT must be plain or json, got {other}"))),
        };
        if s.seats_per_show < 1 {
            return Err(ConfigError::Invalid("SEATS_PER_SHOW must be at least 1".to_string()));
        }
        if s.jwt_expires_in_hours < 1 {
            return Err(ConfigError::Invalid("JWT_EXPIRES_IN_HOURS must be at least 1".to_string()));
        }
        if !(4..=31).contains(&s.bcrypt_cost) {
            return Err(ConfigError::Invalid("BCRYPT_COST must be between 4 and 31".to_string()));
        }
        if s.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("JWT_SECRET must not be empty".to_string()));
        }

        let admin = match (non_empty(s.admin_email), non_empty(s.admin_password)) {
            (Some(email), Some(password)) => Some(AdminSeed { name: s.admin_name, email, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid(
                    "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
                ))
            }
        };

        Ok(Config {
            app: AppConfig {
                host: s.host,
                port: s.port,
                environment: s.environment,
                rust_log: s.rust_log,
                log_format,
                cors_origin: s.cors_origin,
            },
            database: DatabaseConfig {
                url: non_empty(s.database_url),
                pool_size: s.db_pool_size,
            },
            redis: RedisConfig { url: non_empty(s.redis_url) },
            jwt: JwtConfig {
                secret: s.jwt_secret,
                expires_in_hours: s.jwt_expires_in_hours,
                bcrypt_cost: s.bcrypt_cost,
            },
            booking: BookingConfig { seats_per_show: s.seats_per_show },
            admin,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
