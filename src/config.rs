/*
 * Responsibility
 * - 環境変数の読み込み (JWT_SECRET, TTL, password encoding id, skip paths など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::security::StrategyMode;
use crate::services::auth::jwt::{MAX_LEEWAY_SECONDS, MAX_TTL_SECONDS, MIN_SECRET_LENGTH};
use crate::services::password::factory::{ARGON2_ID, BCRYPT_ID, NOOP_ID, SCRYPT_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One `SEED_USERS` entry: `name:password[:ROLE_A|ROLE_B]`.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub authorities: Vec<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("authorities", &self.authorities)
            .finish_non_exhaustive()
    }
}

impl FromStr for SeedUser {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let username = parts.next().unwrap_or_default().trim();
        let password = parts.next().ok_or(ConfigError::Invalid("SEED_USERS"))?;
        if username.is_empty() || password.is_empty() {
            return Err(ConfigError::Invalid("SEED_USERS"));
        }
        let authorities = parts
            .next()
            .unwrap_or_default()
            .split('|')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            authorities,
        })
    }
}

pub const DEFAULT_SKIP_PATHS: &str = "^/health$,^/api/v1/token$";

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub jwt_secret: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub access_token_leeway_seconds: u64,

    pub password_encoding_id: String,
    pub ott_ttl_seconds: u64,
    pub security_context_strategy: StrategyMode,
    pub skip_paths: Vec<String>,
    pub hide_user_not_found: bool,
    pub seed_users: Vec<SeedUser>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("password_encoding_id", &self.password_encoding_id)
            .field("security_context_strategy", &self.security_context_strategy)
            .field("skip_paths", &self.skip_paths)
            .finish_non_exhaustive()
    }
}

/// Default only when unset; a value that is set must parse.
fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_or(key, std::env::var(key).ok(), default)
}

fn at_most(key: &'static str, value: u64, max: u64) -> Result<u64, ConfigError> {
    if value > max {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}

fn seconds_or(key: &'static str, default: u64, max: u64) -> Result<u64, ConfigError> {
    at_most(key, env_or(key, default)?, max)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = env_or("AUTH_PORT", 4000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("AUTH_PORT"))?;

        let app_env = AppEnv::from_env();

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid("JWT_SECRET"));
        }

        let password_encoding_id =
            std::env::var("PASSWORD_ENCODING_ID").unwrap_or_else(|_| ARGON2_ID.to_string());
        if ![ARGON2_ID, BCRYPT_ID, SCRYPT_ID, NOOP_ID].contains(&password_encoding_id.as_str()) {
            return Err(ConfigError::Invalid("PASSWORD_ENCODING_ID"));
        }

        let security_context_strategy = match std::env::var("SECURITY_CONTEXT_STRATEGY") {
            Ok(v) => v
                .parse::<StrategyMode>()
                .map_err(|_| ConfigError::Invalid("SECURITY_CONTEXT_STRATEGY"))?,
            Err(_) => StrategyMode::default(),
        };

        let skip_paths = split_list(
            &std::env::var("AUTH_SKIP_PATHS").unwrap_or_else(|_| DEFAULT_SKIP_PATHS.to_string()),
        )
        .map(str::to_string)
        .collect();

        let seed_users = split_list(&std::env::var("SEED_USERS").unwrap_or_default())
            .map(SeedUser::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            addr,
            app_env,
            jwt_secret,
            access_token_ttl_seconds: seconds_or(
                "ACCESS_TOKEN_TTL_SECONDS",
                600,
                MAX_TTL_SECONDS,
            )?,
            refresh_token_ttl_seconds: seconds_or(
                "REFRESH_TOKEN_TTL_SECONDS",
                2_592_000,
                MAX_TTL_SECONDS,
            )?,
            access_token_leeway_seconds: seconds_or(
                "ACCESS_TOKEN_LEEWAY_SECONDS",
                60,
                MAX_LEEWAY_SECONDS,
            )?,
            password_encoding_id,
            ott_ttl_seconds: seconds_or("OTT_TTL_SECONDS", 300, MAX_TTL_SECONDS)?,
            security_context_strategy,
            skip_paths,
            hide_user_not_found: env_or("HIDE_USER_NOT_FOUND", true)?,
            seed_users,
        })
    }
}
