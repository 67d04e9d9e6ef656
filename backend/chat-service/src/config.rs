use crate::error::AppError;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// How access tokens are verified.
#[derive(Debug, Clone)]
pub enum JwtKey {
    /// HS256 shared secret
    Secret(String),
    /// RS256 public key in PEM form
    PublicKeyPem(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_key: JwtKey,
    pub auth_cookie_name: String,
    pub message_page_size: i64,
    pub message_page_size_max: i64,
    pub ws_heartbeat_interval: Duration,
    pub ws_client_timeout: Duration,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
        match env::var(key) {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{key} is not valid: {raw}"))),
            _ => Ok(default),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;

        let jwt_key = match (env::var("JWT_SECRET"), env::var("JWT_PUBLIC_KEY_PEM")) {
            (_, Ok(pem)) if !pem.trim().is_empty() => JwtKey::PublicKeyPem(pem),
            (Ok(secret), _) if !secret.is_empty() => JwtKey::Secret(secret),
            _ => {
                return Err(AppError::Config(
                    "one of JWT_SECRET or JWT_PUBLIC_KEY_PEM must be set".into(),
                ))
            }
        };

        let message_page_size = Self::parse_or("MESSAGE_PAGE_SIZE", 50i64)?;
        let message_page_size_max = Self::parse_or("MESSAGE_PAGE_SIZE_MAX", 100i64)?;
        if message_page_size < 1 || message_page_size_max < message_page_size {
            return Err(AppError::Config(
                "MESSAGE_PAGE_SIZE must be >= 1 and <= MESSAGE_PAGE_SIZE_MAX".into(),
            ));
        }

        let ws_heartbeat_interval =
            Duration::from_secs(Self::parse_or("WS_HEARTBEAT_INTERVAL_SECS", 5u64)?);
        let ws_client_timeout = Duration::from_secs(Self::parse_or("WS_CLIENT_TIMEOUT_SECS", 30u64)?);
        if ws_client_timeout <= ws_heartbeat_interval {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_INTERVAL_SECS".into(),
            ));
        }

        Ok(Self {
            database_url,
            db_max_connections: Self::parse_or("DB_MAX_CONNECTIONS", 20u32)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: Self::parse_or("PORT", 5000u16)?,
            jwt_key,
            auth_cookie_name: env::var("AUTH_COOKIE_NAME").unwrap_or_else(|_| "token".into()),
            message_page_size,
            message_page_size_max,
            ws_heartbeat_interval,
            ws_client_timeout,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| Self::parse_list(&v))
                .unwrap_or_default(),
        })
    }

    /// Configuration for tests: HS256 with a fixed secret and no database.
    pub fn test_defaults() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            jwt_key: JwtKey::Secret("test-secret".into()),
            auth_cookie_name: "token".into(),
            message_page_size: 50,
            message_page_size_max: 100,
            ws_heartbeat_interval: Duration::from_secs(5),
            ws_client_timeout: Duration::from_secs(30),
            cors_allowed_origins: Vec::new(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
