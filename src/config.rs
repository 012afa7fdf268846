use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("either CLERK_JWT_KEY or JWT_SECRET must be set")]
    MissingTokenKey,
}

#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub sender: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// `None` runs the server on the in-memory store.
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub frontend_origin: Option<String>,
    pub clerk_jwt_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub clerk_webhook_secret: Option<String>,
    pub smtp: SmtpConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            port: parse_port(&var, "PORT", 5000)?,
            mongo_uri: var("MONGO_URI"),
            database_name: var("DATABASE_NAME")
                .unwrap_or_else(|| "project_management".to_string()),
            frontend_origin: var("FRONTEND_ORIGIN"),
            clerk_jwt_key: var("CLERK_JWT_KEY"),
            jwt_secret: var("JWT_SECRET"),
            clerk_webhook_secret: var("CLERK_WEBHOOK_SECRET"),
            smtp: SmtpConfig {
                host: var("SMTP_HOST").unwrap_or_else(|| "smtp.ethereal.email".to_string()),
                port: parse_port(&var, "SMTP_PORT", 587)?,
                user: var("SMTP_USER"),
                pass: var("SMTP_PASS"),
                sender: var("SENDER_EMAIL").unwrap_or_else(|| "no-reply@localhost".to_string()),
            },
        };

        if config.clerk_jwt_key.is_none() && config.jwt_secret.is_none() {
            return Err(ConfigError::MissingTokenKey);
        }
        Ok(config)
    }
}

fn parse_port<F>(var: &F, name: &'static str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
