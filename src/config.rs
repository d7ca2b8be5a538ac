//! Service configuration loaded from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | DATABASE_URL | unset: in-memory stores |
//! | DATABASE_MAX_CONNECTIONS | 10 |
//! | PORT | 8083 |
//! | NATS_URL | unset: notifications are logged |
//! | NATS_SUBJECT_PREFIX | marketplace.merchant |
//! | FLAT_SHIPPING_RATE | 5.99 |
//! | FREE_SHIPPING_THRESHOLD | unset |
//! | TAX_RATE | 0.085 |
//! | CURRENCY | USD |
//! | DEFAULT_PAGE_LIMIT | 20 |
//! | MAX_PAGE_LIMIT | 100 |

use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    pub nats_subject_prefix: String,
    pub flat_shipping_rate: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub tax_rate: Decimal,
    pub currency: String,
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            port: 8083,
            nats_url: None,
            nats_subject_prefix: "marketplace.merchant".into(),
            flat_shipping_rate: Decimal::new(599, 2),
            free_shipping_threshold: None,
            tax_rate: Decimal::new(85, 3),
            currency: "USD".into(),
            default_page_limit: 20,
            max_page_limit: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let config = Self {
            database_url: text("DATABASE_URL"),
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            nats_url: text("NATS_URL"),
            nats_subject_prefix: text("NATS_SUBJECT_PREFIX").unwrap_or(defaults.nats_subject_prefix),
            flat_shipping_rate: parse(&lookup, "FLAT_SHIPPING_RATE")?.unwrap_or(defaults.flat_shipping_rate),
            free_shipping_threshold: parse(&lookup, "FREE_SHIPPING_THRESHOLD")?,
            tax_rate: parse(&lookup, "TAX_RATE")?.unwrap_or(defaults.tax_rate),
            currency: text("CURRENCY").unwrap_or(defaults.currency),
            default_page_limit: parse(&lookup, "DEFAULT_PAGE_LIMIT")?.unwrap_or(defaults.default_page_limit),
            max_page_limit: parse(&lookup, "MAX_PAGE_LIMIT")?.unwrap_or(defaults.max_page_limit),
        };
        if config.max_page_limit == 0 {
            return Err(ConfigError::Invalid { key: "MAX_PAGE_LIMIT", value: "0".into() });
        }
        if config.flat_shipping_rate < Decimal::ZERO {
            return Err(ConfigError::Invalid { key: "FLAT_SHIPPING_RATE", value: config.flat_shipping_rate.to_string() });
        }
        if config.tax_rate < Decimal::ZERO {
            return Err(ConfigError::Invalid { key: "TAX_RATE", value: config.tax_rate.to_string() });
        }
        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
