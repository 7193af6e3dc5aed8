use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub paystack: PaystackConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub payouts: PayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackConfig {
    pub secret_key: String,
    #[serde(default = "default_paystack_base_url")]
    pub base_url: String,
    #[serde(default = "default_paystack_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_paystack_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_paystack_timeout_secs() -> u64 {
    30
}

/// Revenue split policy and the platform's own wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Share of every line item kept by the platform, e.g. 0.10
    pub platform_fee_rate: Decimal,
    pub currency: String,
    pub platform_org_slug: String,
    pub platform_org_name: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: dec!(0.10),
            currency: "KES".to_string(),
            platform_org_slug: "evuka-platform".to_string(),
            platform_org_name: "Evuka Platform".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// Smallest withdrawal accepted, minor units
    pub min_amount: i64,
    pub batch_size: u64,
    pub interval_secs: u64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            min_amount: 10_000,
            batch_size: 20,
            interval_secs: 600,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // no config file: rely entirely on the environment
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    paystack: PaystackConfig {
                        secret_key: get_env("PAYSTACK_SECRET_KEY").unwrap_or_default(),
                        base_url: get_env("PAYSTACK_BASE_URL")
                            .unwrap_or_else(default_paystack_base_url),
                        timeout_secs: get_env_parse(
                            "PAYSTACK_TIMEOUT_SECS",
                            default_paystack_timeout_secs(),
                        ),
                    },
                    ledger: LedgerConfig::default(),
                    payouts: PayoutConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Cannot read config file {config_path}: {e}").into());
            }
        };

        // environment always wins over the file
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("PAYSTACK_SECRET_KEY") {
            config.paystack.secret_key = v;
        }
        if let Ok(v) = env::var("PAYSTACK_BASE_URL") {
            config.paystack.base_url = v;
        }
        if let Ok(v) = env::var("PAYSTACK_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.paystack.timeout_secs = n;
        }

        // Ledger
        if let Ok(v) = env::var("PLATFORM_FEE_RATE")
            && let Ok(rate) = v.parse::<Decimal>()
        {
            config.ledger.platform_fee_rate = rate;
        }
        if let Ok(v) = env::var("LEDGER_CURRENCY") {
            config.ledger.currency = v;
        }
        if let Ok(v) = env::var("PLATFORM_ORG_SLUG") {
            config.ledger.platform_org_slug = v;
        }
        if let Ok(v) = env::var("PLATFORM_ORG_NAME") {
            config.ledger.platform_org_name = v;
        }

        // Payouts
        if let Ok(v) = env::var("PAYOUT_MIN_AMOUNT")
            && let Ok(n) = v.parse()
        {
            config.payouts.min_amount = n;
        }
        if let Ok(v) = env::var("PAYOUT_BATCH_SIZE")
            && let Ok(n) = v.parse()
        {
            config.payouts.batch_size = n;
        }
        if let Ok(v) = env::var("PAYOUT_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.payouts.interval_secs = n;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let rate = self.ledger.platform_fee_rate;
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(format!("platform_fee_rate must be within [0, 1], got {rate}").into());
        }
        if self.payouts.min_amount <= 0 {
            return Err("payouts.min_amount must be positive".into());
        }
        if self.payouts.batch_size == 0 {
            return Err("payouts.batch_size must be at least 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml_uses_ledger_defaults() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/evuka"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 3600

            [paystack]
            secret_key = "sk_test_x"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.ledger.platform_fee_rate, dec!(0.10));
        assert_eq!(config.ledger.currency, "KES");
        assert_eq!(config.paystack.base_url, "https://api.paystack.co");
        assert_eq!(config.payouts.batch_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fee_rate_out_of_range_is_rejected() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/evuka"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 3600

            [paystack]
            secret_key = "sk_test_x"

            [ledger]
            platform_fee_rate = "1.5"
            currency = "KES"
            platform_org_slug = "evuka-platform"
            platform_org_name = "Evuka Platform"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.validate().is_err());
    }
}
