use crate::core::convert::ZeroTotalPolicy;
use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;

pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub jwt_secret: String,
    pub session_ttl_secs: u64,
    pub balance_cache_ttl_secs: u64,
    pub zero_cost_conversion: ZeroTotalPolicy,
    pub bcrypt_cost: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("balance_cache_ttl_secs", &self.balance_cache_ttl_secs)
            .field("zero_cost_conversion", &self.zero_cost_conversion)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: parsed("PORT", 3000),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()), // Use a secure secret in production
            session_ttl_secs: parsed("SESSION_TTL_SECS", 3600),
            balance_cache_ttl_secs: parsed("BALANCE_CACHE_TTL_SECS", 300),
            zero_cost_conversion: parsed("ZERO_COST_CONVERSION", ZeroTotalPolicy::default()),
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST),
        }
    }
}

// Global static accessible everywhere
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
