use crate::store::LedgerSettings;
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    /// Unset means the in-memory backend (useful for local runs and CI).
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,

    /// Days granted per (user, leave type) before any request.
    pub initial_allotment_days: i64,
    /// Optional ceiling applied when a cancellation restores days.
    pub annual_cap_days: Option<i64>,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").ok(),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            initial_allotment_days: env::var("INITIAL_ALLOTMENT_DAYS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .expect("INITIAL_ALLOTMENT_DAYS must be an integer"),
            annual_cap_days: env::var("ANNUAL_CAP_DAYS")
                .ok()
                .map(|v| v.parse().expect("ANNUAL_CAP_DAYS must be an integer")),

            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("RATE_PROTECTED_PER_MIN must be an integer"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            initial_allotment: self.initial_allotment_days,
            annual_cap: self.annual_cap_days,
        }
    }
}
