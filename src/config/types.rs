//! Configuration types

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::chain::types::ExpirationFilter;
use crate::common::types::{OrderType, TimeInForce};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Broker login and account selection
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Quote/Greeks collection behaviour
    #[serde(default)]
    pub streaming: StreamingSettings,
    /// Order construction defaults
    #[serde(default)]
    pub orders: OrderSettings,
    /// Portfolio analytics settings
    #[serde(default)]
    pub portfolio: PortfolioSettings,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Broker login configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Account number orders are placed in
    #[serde(default)]
    pub account_number: Option<String>,
}

impl BrokerConfig {
    /// Credentials, if both username and password are configured
    pub fn credentials(&self) -> Option<ApiCredentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Some(ApiCredentials::new(username.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("account_number", &self.account_number)
            .finish()
    }
}

/// Quote/Greeks aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingSettings {
    /// How long one collection attempt waits for every symbol
    #[serde(default = "default_stream_timeout")]
    pub timeout_ms: u64,
    /// Attempts before the last failure is surfaced
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl StreamingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_stream_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_stream_timeout() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

/// Order construction defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    /// Used when a signal does not name an order type
    #[serde(default = "default_order_type")]
    pub default_order_type: OrderType,
    #[serde(default = "default_time_in_force")]
    pub time_in_force: TimeInForce,
    /// Restricts the days-to-expiration search
    #[serde(default)]
    pub expiration_filter: ExpirationFilter,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            default_order_type: default_order_type(),
            time_in_force: default_time_in_force(),
            expiration_filter: ExpirationFilter::default(),
        }
    }
}

fn default_order_type() -> OrderType {
    OrderType::Market
}

fn default_time_in_force() -> TimeInForce {
    TimeInForce::Day
}

/// Portfolio analytics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSettings {
    /// Benchmark for beta weighting
    #[serde(default = "default_benchmark_symbol")]
    pub benchmark_symbol: String,
    /// Beta-weighted delta the portfolio aims for
    #[serde(default)]
    pub delta_target: Decimal,
    /// Allowed distance from `delta_target` before warning
    #[serde(default = "default_delta_variation")]
    pub delta_variation: Decimal,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            benchmark_symbol: default_benchmark_symbol(),
            delta_target: Decimal::ZERO,
            delta_variation: default_delta_variation(),
        }
    }
}

fn default_benchmark_symbol() -> String {
    "SPY".to_string()
}

fn default_delta_variation() -> Decimal {
    Decimal::from(5)
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Broker login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

impl ApiCredentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
