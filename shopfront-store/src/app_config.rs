use serde::Deserialize;
use shopfront_core::OrderLimits;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub panel: PanelConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub shop: ShopRules,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    pub receipts: ReceiptConfig,
}

/// File defaults for the shop settings; the `settings` table overrides them
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShopRules {
    pub min_gb: Option<i64>,
    pub max_gb: Option<i64>,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
    pub price_per_gb: Option<i64>,
}

impl ShopRules {
    pub fn limits(&self) -> OrderLimits {
        OrderLimits {
            min_gb: self.min_gb,
            max_gb: self.max_gb,
            min_days: self.min_days,
            max_days: self.max_days,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_panel_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_panel_timeout() -> u64 { 15 }

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Notifications are only logged when unset
    pub bot_token: Option<String>,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    /// Prefix of the subscription link sent on approval, eg. `https://sub.example.com/sub/`
    pub subscription_base_url: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api(),
            subscription_base_url: None,
        }
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvisioningConfig {
    #[serde(default = "default_provisioning_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self { timeout_seconds: default_provisioning_timeout() }
    }
}

fn default_provisioning_timeout() -> u64 { 30 }

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { timeout_seconds: default_notification_timeout() }
    }
}

fn default_notification_timeout() -> u64 { 10 }

#[derive(Debug, Deserialize, Clone)]
pub struct ReceiptConfig {
    pub root: String,
    #[serde(default = "default_receipt_max_bytes")]
    pub max_bytes: usize,
}

fn default_receipt_max_bytes() -> usize { 10 * 1024 * 1024 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides, 'development' when RUN_MODE is unset
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `SHOPFRONT_PANEL__PASSWORD=secret` sets `panel.password`
            .add_source(config::Environment::with_prefix("SHOPFRONT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
