//! Configuration for services, webhooks, payments and logging
//!
//! Loaded from a TOML or JSON file, then overridden by `JINAH_*` environment
//! variables (a `.env` file is read first when present).

use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use crate::types::ContentType;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "JINAH";

fn secret_opt<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::new(s.into())))
}

/// Deployment environment selecting the provider base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" | "sandbox" => Some(Self::Development),
            "production" | "prod" | "live" => Some(Self::Production),
            _ => None,
        }
    }
}

/// One channel entry of the meta service routing table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelRoute {
    /// Service that handles the channel
    pub service: String,
    /// Channel code sent to that service
    pub code: String,
    /// Rendering kind; inferred from `code` when absent
    #[serde(default)]
    pub kind: Option<ContentType>,
}

impl ChannelRoute {
    /// Create a route
    pub fn new(service: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            code: code.into(),
            kind: None,
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

/// Settings for one payment service
#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    /// Adapter to build; defaults to the section name
    #[serde(default)]
    pub driver: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub development_url: Option<String>,
    #[serde(default)]
    pub production_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "secret_opt")]
    pub client_secret: Option<SecretString>,
    /// Seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    /// Total attempts per request
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * retry_delay_ms`
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Channel routing table (meta service only)
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelRoute>,
    /// Service used for status checks of orders without a recorded route
    #[serde(default)]
    pub fallback_service: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            driver: None,
            name: None,
            development_url: None,
            production_url: None,
            client_id: None,
            client_secret: None,
            connect_timeout: default_connect_timeout(),
            timeout: default_timeout(),
            verify_ssl: true,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            channels: BTreeMap::new(),
            fallback_service: None,
        }
    }
}

impl ServiceConfig {
    /// Base URL for an environment
    pub fn base_url(&self, environment: Environment) -> Option<&str> {
        let url = match environment {
            Environment::Production => self.production_url.as_deref(),
            Environment::Development => self.development_url.as_deref(),
        };
        url.filter(|u| !u.is_empty())
    }
}

/// Settings shared by every webhook service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookGlobalSettings {
    #[serde(default)]
    pub verify_signature: Option<bool>,
    /// Comma-separated IPs and CIDR blocks
    #[serde(default)]
    pub ip_whitelist: Option<String>,
}

/// Webhook security for one service
#[derive(Debug, Default, Deserialize)]
pub struct WebhookServiceSettings {
    /// Shared secret (FinPay and generic services)
    #[serde(default, deserialize_with = "secret_opt")]
    pub secret: Option<SecretString>,
    /// Stripe endpoint secret
    #[serde(default, deserialize_with = "secret_opt")]
    pub endpoint_secret: Option<SecretString>,
    /// Midtrans server key
    #[serde(default, deserialize_with = "secret_opt")]
    pub server_key: Option<SecretString>,
    #[serde(default)]
    pub verify_signature: Option<bool>,
    #[serde(default)]
    pub ip_whitelist: Option<String>,
}

fn default_route_prefix() -> String {
    "payment-webhook".to_string()
}

fn default_webhook_service() -> String {
    "finpay".to_string()
}

/// Inbound webhook settings
#[derive(Debug, Deserialize)]
pub struct WebhookSettings {
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// Service assumed when nothing in a request identifies one
    #[serde(default = "default_webhook_service")]
    pub default_service: String,
    #[serde(default)]
    pub global: WebhookGlobalSettings,
    /// Per-service sections keyed by service name
    #[serde(flatten)]
    pub services: BTreeMap<String, WebhookServiceSettings>,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        for name in ["finpay", "stripe", "midtrans"] {
            services.insert(name.to_string(), WebhookServiceSettings::default());
        }
        Self {
            route_prefix: default_route_prefix(),
            default_service: default_webhook_service(),
            global: WebhookGlobalSettings::default(),
            services,
        }
    }
}

impl WebhookSettings {
    /// Section for a service
    pub fn service(&self, name: &str) -> Option<&WebhookServiceSettings> {
        self.services.get(name)
    }

    fn service_mut(&mut self, name: &str) -> &mut WebhookServiceSettings {
        self.services.entry(name.to_string()).or_default()
    }
}

/// Payment defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentSettings {
    #[serde(default)]
    pub default_currency: Currency,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log provider request and response bodies
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_service_name() -> String {
    "jinah".to_string()
}

fn default_app_url() -> String {
    "http://localhost:8000".to_string()
}

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct JinahConfig {
    /// Service resolved when a caller names none
    #[serde(default = "default_service_name")]
    pub default_service: String,
    #[serde(default)]
    pub environment: Environment,
    /// Public base URL of this application
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    #[serde(default)]
    pub webhook: WebhookSettings,
    #[serde(default)]
    pub payment: PaymentSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Channels the default meta service routes to FinPay
pub const DEFAULT_CHANNELS: [&str; 6] = ["cc", "qris", "vabca", "vabni", "vamandiri", "vabri"];

impl Default for JinahConfig {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            "finpay".to_string(),
            ServiceConfig {
                driver: Some("finpay".to_string()),
                name: Some("FinPay".to_string()),
                development_url: Some("https://devo.finnet.co.id".to_string()),
                production_url: Some("https://live.finnet.co.id".to_string()),
                ..ServiceConfig::default()
            },
        );
        services.insert(
            "jinah".to_string(),
            ServiceConfig {
                driver: Some("jinah".to_string()),
                name: Some("Jinah".to_string()),
                channels: DEFAULT_CHANNELS
                    .iter()
                    .map(|c| (c.to_string(), ChannelRoute::new("finpay", *c)))
                    .collect(),
                fallback_service: Some("finpay".to_string()),
                ..ServiceConfig::default()
            },
        );

        Self {
            default_service: default_service_name(),
            environment: Environment::default(),
            app_url: default_app_url(),
            services,
            webhook: WebhookSettings::default(),
            payment: PaymentSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl JinahConfig {
    /// Load a TOML or JSON file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> PaymentResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PaymentError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) {
            Some(ext) if ext == "toml" => Self::from_toml_str(&content),
            Some(ext) if ext == "json" => Self::from_json_str(&content),
            Some(ext) => Err(PaymentError::Configuration(format!(
                "Unsupported format: {}",
                ext
            ))),
            None => Err(PaymentError::Configuration(
                "No file extension found".to_string(),
            )),
        }
    }

    /// Parse TOML
    pub fn from_toml_str(content: &str) -> PaymentResult<Self> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("TOML parse error: {}", e)))?;
        let json = serde_json::to_value(toml_value)?;
        Self::from_value(json)
    }

    /// Parse JSON
    pub fn from_json_str(content: &str) -> PaymentResult<Self> {
        let json: Value = serde_json::from_str(content)
            .map_err(|e| PaymentError::Configuration(format!("JSON parse error: {}", e)))?;
        Self::from_value(json)
    }

    fn from_value(value: Value) -> PaymentResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| PaymentError::Configuration(format!("Invalid configuration: {}", e)))
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// File (when given) overridden by the environment
    pub fn load(path: Option<&Path>) -> PaymentResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `JINAH_*` overrides
    pub fn apply_env(&mut self) {
        dotenvy::dotenv().ok();

        if let Some(v) = env_var("DEFAULT_SERVICE") {
            self.default_service = v;
        }
        if let Some(v) = env_var("ENVIRONMENT").and_then(|v| Environment::parse(&v)) {
            self.environment = v;
        }
        if let Some(v) = env_var("APP_URL") {
            self.app_url = v;
        }
        if let Some(v) = env_var("FINPAY_CLIENT_ID") {
            self.services.entry("finpay".to_string()).or_default().client_id = Some(v);
        }
        if let Some(v) = env_var("FINPAY_CLIENT_SECRET") {
            self.services.entry("finpay".to_string()).or_default().client_secret =
                Some(SecretString::new(v.into()));
        }
        if let Some(v) = env_var("FINPAY_WEBHOOK_SECRET") {
            self.webhook.service_mut("finpay").secret = Some(SecretString::new(v.into()));
        }
        if let Some(v) = env_var("STRIPE_ENDPOINT_SECRET") {
            self.webhook.service_mut("stripe").endpoint_secret = Some(SecretString::new(v.into()));
        }
        if let Some(v) = env_var("MIDTRANS_SERVER_KEY") {
            self.webhook.service_mut("midtrans").server_key = Some(SecretString::new(v.into()));
        }
        if let Some(v) = env_var("WEBHOOK_IP_WHITELIST") {
            self.webhook.global.ip_whitelist = Some(v);
        }
        if let Some(v) = env_var("WEBHOOK_VERIFY_SIGNATURE").and_then(|v| parse_bool(&v)) {
            self.webhook.global.verify_signature = Some(v);
        }
        if let Some(v) = env_var("LOG_ENABLED").and_then(|v| parse_bool(&v)) {
            self.logging.enabled = v;
        }
        if let Some(v) = env_var("LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Section for a payment service
    pub fn service(&self, name: &str) -> PaymentResult<&ServiceConfig> {
        self.services.get(name).ok_or_else(|| {
            PaymentError::Configuration(format!("Service '{}' is not configured", name))
        })
    }

    /// Whether a service section exists
    pub fn has_service(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(format!("{}_{}", ENV_PREFIX, key))
        .ok()
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
