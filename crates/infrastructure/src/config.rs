use config::{Config, ConfigError, Environment, File};
use domain::{PrintError, UsbId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, `/api/*` requires a matching `x-api-key` header
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// Key rate limiting on `X-Forwarded-For` instead of the peer address.
    /// Only enable behind a reverse proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_rate_limit_requests() -> u32 {
    30
}
fn default_rate_limit_window_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterConfig {
    /// "usb" (default), "file" or "mock"
    #[serde(default = "default_printer_kind")]
    pub kind: String,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    /// Required if kind is "file"
    pub file_path: Option<String>,
    #[serde(default = "default_paper_width")]
    pub paper_width: usize,
}

fn default_printer_kind() -> String {
    "usb".to_string()
}
fn default_paper_width() -> usize {
    48
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            kind: default_printer_kind(),
            vendor_id: None,
            product_id: None,
            file_path: None,
            paper_width: default_paper_width(),
        }
    }
}

impl PrinterConfig {
    /// Configured vendor/product pair. Half a pair is a configuration error.
    pub fn preferred_id(&self) -> Result<Option<UsbId>, PrintError> {
        match (self.vendor_id, self.product_id) {
            (Some(vendor_id), Some(product_id)) => Ok(Some(UsbId::new(vendor_id, product_id))),
            (None, None) => Ok(None),
            _ => Err(PrintError::Configuration(
                "printer.vendor_id and printer.product_id must be set together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReceiptConfig {
    #[serde(default = "default_store_name")]
    pub store_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[serde(default = "default_footer")]
    pub footer: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "RECEIPT BRIDGE".to_string()
}
fn default_footer() -> String {
    "Thank you for your order!".to_string()
}
fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            address: None,
            phone: None,
            footer: default_footer(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrintConfig {
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    #[serde(default = "default_test_timeout_ms")]
    pub test_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_receipt_timeout_ms() -> u64 {
    15_000
}
fn default_test_timeout_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_settle_ms() -> u64 {
    500
}
fn default_shutdown_timeout_ms() -> u64 {
    3_000
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_ms: default_receipt_timeout_ms(),
            test_timeout_ms: default_test_timeout_ms(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            settle_ms: default_settle_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl PrintConfig {
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub receipt: ReceiptConfig,
    #[serde(default)]
    pub print: PrintConfig,
}

impl BridgeConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default settings
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("printer.kind", default_printer_kind())?
            // Local config file, e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Run-mode overrides, e.g. config/production.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. BRIDGE__PRINTER__KIND=file)
            .add_source(Environment::with_prefix("BRIDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
