use application::printer::PrintService;
use chrono::{DateTime, Utc};
use infrastructure::config::ServerConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::rate_limit::RateLimiter;

pub struct AppState {
    pub print_service: Arc<PrintService>,
    pub rate_limiter: RateLimiter,
    pub api_key: Option<String>,
    pub trust_forwarded_for: bool,
    pub printer_kind: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(print_service: Arc<PrintService>, server: &ServerConfig, printer_kind: &str) -> Self {
        Self {
            print_service,
            rate_limiter: RateLimiter::new(
                server.rate_limit_requests,
                Duration::from_secs(server.rate_limit_window_secs),
            ),
            api_key: server.api_key.clone().filter(|k| !k.is_empty()),
            trust_forwarded_for: server.trust_forwarded_for,
            printer_kind: printer_kind.to_string(),
            started_at: Utc::now(),
        }
    }
}
