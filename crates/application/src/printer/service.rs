use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use domain::{InitializationState, OrderData, PrintError, PrintOutcome};

use super::executor::PrintExecutor;
use super::formatter::ReceiptFormatter;
use super::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::connection::{ConnectionManager, DeviceHandle};

/// Timing knobs for the print pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintSettings {
    pub receipt_timeout: Duration,
    pub test_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub settle_delay: Duration,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(15),
            test_timeout: Duration::from_secs(10),
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Entry point used by the HTTP layer: formatting, retries and the
/// connection lifecycle behind four calls.
pub struct PrintService {
    manager: Arc<ConnectionManager>,
    executor: PrintExecutor,
    retry: RetryPolicy,
    formatter: ReceiptFormatter,
    settings: PrintSettings,
}

impl PrintService {
    pub fn new(
        manager: Arc<ConnectionManager>,
        formatter: ReceiptFormatter,
        settings: PrintSettings,
    ) -> Self {
        Self {
            executor: PrintExecutor::new(manager.clone(), settings.settle_delay),
            retry: RetryPolicy::new(manager.clone(), settings.base_delay),
            manager,
            formatter,
            settings,
        }
    }

    /// Format and print an order, retrying transient failures
    pub async fn print_receipt(&self, order: &OrderData) -> Result<PrintOutcome, PrintError> {
        let order_id = order.order_id.as_deref().unwrap_or("-");
        info!(order_id, items = order.items.len(), "Printing receipt");

        self.retry
            .run(self.settings.max_retries, "print receipt", || async move {
                // Timestamped per attempt
                let job = self.formatter.format(order, Utc::now());
                self.executor.execute(&job, self.settings.receipt_timeout).await
            })
            .await?;

        Ok(PrintOutcome::success("Receipt printed successfully"))
    }

    pub async fn print_test(&self) -> Result<PrintOutcome, PrintError> {
        info!("Printing test page");
        self.retry
            .run(self.settings.max_retries, "print test page", || async move {
                let job = self.formatter.test_page(Utc::now());
                self.executor.execute(&job, self.settings.receipt_timeout).await
            })
            .await?;

        Ok(PrintOutcome::success("Test page printed successfully"))
    }

    /// Open and close the printer once; errors if it cannot be reached
    pub async fn test_connectivity(&self) -> Result<bool, PrintError> {
        self.retry
            .run(self.settings.max_retries, "connectivity test", || {
                self.executor.probe(self.settings.test_timeout)
            })
            .await?;
        Ok(true)
    }

    /// Current handle for health reporting; never connects
    pub async fn current_handle(&self) -> Option<Arc<DeviceHandle>> {
        self.manager.current_handle().await
    }

    pub async fn connection_state(&self) -> InitializationState {
        self.manager.state().await
    }

    pub async fn close_gracefully(&self, deadline: Duration) {
        self.manager.close_gracefully(deadline).await;
    }
}
