pub mod api;
pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod state;

use application::connection::ConnectionManager;
use application::printer::{PrintService, PrintSettings, ReceiptFormatter, ReceiptLayout};
use domain::PrintError;
use domain::printer::PrinterDriver;
use infrastructure::DriverFactory;
use infrastructure::config::{BridgeConfig, PrintConfig, ReceiptConfig};
use std::sync::Arc;

pub fn print_settings(print: &PrintConfig) -> PrintSettings {
    PrintSettings {
        receipt_timeout: print.receipt_timeout(),
        test_timeout: print.test_timeout(),
        max_retries: print.max_retries,
        base_delay: print.base_delay(),
        settle_delay: print.settle_delay(),
    }
}

pub fn receipt_layout(receipt: &ReceiptConfig, paper_width: usize) -> ReceiptLayout {
    ReceiptLayout {
        store_name: receipt.store_name.clone(),
        address: receipt.address.clone(),
        phone: receipt.phone.clone(),
        footer: receipt.footer.clone(),
        currency_symbol: receipt.currency_symbol.clone(),
        width: paper_width,
    }
}

/// Wire the print pipeline around an already constructed driver
pub fn print_service_with_driver(
    config: &BridgeConfig,
    driver: Arc<dyn PrinterDriver>,
) -> Result<PrintService, PrintError> {
    let preferred = config.printer.preferred_id()?;
    let manager = Arc::new(ConnectionManager::new(driver, preferred));
    let formatter = ReceiptFormatter::new(receipt_layout(&config.receipt, config.printer.paper_width));
    Ok(PrintService::new(manager, formatter, print_settings(&config.print)))
}

/// Build the print pipeline for the configured printer kind
pub fn build_print_service(config: &BridgeConfig) -> Result<PrintService, PrintError> {
    let driver = DriverFactory::create(&config.printer)?;
    print_service_with_driver(config, driver)
}
