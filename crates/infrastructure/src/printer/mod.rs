pub mod escpos;
pub mod file_printer;
pub mod mock_printer;
pub mod usb;

pub use escpos::EscPosEncoder;
pub use file_printer::FilePrinterDriver;
pub use mock_printer::MockPrinterDriver;
pub use usb::UsbPrinterDriver;

use crate::config::PrinterConfig;
use domain::PrintError;
use domain::printer::PrinterDriver;
use std::sync::Arc;

/// Factory for creating the printer driver named in configuration
pub struct DriverFactory;

impl DriverFactory {
    pub fn create(config: &PrinterConfig) -> Result<Arc<dyn PrinterDriver>, PrintError> {
        match config.kind.trim().to_lowercase().as_str() {
            "usb" => Ok(Arc::new(UsbPrinterDriver::new())),
            "file" => {
                let path = config.file_path.as_deref().filter(|p| !p.trim().is_empty()).ok_or_else(|| {
                    PrintError::Configuration("printer.file_path is required for kind \"file\"".to_string())
                })?;
                Ok(Arc::new(FilePrinterDriver::new(path)))
            }
            "mock" => Ok(Arc::new(MockPrinterDriver::new())),
            other => Err(PrintError::Configuration(format!(
                "unsupported printer kind: {other}"
            ))),
        }
    }
}
