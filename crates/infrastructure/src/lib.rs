//! Infrastructure layer - Printer drivers and configuration

pub mod config;
pub mod printer;

pub use config::BridgeConfig;
pub use printer::{DriverFactory, EscPosEncoder, FilePrinterDriver, MockPrinterDriver, UsbPrinterDriver};
