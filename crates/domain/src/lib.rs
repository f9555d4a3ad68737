//! Domain layer - Pure printing model with no I/O
//!
//! This crate contains:
//! - Printer driver and channel contracts (traits)
//! - The printer command stream and handle lifecycle state
//! - Receipt order model, formatted print jobs and line styles
//! - Error taxonomy with transient/permanent classification
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Rules (validation, classification) enforced at domain level
//! - Testable in isolation

pub mod error;
pub mod printer;
pub mod receipt;

// Re-export commonly used types
pub use error::{DomainError, PrintError};
pub use printer::{DeviceCandidate, DeviceChannel, InitializationState, PrinterCommand, PrinterDriver, UsbId};
pub use receipt::{OrderData, OrderItem, PrintJob, PrintLine, PrintOutcome, StyleHint};
