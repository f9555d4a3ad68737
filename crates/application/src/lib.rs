//! Application layer - print workflows on top of the printer connection

pub mod connection;
pub mod printer;

pub use connection::{ConnectionManager, DeviceHandle, DeviceSession};
pub use printer::{PrintExecutor, PrintService, PrintSettings, ReceiptFormatter, ReceiptLayout, RetryPolicy};
