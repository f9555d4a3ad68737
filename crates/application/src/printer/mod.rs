pub mod executor;
pub mod formatter;
pub mod retry;
pub mod service;

pub use executor::{PrintExecutor, emission_commands};
pub use formatter::{ReceiptFormatter, ReceiptLayout};
pub use retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy};
pub use service::{PrintService, PrintSettings};
